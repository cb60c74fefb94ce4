// src/db/mod.rs
pub mod models;
pub mod seed;
pub mod sqlite;

pub use models::{
    MenuItem, MenuItemChanges, NewMenuItem, NewReservation, NewUser, Reservation,
    ReservationStatus, Role, User,
};
pub use sqlite::SqlRepo;
