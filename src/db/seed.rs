//! Demo data for a fresh database: the admin and staff accounts, a small
//! menu and a few upcoming guest reservations. Nothing is written when any
//! table already has rows.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use super::models::{NewMenuItem, NewReservation, NewUser, Role};
use super::sqlite::{Result, SqlRepo};
use crate::api::ResultExt;
use crate::auth::password::hash_password;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded,
    Skipped,
}

const ACCOUNTS: [(&str, &str, &str, Role); 2] = [
    ("Admin User", "admin@example.com", "Admin123!", Role::Admin),
    ("Staff User", "staff@example.com", "Staff123!", Role::Staff),
];

/// (name, description, price in cents)
const MENU: [(&str, &str, i64); 5] = [
    ("Margherita Pizza", "Classic tomato and basil", 1050),
    ("Chicken Alfredo", "Creamy pasta with grilled chicken", 1375),
    ("Garden Salad", "Mixed greens with vinaigrette", 725),
    ("Tomato Soup", "Roasted tomato soup", 600),
    ("Chocolate Cake", "Rich chocolate slice", 550),
];

/// (guest name, email, phone, party size, days ahead, hours ahead)
const GUESTS: [(&str, &str, &str, i64, i64, i64); 3] = [
    ("Alex Guest", "guest1@example.com", "555-0101", 2, 1, 2),
    ("Jamie Guest", "guest2@example.com", "555-0102", 4, 2, 1),
    ("Taylor Guest", "guest3@example.com", "555-0103", 3, 3, 3),
];

pub async fn seed(repo: &SqlRepo) -> Result<SeedOutcome> {
    let (users, items, reservations) = repo.table_counts().await?;
    if users > 0 || items > 0 || reservations > 0 {
        tracing::info!(users, items, reservations, "Seed skipped: data already exists");
        return Ok(SeedOutcome::Skipped);
    }

    for (name, email, password, role) in ACCOUNTS {
        repo.create_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).map_err_internal("hashing seed password")?,
            role,
        })
        .await?;
    }

    for (name, description, cents) in MENU {
        repo.create_menu_item(NewMenuItem {
            name: name.to_string(),
            description: Some(description.to_string()),
            price: Decimal::new(cents, 2),
            image_url: None,
            is_available: true,
        })
        .await?;
    }

    let now = Utc::now();
    for (name, email, phone, party_size, days, hours) in GUESTS {
        repo.create_reservation(NewReservation {
            party_size,
            reserved_for: now + Duration::days(days) + Duration::hours(hours),
            guest_name: Some(name.to_string()),
            guest_email: Some(email.to_string()),
            guest_phone: Some(phone.to_string()),
            user_id: None,
        })
        .await?;
    }

    tracing::info!("Seed completed");
    Ok(SeedOutcome::Seeded)
}
