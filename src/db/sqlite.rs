use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use super::models::{
    MenuItem, MenuItemChanges, NewMenuItem, NewReservation, NewUser, Reservation,
    ReservationStatus, Role, User,
};
use crate::api::middleware::ErrorLogExt;
use crate::api::AppError;
use crate::config::Settings;

pub type Result<T> = std::result::Result<T, AppError>;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'customer' CHECK (role IN ('admin', 'staff', 'customer')),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email);

    CREATE TABLE IF NOT EXISTS menu_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        price TEXT NOT NULL,
        image_url TEXT,
        is_available BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS reservations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        party_size INTEGER NOT NULL CHECK (party_size > 0),
        reserved_for TEXT NOT NULL,
        guest_name TEXT,
        guest_email TEXT,
        guest_phone TEXT,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'confirmed', 'cancelled')),
        user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        CHECK (user_id IS NOT NULL OR (guest_name IS NOT NULL AND guest_email IS NOT NULL))
    );

    CREATE INDEX IF NOT EXISTS idx_reservations_user_id ON reservations(user_id);
    CREATE INDEX IF NOT EXISTS idx_reservations_status ON reservations(status);
"#;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, created_at";
const MENU_COLUMNS: &str = "id, name, description, price, image_url, is_available, created_at";
const RESERVATION_COLUMNS: &str =
    "id, party_size, reserved_for, guest_name, guest_email, guest_phone, status, user_id, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::from_str(&row.role)
            .map_err(|e| AppError::Internal(format!("Stored user {} has unknown role '{}'", row.id, e.0)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: i64,
    name: String,
    description: Option<String>,
    price: String,
    image_url: Option<String>,
    is_available: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = AppError;

    fn try_from(row: MenuItemRow) -> Result<Self> {
        let price = Decimal::from_str(&row.price)
            .map_err(|e| AppError::Internal(format!("Stored menu item {} has bad price: {}", row.id, e)))?;
        Ok(MenuItem {
            id: row.id,
            name: row.name,
            description: row.description,
            price,
            image_url: row.image_url,
            is_available: row.is_available,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    party_size: i64,
    reserved_for: DateTime<Utc>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    status: String,
    user_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(row: ReservationRow) -> Result<Self> {
        let status = ReservationStatus::from_str(&row.status).map_err(|e| {
            AppError::Internal(format!("Stored reservation {} has unknown status '{}'", row.id, e.0))
        })?;
        Ok(Reservation {
            id: row.id,
            party_size: row.party_size,
            reserved_for: row.reserved_for,
            guest_name: row.guest_name,
            guest_email: row.guest_email,
            guest_phone: row.guest_phone,
            status,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Handle over the relational store. Cloning is cheap: every clone shares
/// the same connection pool.
#[derive(Debug, Clone)]
pub struct SqlRepo {
    pub pool: SqlitePool,
}

impl SqlRepo {
    pub async fn init(settings: &Settings) -> Result<SqlRepo> {
        let repo = Self::connect(&settings.database_url, settings.database_max_connections).await?;
        repo.create_tables().await?;
        Ok(repo)
    }

    /// Opens the pool without touching the schema. Connections are never
    /// recycled, so an in-memory database lives as long as the pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlRepo> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Internal(format!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Internal(format!("Error connecting to database: {}", e)))?;

        tracing::info!(database_url = %database_url, "Database connection established");
        Ok(SqlRepo { pool })
    }

    pub async fn create_tables(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .log_error_context("creating schema")
            .map_err(|e| AppError::database("create_tables", e))?;

        tracing::info!("Database schema ready");
        Ok(())
    }

    pub fn current_timestamp() -> DateTime<Utc> {
        Utc::now()
    }

    // Users

    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, password_hash, role, is_active, created_at)
             VALUES (?, ?, ?, ?, TRUE, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(Self::current_timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database("create_user", e))?;

        row.try_into()
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .log_error_context("fetching user by id")
            .map_err(|e| AppError::database("get_user", e))?;

        row.map(User::try_from).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .log_error_context("fetching user by email")
            .map_err(|e| AppError::database("get_user_by_email", e))?;

        row.map(User::try_from).transpose()
    }

    // Menu

    pub async fn list_menu_items(&self) -> Result<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .log_error_context("listing menu items")
        .map_err(|e| AppError::database("list_menu_items", e))?;

        convert_all(rows)
    }

    pub async fn create_menu_item(&self, new: NewMenuItem) -> Result<MenuItem> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            "INSERT INTO menu_items (name, description, price, image_url, is_available, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price.to_string())
        .bind(&new.image_url)
        .bind(new.is_available)
        .bind(Self::current_timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database("create_menu_item", e))?;

        row.try_into()
    }

    /// Applies the present fields of `changes`; `None` when the item is absent.
    pub async fn update_menu_item(&self, id: i64, changes: MenuItemChanges) -> Result<Option<MenuItem>> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            "UPDATE menu_items SET
                 name = COALESCE(?, name),
                 description = CASE WHEN ? THEN ? ELSE description END,
                 price = COALESCE(?, price),
                 image_url = CASE WHEN ? THEN ? ELSE image_url END,
                 is_available = COALESCE(?, is_available)
             WHERE id = ?
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(changes.description.is_some())
        .bind(changes.description.flatten())
        .bind(changes.price.map(|p| p.to_string()))
        .bind(changes.image_url.is_some())
        .bind(changes.image_url.flatten())
        .bind(changes.is_available)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database("update_menu_item", e))?;

        row.map(MenuItem::try_from).transpose()
    }

    /// Returns `false` when no item had that id.
    pub async fn delete_menu_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database("delete_menu_item", e))?;

        Ok(result.rows_affected() > 0)
    }

    // Reservations

    pub async fn create_reservation(&self, new: NewReservation) -> Result<Reservation> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "INSERT INTO reservations
                 (party_size, reserved_for, guest_name, guest_email, guest_phone, status, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(new.party_size)
        .bind(new.reserved_for)
        .bind(&new.guest_name)
        .bind(&new.guest_email)
        .bind(&new.guest_phone)
        .bind(ReservationStatus::Pending.as_str())
        .bind(new.user_id)
        .bind(Self::current_timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database("create_reservation", e))?;

        row.try_into()
    }

    pub async fn get_reservation(&self, id: i64) -> Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .log_error_context("fetching reservation")
        .map_err(|e| AppError::database("get_reservation", e))?;

        row.map(Reservation::try_from).transpose()
    }

    pub async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .log_error_context("listing reservations")
        .map_err(|e| AppError::database("list_reservations", e))?;

        convert_all(rows)
    }

    pub async fn list_reservations_for_user(&self, user_id: i64) -> Result<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .log_error_context("listing reservations for user")
        .map_err(|e| AppError::database("list_reservations_for_user", e))?;

        convert_all(rows)
    }

    /// `None` when the reservation is absent.
    pub async fn update_reservation_status(
        &self,
        id: i64,
        status: ReservationStatus,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "UPDATE reservations SET status = ? WHERE id = ? RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database("update_reservation_status", e))?;

        row.map(Reservation::try_from).transpose()
    }

    /// Row counts of users, menu items and reservations.
    pub async fn table_counts(&self) -> Result<(i64, i64, i64)> {
        let counts: (i64, i64, i64) = sqlx::query_as(
            "SELECT
                 (SELECT COUNT(*) FROM users),
                 (SELECT COUNT(*) FROM menu_items),
                 (SELECT COUNT(*) FROM reservations)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database("table_counts", e))?;

        Ok(counts)
    }
}
