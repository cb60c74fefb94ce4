//! # Resto API
//!
//! Restaurant backend built with Actix Web and SQLite: customer signup and
//! login, menu management and table reservations.
//!
//! ## Architecture
//!
//! ```text
//! Client (HTTP/JSON, Bearer credential)
//!     ↓
//! api::middleware   credential gate (MaybeUser / CurrentUser)
//!     ↓
//! api::*            handlers ── auth::policy, lifecycle
//!     ↓
//! db::SqlRepo       sqlx over SQLite
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod validation;

/// Installs the global `tracing` subscriber. `RUST_LOG` takes precedence
/// over the built-in directives.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("resto_api=debug,sqlx=warn,actix_web=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
