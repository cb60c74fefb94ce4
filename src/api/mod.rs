//! # API module
//!
//! All REST routes and handlers live here, mounted under [`API_PREFIX`].
//!
//! ## Modules
//!
//! - [`auth`] - Signup and login
//! - [`menu`] - Menu listing, management and image upload
//! - [`reservation`] - Reservation creation, listing, cancellation and status override
//! - [`errors`] - Application error type
//! - [`middleware`] - Credential extractors and error-chain logging

pub mod auth;
pub mod errors;
pub mod menu;
pub mod middleware;
pub mod reservation;

pub use errors::{AppError, AppResult, ErrorResponse, ResultExt};

use actix_files::Files;
use actix_web::web;
use std::path::PathBuf;

use crate::auth::TokenService;
use crate::db::SqlRepo;
use menu::UploadDir;

pub const API_PREFIX: &str = "/api/v1";

/// Shared handles every worker receives
#[derive(Clone)]
pub struct AppState {
    pub repo: SqlRepo,
    pub tokens: TokenService,
    pub upload_dir: PathBuf,
}

/// Registers the `/api/v1` routes
///
/// - `/auth/*` - See [`auth::routes`]
/// - `/menu/*` - See [`menu::routes`]
/// - `/reservations/*` - See [`reservation::routes`]
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    auth::routes(cfg);
    menu::routes(cfg);
    reservation::routes(cfg);
}

/// Builds the application configuration: shared state, extractor error
/// handling, API routes and the uploaded-files service.
///
/// Routes are registered without trailing slashes; wrap the app in
/// `NormalizePath::trim()` so `/api/v1/menu/` reaches `/api/v1/menu`.
///
/// ```no_run
/// use actix_web::{middleware::NormalizePath, App};
/// # fn build(state: resto_api::api::AppState) {
/// let app = App::new()
///     .wrap(NormalizePath::trim())
///     .configure(resto_api::api::configure(state));
/// # }
/// ```
pub fn configure(state: AppState) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(state.repo.clone()))
            .app_data(web::Data::new(state.tokens.clone()))
            .app_data(web::Data::new(UploadDir(state.upload_dir.clone())))
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
            )
            .app_data(
                web::PathConfig::default()
                    .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
            )
            .service(web::scope(API_PREFIX).configure(init_routes))
            .service(Files::new("/uploads", state.upload_dir.clone()));
    }
}
