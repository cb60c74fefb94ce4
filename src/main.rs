//! # Resto API server
//!
//! ## Running
//!
//! ```bash
//! # optional: admin/staff accounts and demo data
//! cargo run --bin resto-seed
//!
//! cargo run
//! # http://localhost:8000/api/v1/menu/
//! ```
//!
//! See [`resto_api::config`] for the environment variables.

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer};

use resto_api::api::{self, AppState};
use resto_api::auth::TokenService;
use resto_api::config::Settings;
use resto_api::db::SqlRepo;

fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    resto_api::init_tracing();

    let settings = Settings::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    tracing::info!(app = %settings.app_name, "Starting server");
    if settings.uses_default_secret() {
        tracing::warn!("SECRET_KEY is not set; credentials are signed with the default key");
    }

    let repo = match SqlRepo::init(&settings).await {
        Ok(repo) => repo,
        Err(e) => {
            tracing::error!("Error initializing database: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Database error: {}", e),
            ));
        }
    };

    tokio::fs::create_dir_all(settings.upload_dir.join("menu")).await?;

    let state = AppState {
        repo,
        tokens: TokenService::new(&settings.secret_key, settings.access_token_expire_minutes),
        upload_dir: settings.upload_dir.clone(),
    };
    let origins = settings.cors_origins.clone();

    tracing::info!("Server listening on {}", settings.bind_address);
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .configure(api::configure(state.clone()))
    })
    .bind(&settings.bind_address)?
    .run()
    .await
}
