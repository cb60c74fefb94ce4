//! # Auth API
//!
//! - `POST /auth/signup` registers a customer account
//! - `POST /auth/login` exchanges email and password for a bearer credential

use actix_web::{post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::{AppError, AppResult, ResultExt};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::TokenService;
use crate::db::{NewUser, Role, SqlRepo};
use crate::validation::{normalize_email, require_non_blank, validate_email};

#[derive(Deserialize)]
struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

/// Registers a new user with the `customer` role
///
/// # Response
///
/// The stored user record (without the password hash):
///
/// ```json
/// {
///   "id": 3,
///   "name": "Ana",
///   "email": "ana@example.com",
///   "role": "customer",
///   "is_active": true,
///   "created_at": "2030-01-01T18:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: the email is already registered
/// - `422 Unprocessable Entity`: blank name or password, malformed email
#[post("/auth/signup")]
async fn signup(
    repo: web::Data<SqlRepo>,
    data: web::Json<SignupRequest>,
) -> AppResult<impl Responder> {
    let data = data.into_inner();
    let name = require_non_blank("name", &data.name)?;
    let email = normalize_email(&data.email);
    validate_email("email", &email)?;
    if data.password.is_empty() {
        return Err(AppError::validation_field("password", "is required"));
    }

    if repo.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&data.password).map_err_internal("hashing password")?;

    let user = repo
        .create_user(NewUser {
            name: name.to_string(),
            email,
            password_hash,
            role: Role::Customer,
        })
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => AppError::Conflict("Email already registered".to_string()),
            other => other,
        })?;

    tracing::info!(user_id = user.id, "Customer signed up");
    Ok(HttpResponse::Ok().json(user))
}

/// Issues a bearer credential for valid email/password pairs
///
/// # Response
///
/// ```json
/// { "access_token": "eyJ...", "token_type": "bearer" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email, wrong password or inactive account
#[post("/auth/login")]
async fn login(
    repo: web::Data<SqlRepo>,
    tokens: web::Data<TokenService>,
    data: web::Json<LoginRequest>,
) -> AppResult<impl Responder> {
    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

    let user = repo
        .get_user_by_email(&normalize_email(&data.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&data.password, &user.password_hash) || !user.is_active {
        return Err(invalid());
    }

    let access_token = tokens.issue(user.id, user.role)?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(signup);
    cfg.service(login);
}
