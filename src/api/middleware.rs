//! # Request gates and error-chain logging
//!
//! [`MaybeUser`] and [`CurrentUser`] are the per-request credential gate.
//! Handlers take one of them as an argument and hand the resulting identity
//! to [`crate::auth::authorize`].

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;

use super::{AppError, AppResult};
use crate::auth::{Identity, TokenService};
use crate::db::SqlRepo;

/// Logs every error in the `source()` chain, outermost first.
pub fn log_error_chain<E>(error: &E, context: Option<&str>)
where
    E: StdError + 'static,
{
    let mut error_chain = Vec::new();
    let mut current_error: Option<&dyn StdError> = Some(error);

    while let Some(err) = current_error {
        error_chain.push(err.to_string());
        current_error = err.source();
    }

    match context {
        Some(ctx) => tracing::error!(context = %ctx, error_chain = ?error_chain, "Error with full chain"),
        None => tracing::error!(error_chain = ?error_chain, "Error with full chain"),
    }
}

/// Logs the error chain of a failed `Result` and passes it through untouched.
///
/// ```ignore
/// sqlx::query("...")
///     .execute(&pool)
///     .await
///     .log_error_context("deleting menu item")?;
/// ```
pub trait ErrorLogExt<T, E> {
    fn log_error_context(self, context: &str) -> Result<T, E>;
}

impl<T, E> ErrorLogExt<T, E> for Result<T, E>
where
    E: StdError + 'static,
{
    fn log_error_context(self, context: &str) -> Result<T, E> {
        if let Err(ref error) = self {
            log_error_chain(error, Some(context));
        }
        self
    }
}

/// Extracts the credential from `Authorization: Bearer <token>`.
///
/// `Ok(None)` when the header is absent. A header in any other shape is an
/// `Unauthenticated` error.
pub fn extract_token(req: &HttpRequest) -> AppResult<Option<String>> {
    let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Invalid Authorization header".to_string()))?;

    match auth_str.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim().to_string()))
        }
        _ => Err(AppError::Unauthenticated("Invalid token format".to_string())),
    }
}

/// Verifies the credential and confirms its subject still exists and is
/// active. The role comes from the credential, not from storage.
async fn resolve_identity(
    repo: &SqlRepo,
    tokens: &TokenService,
    token: &str,
) -> AppResult<Identity> {
    let claims = tokens.verify(token)?;

    let user = repo
        .get_user(claims.subject_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".to_string()))?;

    if !user.is_active {
        return Err(AppError::Unauthenticated("Inactive user".to_string()));
    }

    Ok(Identity {
        user_id: user.id,
        role: claims.role,
    })
}

async fn identity_from_request(req: HttpRequest) -> AppResult<Option<Identity>> {
    let Some(token) = extract_token(&req)? else {
        return Ok(None);
    };

    let repo = req
        .app_data::<web::Data<SqlRepo>>()
        .ok_or_else(|| AppError::Internal("Repository not configured".to_string()))?;
    let tokens = req
        .app_data::<web::Data<TokenService>>()
        .ok_or_else(|| AppError::Internal("Token service not configured".to_string()))?;

    let identity = resolve_identity(repo, tokens, &token).await?;
    tracing::debug!(user_id = identity.user_id, role = %identity.role, "Request authenticated");
    Ok(Some(identity))
}

/// Caller identity on routes that also admit anonymous requests.
///
/// A missing header yields `MaybeUser(None)`; a present but invalid
/// credential is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Identity>);

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { identity_from_request(req).await.map(MaybeUser) })
    }
}

/// Caller identity on routes that require a credential.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Identity);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            identity_from_request(req)
                .await?
                .map(CurrentUser)
                .ok_or_else(|| AppError::Unauthenticated("Not authenticated".to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn missing_header_is_anonymous() {
        let req = TestRequest::default().to_http_request();
        assert!(extract_token(&req).unwrap().is_none());
    }

    #[test]
    fn bearer_token_is_extracted() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(extract_token(&req).unwrap().as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_are_rejected() {
        for value in ["Basic dXNlcjpwdw==", "Bearer", "Bearer   ", "token"] {
            let req = TestRequest::default()
                .insert_header((header::AUTHORIZATION, value))
                .to_http_request();
            assert!(matches!(extract_token(&req), Err(AppError::Unauthenticated(_))), "{value}");
        }
    }
}
