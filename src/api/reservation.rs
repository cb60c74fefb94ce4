//! # Reservations API
//!
//! - Creation is open to anonymous guests and to authenticated users
//! - Admin and staff list every reservation and override its status
//! - Customers list and cancel their own reservations
//!
//! The ownership and status rules live in [`crate::lifecycle`].

use actix_web::{get, patch, post, web, HttpResponse, Responder};
use serde::Deserialize;

use super::middleware::{CurrentUser, MaybeUser};
use super::{AppError, AppResult};
use crate::auth::{authorize, ensure_owner, CUSTOMER_ROLES, STAFF_ROLES};
use crate::db::SqlRepo;
use crate::lifecycle::{cancellation_target, parse_status_override, prepare_reservation, ReservationInput};

/// Status override body. Kept as a raw string so unknown values surface as
/// a validation error naming the accepted statuses.
#[derive(Deserialize)]
struct StatusUpdate {
    status: String,
}

/// Creates a reservation
///
/// # Authentication
/// Optional. With a valid bearer credential the reservation belongs to the
/// caller; without one, `guest_name` and `guest_email` are required.
///
/// # Response
///
/// ```json
/// {
///   "id": 12,
///   "party_size": 2,
///   "reserved_for": "2030-01-01T18:00:00Z",
///   "guest_name": "Guest",
///   "guest_email": "guest@example.com",
///   "guest_phone": "555-0101",
///   "status": "pending",
///   "user_id": null,
///   "created_at": "2029-12-20T10:00:00Z"
/// }
/// ```
///
/// # Errors
/// - `401 Unauthorized`: a credential was sent but is invalid
/// - `422 Unprocessable Entity`: missing guest fields, bad email, party size below 1
#[post("/reservations")]
async fn make_reservation(
    repo: web::Data<SqlRepo>,
    user: MaybeUser,
    data: web::Json<ReservationInput>,
) -> AppResult<impl Responder> {
    let new = prepare_reservation(user.0.as_ref(), data.into_inner())?;
    let reservation = repo.create_reservation(new).await?;

    tracing::info!(
        reservation_id = reservation.id,
        user_id = ?reservation.user_id,
        "Reservation created"
    );
    Ok(HttpResponse::Ok().json(reservation))
}

/// Lists every reservation, newest first (admin/staff)
#[get("/reservations")]
async fn list_reservations(
    repo: web::Data<SqlRepo>,
    user: CurrentUser,
) -> AppResult<impl Responder> {
    authorize(Some(user.0), STAFF_ROLES)?;
    let reservations = repo.list_reservations().await?;
    Ok(HttpResponse::Ok().json(reservations))
}

/// Lists the caller's own reservations, newest first (customer)
#[get("/reservations/me")]
async fn list_my_reservations(
    repo: web::Data<SqlRepo>,
    user: CurrentUser,
) -> AppResult<impl Responder> {
    let identity = authorize(Some(user.0), CUSTOMER_ROLES)?;
    let reservations = repo.list_reservations_for_user(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(reservations))
}

/// Cancels one of the caller's reservations
///
/// Cancelling a reservation that is already cancelled returns it unchanged.
///
/// # Errors
/// - `403 Forbidden`: caller is not a customer, or does not own the reservation
/// - `404 Not Found`: no reservation with that id
#[patch("/reservations/{id}/cancel")]
async fn cancel_reservation(
    repo: web::Data<SqlRepo>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let identity = authorize(Some(user.0), CUSTOMER_ROLES)?;
    let id = path.into_inner();

    let reservation = repo
        .get_reservation(id)
        .await?
        .ok_or_else(|| AppError::not_found_id("Reservation", id))?;

    ensure_owner(&identity, reservation.user_id)
        .map_err(|_| AppError::Forbidden("Not allowed to cancel".to_string()))?;

    let Some(target) = cancellation_target(reservation.status) else {
        tracing::debug!(reservation_id = id, "Reservation already cancelled");
        return Ok(HttpResponse::Ok().json(reservation));
    };

    let updated = repo
        .update_reservation_status(id, target)
        .await?
        .ok_or_else(|| AppError::not_found_id("Reservation", id))?;

    tracing::info!(reservation_id = id, user_id = identity.user_id, "Reservation cancelled");
    Ok(HttpResponse::Ok().json(updated))
}

/// Sets a reservation's status (admin/staff)
///
/// Any of `pending`, `confirmed` and `cancelled` may be set from any state.
///
/// # Errors
/// - `404 Not Found`: no reservation with that id
/// - `422 Unprocessable Entity`: status outside the accepted values
#[patch("/reservations/{id}/status")]
async fn set_reservation_status(
    repo: web::Data<SqlRepo>,
    user: CurrentUser,
    path: web::Path<i64>,
    data: web::Json<StatusUpdate>,
) -> AppResult<impl Responder> {
    let identity = authorize(Some(user.0), STAFF_ROLES)?;
    let id = path.into_inner();
    let status = parse_status_override(&data.status)?;

    let updated = repo
        .update_reservation_status(id, status)
        .await?
        .ok_or_else(|| AppError::not_found_id("Reservation", id))?;

    tracing::info!(
        reservation_id = id,
        status = %status,
        changed_by = identity.user_id,
        "Reservation status set"
    );
    Ok(HttpResponse::Ok().json(updated))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(make_reservation);
    cfg.service(list_reservations);
    cfg.service(list_my_reservations);
    cfg.service(cancel_reservation);
    cfg.service(set_reservation_status);
}
