//! Reservation lifecycle rules.
//!
//! ```text
//!   create ──► pending ──► confirmed
//!                 │  ▲         │
//!                 ▼  └─────────┤   (admin/staff may set any status)
//!             cancelled ◄──────┘
//! ```
//!
//! Customers can only move their own reservations to `cancelled`, and doing
//! so twice is a no-op. Admin and staff may set any of the three statuses.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::api::{AppError, AppResult};
use crate::auth::Identity;
use crate::db::{NewReservation, ReservationStatus};
use crate::validation::{non_blank, normalize_email, validate_email};

/// Reservation request body
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationInput {
    pub party_size: i64,
    #[serde(deserialize_with = "deserialize_reserved_for")]
    pub reserved_for: DateTime<Utc>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
}

/// Formats accepted for datetimes that carry no offset, read as UTC.
/// `%.f` also matches an absent fraction.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC
/// (the shape a `datetime-local` form input sends).
pub fn parse_reserved_for(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_reserved_for<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_reserved_for(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "reserved_for: '{}' is not an ISO 8601 datetime",
            raw
        ))
    })
}

/// Resolves who owns a new reservation.
///
/// Authenticated callers own the reservation and any guest fields they send
/// are kept as optional contact details. Anonymous callers must supply a
/// guest name and email.
pub fn prepare_reservation(
    caller: Option<&Identity>,
    input: ReservationInput,
) -> AppResult<NewReservation> {
    if input.party_size < 1 {
        return Err(AppError::validation_field("party_size", "must be at least 1"));
    }

    let guest_name = non_blank(input.guest_name.as_deref()).map(str::to_string);
    let guest_email = non_blank(input.guest_email.as_deref()).map(normalize_email);
    let guest_phone = non_blank(input.guest_phone.as_deref()).map(str::to_string);

    if let Some(email) = &guest_email {
        validate_email("guest_email", email)?;
    }

    let user_id = match caller {
        Some(identity) => Some(identity.user_id),
        None => {
            if guest_name.is_none() || guest_email.is_none() {
                return Err(AppError::Validation(
                    "Guest name and email are required for guest reservations".to_string(),
                ));
            }
            None
        }
    };

    Ok(NewReservation {
        party_size: input.party_size,
        reserved_for: input.reserved_for,
        guest_name,
        guest_email,
        guest_phone,
        user_id,
    })
}

/// Status a self-service cancellation should write, or `None` when the
/// reservation is already cancelled and must be returned unchanged.
pub fn cancellation_target(current: ReservationStatus) -> Option<ReservationStatus> {
    match current {
        ReservationStatus::Cancelled => None,
        ReservationStatus::Pending | ReservationStatus::Confirmed => {
            Some(ReservationStatus::Cancelled)
        }
    }
}

/// Parses an admin/staff status override. Any transition between the three
/// statuses is allowed, including reopening a cancelled reservation.
pub fn parse_status_override(raw: &str) -> AppResult<ReservationStatus> {
    raw.parse::<ReservationStatus>().map_err(|_| {
        let allowed: Vec<&str> = ReservationStatus::ALL.iter().map(|s| s.as_str()).collect();
        AppError::Validation(format!("Status must be one of: {}", allowed.join(", ")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;
    use tokio_test::{assert_err, assert_ok};

    fn input(name: Option<&str>, email: Option<&str>) -> ReservationInput {
        ReservationInput {
            party_size: 2,
            reserved_for: "2030-01-01T18:00:00Z".parse().unwrap(),
            guest_name: name.map(str::to_string),
            guest_email: email.map(str::to_string),
            guest_phone: None,
        }
    }

    #[test]
    fn anonymous_requests_need_guest_name_and_email() {
        assert_err!(prepare_reservation(None, input(None, Some("g@x.com"))));
        assert_err!(prepare_reservation(None, input(Some("Guest"), None)));
        assert_err!(prepare_reservation(None, input(Some("  "), Some("g@x.com"))));

        let new = assert_ok!(prepare_reservation(None, input(Some("Guest"), Some("g@x.com"))));
        assert_eq!(new.user_id, None);
        assert_eq!(new.guest_name.as_deref(), Some("Guest"));
    }

    #[test]
    fn authenticated_requests_are_owned_by_the_caller() {
        let me = Identity { user_id: 5, role: Role::Customer };
        let new = assert_ok!(prepare_reservation(Some(&me), input(None, None)));
        assert_eq!(new.user_id, Some(5));

        let with_guest = assert_ok!(prepare_reservation(Some(&me), input(Some("Other"), Some("o@x.com"))));
        assert_eq!(with_guest.user_id, Some(5));
    }

    #[test]
    fn party_size_and_email_are_checked() {
        let mut bad_size = input(Some("Guest"), Some("g@x.com"));
        bad_size.party_size = 0;
        assert_err!(prepare_reservation(None, bad_size));

        assert_err!(prepare_reservation(None, input(Some("Guest"), Some("nope"))));
    }

    #[test]
    fn reservation_times_accept_naive_and_offset_forms() {
        let expected: DateTime<Utc> = "2030-01-01T18:00:00Z".parse().unwrap();
        assert_eq!(parse_reserved_for("2030-01-01T18:00:00Z"), Some(expected));
        assert_eq!(parse_reserved_for("2030-01-01T20:00:00+02:00"), Some(expected));
        assert_eq!(parse_reserved_for("2030-01-01T18:00:00"), Some(expected));
        assert_eq!(parse_reserved_for("2030-01-01T18:00"), Some(expected));
        assert_eq!(parse_reserved_for("2030-01-01 18:00:00.000"), Some(expected));
        assert_eq!(parse_reserved_for("tomorrow at six"), None);
        assert_eq!(parse_reserved_for("2030-13-01T18:00"), None);
    }

    #[test]
    fn reservation_bodies_deserialize_naive_times() {
        let body: ReservationInput =
            serde_json::from_str(r#"{"party_size": 2, "reserved_for": "2030-01-01T18:00"}"#).unwrap();
        assert_eq!(body.reserved_for, "2030-01-01T18:00:00Z".parse::<DateTime<Utc>>().unwrap());

        let err = serde_json::from_str::<ReservationInput>(r#"{"party_size": 2, "reserved_for": "soon"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("reserved_for"));
    }

    #[test]
    fn cancelling_twice_is_a_no_op() {
        assert_eq!(cancellation_target(ReservationStatus::Pending), Some(ReservationStatus::Cancelled));
        assert_eq!(cancellation_target(ReservationStatus::Confirmed), Some(ReservationStatus::Cancelled));
        assert_eq!(cancellation_target(ReservationStatus::Cancelled), None);
    }

    #[test]
    fn status_overrides_accept_only_known_values() {
        assert_eq!(parse_status_override("pending").unwrap(), ReservationStatus::Pending);
        assert_eq!(parse_status_override("cancelled").unwrap(), ReservationStatus::Cancelled);

        let err = assert_err!(parse_status_override("seated"));
        assert_eq!(
            err.to_string(),
            "Validation error: Status must be one of: cancelled, confirmed, pending"
        );
    }
}
