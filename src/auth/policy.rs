//! Role-based authorization.
//!
//! Anonymous-allowed operations never call [`authorize`]. Everything else
//! passes the optional caller identity together with the set of roles the
//! operation admits.

use thiserror::Error;

use crate::db::Role;

/// Menu mutation, uploads, reservation overview and status override
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Staff];
/// Self-service reservation listing and cancellation
pub const CUSTOMER_ROLES: &[Role] = &[Role::Customer];

/// Authenticated caller, as established from a verified credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not enough permissions")]
    Forbidden,
}

/// Admits `identity` when its role is in `allowed`. An empty `allowed` set
/// admits every authenticated caller.
pub fn authorize(identity: Option<Identity>, allowed: &[Role]) -> Result<Identity, Rejection> {
    let identity = identity.ok_or(Rejection::Unauthenticated)?;
    if allowed.is_empty() || allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        Err(Rejection::Forbidden)
    }
}

/// Guest-owned records (`owner == None`) belong to nobody.
pub fn ensure_owner(identity: &Identity, owner: Option<i64>) -> Result<(), Rejection> {
    if owner == Some(identity.user_id) {
        Ok(())
    } else {
        Err(Rejection::Forbidden)
    }
}
