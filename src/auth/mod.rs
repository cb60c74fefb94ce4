pub mod password;
pub mod policy;
pub mod token;

pub use policy::{authorize, ensure_owner, Identity, Rejection, CUSTOMER_ROLES, STAFF_ROLES};
pub use token::{TokenError, TokenService};
