//! Platform accounts and the caller identity supplied by the authentication gateway.

pub mod caller;
pub mod domain;

pub use caller::{Caller, CallerRejection, USER_ID_HEADER, USER_ROLE_HEADER};
pub use domain::{StoredUser, User, UserRole};
