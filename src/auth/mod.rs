//! Authentication system
//!
//! Handles the login dialogue against the configured credentials.

pub mod validator;

pub use validator::{Credentials, validate_password, validate_user};
