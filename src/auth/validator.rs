//! Authentication validator
//!
//! Checks the USER/PASS dialogue against the single configured account.

use crate::error::AuthError;
use crate::protocol::commands::Verb;
use crate::protocol::parser::ParsedCommand;

/// The account the server accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }
}

/// Validates the first command of a session: `USER <configured name>`.
pub fn validate_user(command: &ParsedCommand, credentials: &Credentials) -> Result<(), AuthError> {
    if command.verb != Verb::User {
        return Err(AuthError::UnexpectedCommand {
            expected: "USER",
            received: command.token().to_string(),
        });
    }
    if command.arg() != credentials.username {
        return Err(AuthError::InvalidUsername(command.arg().to_string()));
    }
    Ok(())
}

/// Validates the second command of a session: `PASS <configured password>`.
pub fn validate_password(
    command: &ParsedCommand,
    credentials: &Credentials,
) -> Result<(), AuthError> {
    if command.verb != Verb::Pass {
        return Err(AuthError::UnexpectedCommand {
            expected: "PASS",
            received: command.token().to_string(),
        });
    }
    if command.arg() != credentials.password {
        return Err(AuthError::InvalidPassword(credentials.username.clone()));
    }
    Ok(())
}
