//! Error types for Notably

use thiserror::Error;

/// Result type alias using Notably Error
pub type Result<T> = std::result::Result<T, Error>;

/// Notably error types
///
/// Note list operations never fail. Both variants are fatal: a page missing
/// a control cannot be driven, and a server with bad configuration does not
/// start.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Required control missing: {role} ({selector})")]
    MissingControl {
        role: &'static str,
        selector: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
