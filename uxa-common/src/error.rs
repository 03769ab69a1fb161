//! Common error types for UXA

use thiserror::Error;

/// Common result type for UXA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across UXA crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
