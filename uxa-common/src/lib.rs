//! # UXA Common Library
//!
//! Shared code for the UX analyzer crates:
//! - Error types
//! - Bootstrap configuration loading and path resolution
//! - Timestamp and run identifier helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
