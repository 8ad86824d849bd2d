/// Core Module for Pidl
///
/// This module contains the database access layer and the shared error
/// type used by every operation.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbError, Result};
