//! Canonical entity shapes.
//!
//! Every struct here is the single internal form of an entity. Inbound
//! data (HTTP bodies, import files, JSON columns) reaches these types only
//! through the adapters in [`crate::normalize`].

pub mod enums;
mod formula;
mod herb;
mod patient;
mod prescription;

pub use formula::*;
pub use herb::*;
pub use patient::*;
pub use prescription::*;

use thiserror::Error;

/// Form-level validation failure for a create/update request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must not be negative")]
    Negative { field: &'static str },
}

/// Reject empty or whitespace-only required text.
pub(crate) fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}
