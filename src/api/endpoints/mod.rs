//! API endpoint handlers, one module per resource.

pub mod formulas;
pub mod health;
pub mod herbs;
pub mod patients;
pub mod prescriptions;
pub mod settings;

use serde::Deserialize;

/// `?search=` filter shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

impl SearchQuery {
    /// Non-blank search term.
    pub fn term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
