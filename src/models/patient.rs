use serde::{Deserialize, Serialize};

use super::{require, ValidationError};

/// Patient record. Three generic columns carry contact details:
/// `identifier` holds the email, `contact_info` the phone number and
/// `medical_history` the postal address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Option<i64>,
    pub name: String,
    pub identifier: Option<String>,
    pub contact_info: Option<String>,
    pub medical_history: Option<String>,
    pub medications: Vec<String>,
}

impl Patient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, "name")
    }

    pub fn email(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.contact_info.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.medical_history.as_deref()
    }
}
