use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::PrescriptionStatus;
use super::ValidationError;

/// A persisted prescription.
///
/// `custom_formula` is kept as the raw text that was stored. It is only
/// interpreted when a view is built (see [`crate::prescription::build_view`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Option<i64>,
    pub patient_id: i64,
    pub formula_id: Option<i64>,
    pub custom_formula: Option<String>,
    /// Declared batch weight in grams.
    pub quantity: Option<f64>,
    pub notes: Option<String>,
    pub instructions: Option<String>,
    pub duration: Option<String>,
    pub status: PrescriptionStatus,
    pub active_conditions: Vec<String>,
    pub active_medications: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl Prescription {
    pub fn new(patient_id: i64, created_at: NaiveDateTime) -> Self {
        Self {
            id: None,
            patient_id,
            formula_id: None,
            custom_formula: None,
            quantity: None,
            notes: None,
            instructions: None,
            duration: None,
            status: PrescriptionStatus::default(),
            active_conditions: Vec::new(),
            active_medications: Vec::new(),
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.quantity {
            Some(q) if q < 0.0 => Err(ValidationError::Negative { field: "quantity" }),
            _ => Ok(()),
        }
    }

    /// Human-facing number printed on the prescription, e.g. `RX-20240115-0042`.
    pub fn display_number(&self) -> String {
        format!(
            "RX-{}-{:04}",
            self.created_at.format("%Y%m%d"),
            self.id.unwrap_or(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-01-15 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn display_number_pads_id() {
        let mut rx = Prescription::new(1, created());
        rx.id = Some(42);
        assert_eq!(rx.display_number(), "RX-20240115-0042");
    }

    #[test]
    fn negative_quantity_rejected() {
        let mut rx = Prescription::new(1, created());
        rx.quantity = Some(-5.0);
        assert_eq!(
            rx.validate(),
            Err(ValidationError::Negative { field: "quantity" })
        );
    }
}
