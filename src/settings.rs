//! Clinic settings: the key-value preferences a clinic configures once
//! (letterhead, default batch weight, dosage parsing mode, print font).
//!
//! Settings are loaded into a [`ClinicSettings`] value and passed to the
//! view builder and the printer explicitly.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::composition::ResolveOptions;
use crate::config::DEFAULT_TOTAL_GRAMS;
use crate::db::{list_user_preferences, set_user_preference, DatabaseError};

pub const KEY_CLINIC_NAME: &str = "clinic.name";
pub const KEY_CLINIC_ADDRESS: &str = "clinic.address";
pub const KEY_CLINIC_PHONE: &str = "clinic.phone";
pub const KEY_PRACTITIONER: &str = "clinic.practitioner";
pub const KEY_DEFAULT_TOTAL_GRAMS: &str = "composition.default_total_grams";
pub const KEY_GRAM_DOSAGE_AS_PERCENTAGE: &str = "composition.gram_dosage_as_percentage";
pub const KEY_CJK_FONT_PATH: &str = "print.cjk_font_path";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicSettings {
    pub clinic_name: Option<String>,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub practitioner_name: Option<String>,
    pub default_total_grams: f64,
    pub gram_dosage_as_percentage: bool,
    /// TrueType/OpenType font used for Chinese names on printouts.
    /// Without one, only Latin-1 text is printed.
    pub cjk_font_path: Option<String>,
}

impl Default for ClinicSettings {
    fn default() -> Self {
        Self {
            clinic_name: None,
            clinic_address: None,
            clinic_phone: None,
            practitioner_name: None,
            default_total_grams: DEFAULT_TOTAL_GRAMS,
            gram_dosage_as_percentage: ResolveOptions::default().gram_dosage_as_percentage,
            cjk_font_path: None,
        }
    }
}

impl ClinicSettings {
    /// Build from stored key-value pairs. Unknown keys are ignored and
    /// unparseable values keep their defaults.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> Self {
        let mut settings = Self::default();
        let text = |key: &str| {
            pairs
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        settings.clinic_name = text(KEY_CLINIC_NAME);
        settings.clinic_address = text(KEY_CLINIC_ADDRESS);
        settings.clinic_phone = text(KEY_CLINIC_PHONE);
        settings.practitioner_name = text(KEY_PRACTITIONER);
        settings.cjk_font_path = text(KEY_CJK_FONT_PATH);

        if let Some(total) = text(KEY_DEFAULT_TOTAL_GRAMS).and_then(|v| v.parse::<f64>().ok()) {
            if total.is_finite() && total > 0.0 {
                settings.default_total_grams = total;
            }
        }
        if let Some(flag) = text(KEY_GRAM_DOSAGE_AS_PERCENTAGE).and_then(|v| v.parse::<bool>().ok())
        {
            settings.gram_dosage_as_percentage = flag;
        }

        settings
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (KEY_DEFAULT_TOTAL_GRAMS, self.default_total_grams.to_string()),
            (
                KEY_GRAM_DOSAGE_AS_PERCENTAGE,
                self.gram_dosage_as_percentage.to_string(),
            ),
        ];
        for (key, value) in [
            (KEY_CLINIC_NAME, &self.clinic_name),
            (KEY_CLINIC_ADDRESS, &self.clinic_address),
            (KEY_CLINIC_PHONE, &self.clinic_phone),
            (KEY_PRACTITIONER, &self.practitioner_name),
            (KEY_CJK_FONT_PATH, &self.cjk_font_path),
        ] {
            pairs.push((key, value.clone().unwrap_or_default()));
        }
        pairs
    }

    pub fn load(conn: &Connection) -> Result<Self, DatabaseError> {
        let pairs: HashMap<String, String> = list_user_preferences(conn)?.into_iter().collect();
        Ok(Self::from_pairs(&pairs))
    }

    pub fn save(&self, conn: &Connection) -> Result<(), DatabaseError> {
        for (key, value) in self.to_pairs() {
            set_user_preference(conn, key, &value)?;
        }
        Ok(())
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            gram_dosage_as_percentage: self.gram_dosage_as_percentage,
        }
    }
}
