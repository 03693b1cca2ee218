use serde::{Deserialize, Serialize};

use super::{require, ValidationError};

/// A classical or clinic-defined formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
    pub id: Option<i64>,
    pub pinyin_name: String,
    pub chinese_name: Option<String>,
    pub english_name: Option<String>,
    pub category: Option<String>,
    /// Ordered components. Empty, never absent.
    pub composition: Vec<HerbComponent>,
    pub actions: Vec<String>,
    pub indications: Option<String>,
    pub clinical_applications: Option<String>,
    pub contraindications: Option<String>,
    pub cautions: Option<String>,
    pub pharmacological_effects: Option<String>,
    pub research: Option<String>,
    pub herb_drug_interactions: Option<String>,
}

/// One herb inside a composition, as stored or as sent by a custom blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbComponent {
    pub herb_id: Option<String>,
    pub name: String,
    pub chinese_name: Option<String>,
    pub latin_name: Option<String>,
    pub percentage: Option<f64>,
    pub grams: Option<f64>,
    /// Free text, e.g. "9g" or "30%".
    pub dosage: Option<String>,
    pub function: Option<String>,
}

impl Formula {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.pinyin_name, "pinyinName")
    }

    /// Name shown on cards and printouts: pinyin, else english, else chinese.
    pub fn display_name(&self) -> &str {
        if !self.pinyin_name.trim().is_empty() {
            return &self.pinyin_name;
        }
        self.english_name
            .as_deref()
            .or(self.chinese_name.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pinyin_rejected() {
        let formula = Formula::default();
        assert_eq!(
            formula.validate(),
            Err(ValidationError::Required { field: "pinyinName" })
        );
    }

    #[test]
    fn display_name_falls_back() {
        let formula = Formula {
            english_name: Some("Four Gentlemen Decoction".into()),
            chinese_name: Some("四君子汤".into()),
            ..Default::default()
        };
        assert_eq!(formula.display_name(), "Four Gentlemen Decoction");
    }
}
