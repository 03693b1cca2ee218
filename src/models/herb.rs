use serde::{Deserialize, Serialize};

use super::enums::Nature;
use super::{require, ValidationError};

/// A single-herb reference entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Herb {
    pub id: Option<i64>,
    pub pinyin_name: String,
    pub chinese_name: String,
    pub latin_name: Option<String>,
    pub english_name: Option<String>,
    pub category: Option<String>,
    /// Free text in practice; see [`Herb::nature_kind`].
    pub nature: Option<String>,
    pub flavor: Option<String>,
    pub meridians: Vec<String>,
    pub dosage_range: Option<String>,
    pub contraindications: Option<String>,
    pub cautions: Option<String>,
    pub herb_drug_interactions: Option<String>,
    pub tcm_actions: Vec<TcmAction>,
}

/// Top level of the actions tree: function → pattern → case → combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcmAction {
    pub function: Option<String>,
    pub patterns: Vec<ClinicalPattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalPattern {
    pub pattern: Option<String>,
    pub cases: Vec<ClinicalCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalCase {
    pub case: Option<String>,
    pub combinations: Vec<HerbCombination>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbCombination {
    pub herbs: Option<String>,
    pub effect: Option<String>,
}

impl Herb {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.pinyin_name, "pinyinName")?;
        require(&self.chinese_name, "chineseName")?;
        Ok(())
    }

    /// The nature mapped onto the fixed vocabulary, when it matches.
    pub fn nature_kind(&self) -> Option<Nature> {
        self.nature.as_deref().and_then(Nature::parse_loose)
    }
}
