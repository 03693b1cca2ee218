//! Advisory interaction flags for prescription items.
//!
//! Flags are produced by case-insensitive substring matching of the
//! clinician's active conditions and medications against an item's
//! free-text safety fields. They are shown next to the item and printed
//! as warnings; they never block saving or printing.

use serde::{Deserialize, Serialize};

use crate::prescription::{PrescriptionData, PrescriptionItem};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionFlags {
    /// Conditions found in the contraindications text.
    pub contraindications: Vec<String>,
    /// Conditions found in the cautions text.
    pub cautions: Vec<String>,
    /// Medications found in the herb-drug interactions text.
    pub medication_interactions: Vec<String>,
}

impl InteractionFlags {
    pub fn is_empty(&self) -> bool {
        self.contraindications.is_empty()
            && self.cautions.is_empty()
            && self.medication_interactions.is_empty()
    }
}

/// Flags for one item. Matched names are reported in their original
/// casing; a condition found in both texts appears in both lists.
pub fn flag(
    item: &PrescriptionItem,
    active_conditions: &[String],
    active_medications: &[String],
) -> InteractionFlags {
    let contraindications = lowered(item.contraindications());
    let cautions = lowered(item.cautions());
    let interactions = lowered(item.herb_drug_interactions());

    let mut flags = InteractionFlags::default();

    for condition in active_conditions {
        let Some(needle) = needle(condition) else {
            continue;
        };
        if contraindications.contains(&needle) {
            flags.contraindications.push(condition.clone());
        }
        if cautions.contains(&needle) {
            flags.cautions.push(condition.clone());
        }
    }

    for medication in active_medications {
        let Some(needle) = needle(medication) else {
            continue;
        };
        if interactions.contains(&needle) {
            flags.medication_interactions.push(medication.clone());
        }
    }

    if !flags.is_empty() {
        tracing::debug!(
            item = item.id,
            contraindications = flags.contraindications.len(),
            cautions = flags.cautions.len(),
            medications = flags.medication_interactions.len(),
            "Interaction flags raised"
        );
    }

    flags
}

/// Flags for every item of a view, in item order, using the view's own
/// active conditions and medications.
pub fn flag_view(data: &PrescriptionData) -> Vec<InteractionFlags> {
    data.items
        .iter()
        .map(|item| flag(item, &data.active_conditions, &data.active_medications))
        .collect()
}

fn lowered(text: Option<&str>) -> String {
    text.unwrap_or_default().to_lowercase()
}

/// Lower-cased name, untrimmed. Blank names match nothing.
fn needle(name: &str) -> Option<String> {
    (!name.trim().is_empty()).then(|| name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ItemKind;
    use crate::models::Herb;

    fn herb_item(herb: Herb) -> PrescriptionItem {
        PrescriptionItem {
            id: 1,
            kind: ItemKind::Herb,
            quantity: 10.0,
            is_placeholder: false,
            formula: None,
            herb: Some(herb),
        }
    }

    fn ma_huang() -> PrescriptionItem {
        herb_item(Herb {
            pinyin_name: "Ma Huang".into(),
            chinese_name: "麻黄".into(),
            contraindications: Some("Hypertension, insomnia".into()),
            cautions: Some("Use with care in hypertension and glaucoma".into()),
            herb_drug_interactions: Some("MAO inhibitors; digoxin".into()),
            ..Default::default()
        })
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn condition_in_contraindications() {
        let item = herb_item(Herb {
            contraindications: Some("Hypertension, insomnia".into()),
            ..Default::default()
        });
        let flags = flag(&item, &names(&["Hypertension"]), &[]);
        assert_eq!(flags.contraindications, vec!["Hypertension"]);
        assert!(flags.cautions.is_empty());
        assert!(flags.medication_interactions.is_empty());
    }

    #[test]
    fn nothing_active_means_no_flags() {
        assert!(flag(&ma_huang(), &[], &[]).is_empty());
    }

    #[test]
    fn condition_matching_both_fields_listed_twice() {
        let flags = flag(&ma_huang(), &names(&["HYPERTENSION"]), &[]);
        assert_eq!(flags.contraindications, vec!["HYPERTENSION"]);
        assert_eq!(flags.cautions, vec!["HYPERTENSION"]);
    }

    #[test]
    fn medication_matched_case_insensitively() {
        let flags = flag(&ma_huang(), &[], &names(&["Digoxin", "Metformin"]));
        assert_eq!(flags.medication_interactions, vec!["Digoxin"]);
    }

    #[test]
    fn blank_names_ignored() {
        let flags = flag(&ma_huang(), &names(&["", "  "]), &names(&[""]));
        assert!(flags.is_empty());
    }

    #[test]
    fn surrounding_spaces_are_part_of_the_name() {
        let item = herb_item(Herb {
            contraindications: Some("Hypertension, insomnia".into()),
            ..Default::default()
        });
        let flags = flag(&item, &names(&[" Hypertension", "insomnia"]), &[]);
        assert_eq!(flags.contraindications, vec!["insomnia"]);
    }

    #[test]
    fn duplicates_not_removed() {
        let flags = flag(&ma_huang(), &names(&["insomnia", "Insomnia"]), &[]);
        assert_eq!(flags.contraindications, vec!["insomnia", "Insomnia"]);
    }

    #[test]
    fn view_flags_use_prescription_selections() {
        use crate::models::{Formula, Patient, Prescription};
        use crate::prescription::build_view;

        let formula = Formula {
            pinyin_name: "Ma Huang Tang".into(),
            contraindications: Some("Hypertension".into()),
            herb_drug_interactions: Some("Digoxin".into()),
            ..Default::default()
        };
        let mut rx = Prescription::new(1, chrono::NaiveDateTime::default());
        rx.active_conditions = names(&["hypertension"]);
        rx.active_medications = names(&["Digoxin"]);

        let data = build_view(&rx, &Patient::default(), Some(&formula), None);
        let flags = flag_view(&data);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].contraindications, vec!["hypertension"]);
        assert_eq!(flags[0].medication_interactions, vec!["Digoxin"]);
    }

    #[test]
    fn item_without_text_fields() {
        let item = herb_item(Herb::default());
        assert!(flag(&item, &names(&["Pregnancy"]), &names(&["Warfarin"])).is_empty());
    }
}
