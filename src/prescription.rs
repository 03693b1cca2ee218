//! Prescription view building.
//!
//! A stored prescription is turned into a [`PrescriptionData`]: the
//! printable, read-only shape consumed by the preview screen, the PDF
//! printer and the API. Composition comes from the prescription's custom
//! blob when it carries a `herbs` array, otherwise from the referenced
//! formula; with neither, the view holds a single placeholder item.
//!
//! [`PrescriptionDraft`] is the builder side: it collects herb and
//! formula lines in the order the clinician adds them and serializes
//! them into a custom blob for saving.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::composition::{resolve_with, round1, ResolvedHerbLine};
use crate::custom_formula::{interpret, BlobState, CustomFormula};
use crate::models::enums::{ItemKind, PrescriptionStatus};
use crate::models::{Formula, Herb, Patient, Prescription};
use crate::settings::ClinicSettings;

/// Id carried by the placeholder item of an empty prescription.
pub const PLACEHOLDER_ITEM_ID: i64 = 0;
pub const PLACEHOLDER_TEXT: &str = "No formula selected";
const CUSTOM_FORMULA_NAME: &str = "Custom Formula";

// ═══════════════════════════════════════════
// View types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionData {
    pub prescription_id: Option<i64>,
    pub date: String,
    pub number: String,
    pub status: PrescriptionStatus,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_address: Option<String>,
    pub items: Vec<PrescriptionItem>,
    pub notes: Option<String>,
    pub instructions: Option<String>,
    pub duration: Option<String>,
    pub active_conditions: Vec<String>,
    pub active_medications: Vec<String>,
    pub clinic: Option<ClinicInfo>,
}

/// Letterhead copied from the clinic settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicInfo {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub practitioner: Option<String>,
}

/// One line of a prescription. `quantity` is the total grams for the line;
/// component grams inside `formula.herbs` are derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub quantity: f64,
    pub is_placeholder: bool,
    pub formula: Option<FormulaView>,
    pub herb: Option<Herb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionSource {
    CustomFormula,
    StoredFormula,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaView {
    pub id: Option<i64>,
    pub pinyin_name: String,
    pub chinese_name: Option<String>,
    pub english_name: Option<String>,
    pub category: Option<String>,
    pub herbs: Vec<ResolvedHerbLine>,
    /// False when there is nothing to list; the preview shows a
    /// "no composition" note instead of an empty table.
    pub has_composition: bool,
    pub composition_source: CompositionSource,
    pub actions: Vec<String>,
    pub indications: Option<String>,
    pub clinical_applications: Option<String>,
    pub contraindications: Option<String>,
    pub cautions: Option<String>,
    pub pharmacological_effects: Option<String>,
    pub research: Option<String>,
    pub herb_drug_interactions: Option<String>,
}

impl PrescriptionItem {
    pub fn is_placeholder(&self) -> bool {
        self.is_placeholder
    }

    /// Display name of the line's entity.
    pub fn name(&self) -> &str {
        match (&self.formula, &self.herb) {
            (Some(f), _) => &f.pinyin_name,
            (None, Some(h)) => &h.pinyin_name,
            (None, None) => "",
        }
    }

    pub fn contraindications(&self) -> Option<&str> {
        match (&self.formula, &self.herb) {
            (Some(f), _) => f.contraindications.as_deref(),
            (None, Some(h)) => h.contraindications.as_deref(),
            _ => None,
        }
    }

    pub fn cautions(&self) -> Option<&str> {
        match (&self.formula, &self.herb) {
            (Some(f), _) => f.cautions.as_deref(),
            (None, Some(h)) => h.cautions.as_deref(),
            _ => None,
        }
    }

    pub fn herb_drug_interactions(&self) -> Option<&str> {
        match (&self.formula, &self.herb) {
            (Some(f), _) => f.herb_drug_interactions.as_deref(),
            (None, Some(h)) => h.herb_drug_interactions.as_deref(),
            _ => None,
        }
    }
}

impl From<&ClinicSettings> for ClinicInfo {
    fn from(settings: &ClinicSettings) -> Self {
        Self {
            name: settings.clinic_name.clone(),
            address: settings.clinic_address.clone(),
            phone: settings.clinic_phone.clone(),
            practitioner: settings.practitioner_name.clone(),
        }
    }
}

// ═══════════════════════════════════════════
// View building
// ═══════════════════════════════════════════

/// Build the view with default clinic settings.
pub fn build_view(
    prescription: &Prescription,
    patient: &Patient,
    formula: Option<&Formula>,
    custom_formula: Option<&Value>,
) -> PrescriptionData {
    build_view_with(
        prescription,
        patient,
        formula,
        custom_formula,
        &ClinicSettings::default(),
    )
}

/// Build the view for a stored prescription, reading its own
/// `custom_formula` column.
pub fn build_stored_view(
    prescription: &Prescription,
    patient: &Patient,
    formula: Option<&Formula>,
    settings: &ClinicSettings,
) -> PrescriptionData {
    let blob = prescription
        .custom_formula
        .as_ref()
        .map(|raw| Value::String(raw.clone()));
    build_view_with(prescription, patient, formula, blob.as_ref(), settings)
}

pub fn build_view_with(
    prescription: &Prescription,
    patient: &Patient,
    formula: Option<&Formula>,
    custom_formula: Option<&Value>,
    settings: &ClinicSettings,
) -> PrescriptionData {
    let blob = interpret(custom_formula);
    let custom = match &blob {
        BlobState::Parsed(cf) => Some(cf),
        _ => None,
    };

    let quantity = prescription
        .quantity
        .or_else(|| custom.and_then(|cf| cf.total_grams))
        .unwrap_or(settings.default_total_grams);

    let item = if !blob.is_present() && formula.is_none() {
        placeholder_item(quantity)
    } else {
        let view = formula_view(formula, &blob, quantity, settings);
        PrescriptionItem {
            id: 1,
            kind: ItemKind::Formula,
            quantity,
            is_placeholder: false,
            formula: Some(view),
            herb: None,
        }
    };

    PrescriptionData {
        prescription_id: prescription.id,
        date: prescription.created_at.format("%Y-%m-%d").to_string(),
        number: prescription.display_number(),
        status: prescription.status,
        patient_name: patient.name.clone(),
        patient_email: patient.email().map(String::from),
        patient_phone: patient.phone().map(String::from),
        patient_address: patient.address().map(String::from),
        items: vec![item],
        notes: prescription.notes.clone(),
        instructions: prescription.instructions.clone(),
        duration: prescription.duration.clone(),
        active_conditions: prescription.active_conditions.clone(),
        active_medications: prescription.active_medications.clone(),
        clinic: Some(ClinicInfo::from(settings)),
    }
}

fn placeholder_item(quantity: f64) -> PrescriptionItem {
    PrescriptionItem {
        id: PLACEHOLDER_ITEM_ID,
        kind: ItemKind::Formula,
        quantity,
        is_placeholder: true,
        formula: Some(FormulaView {
            id: None,
            pinyin_name: PLACEHOLDER_TEXT.into(),
            chinese_name: None,
            english_name: None,
            category: None,
            herbs: Vec::new(),
            has_composition: false,
            composition_source: CompositionSource::None,
            actions: Vec::new(),
            indications: None,
            clinical_applications: None,
            contraindications: None,
            cautions: None,
            pharmacological_effects: None,
            research: None,
            herb_drug_interactions: None,
        }),
        herb: None,
    }
}

/// Merge custom blob and stored formula. Blob values win; the formula
/// fills what the blob leaves out.
fn formula_view(
    formula: Option<&Formula>,
    blob: &BlobState,
    quantity: f64,
    settings: &ClinicSettings,
) -> FormulaView {
    let empty = CustomFormula::default();
    let custom = match blob {
        BlobState::Parsed(cf) => cf,
        _ => &empty,
    };

    let (components, source) = match (blob, &custom.herbs, formula) {
        (_, Some(herbs), _) => (herbs.as_slice(), CompositionSource::CustomFormula),
        (BlobState::Unparseable, None, _) => (&[][..], CompositionSource::None),
        (_, None, Some(f)) => (f.composition.as_slice(), CompositionSource::StoredFormula),
        (_, None, None) => (&[][..], CompositionSource::None),
    };

    let herbs = resolve_with(components, quantity, settings.resolve_options());

    let pinyin_name = custom
        .pinyin_name
        .clone()
        .or_else(|| {
            formula
                .map(|f| f.display_name().to_string())
                .filter(|n| !n.is_empty())
        })
        .unwrap_or_else(|| CUSTOM_FORMULA_NAME.to_string());

    let actions = if custom.actions.is_empty() {
        formula.map(|f| f.actions.clone()).unwrap_or_default()
    } else {
        custom.actions.clone()
    };

    FormulaView {
        id: formula.and_then(|f| f.id),
        pinyin_name,
        chinese_name: or_stored(&custom.chinese_name, formula.map(|f| &f.chinese_name)),
        english_name: or_stored(&custom.english_name, formula.map(|f| &f.english_name)),
        category: or_stored(&custom.category, formula.map(|f| &f.category)),
        has_composition: !herbs.is_empty(),
        herbs,
        composition_source: source,
        actions,
        indications: or_stored(&custom.indications, formula.map(|f| &f.indications)),
        clinical_applications: or_stored(
            &custom.clinical_applications,
            formula.map(|f| &f.clinical_applications),
        ),
        contraindications: or_stored(
            &custom.contraindications,
            formula.map(|f| &f.contraindications),
        ),
        cautions: or_stored(&custom.cautions, formula.map(|f| &f.cautions)),
        pharmacological_effects: or_stored(
            &custom.pharmacological_effects,
            formula.map(|f| &f.pharmacological_effects),
        ),
        research: or_stored(&custom.research, formula.map(|f| &f.research)),
        herb_drug_interactions: or_stored(
            &custom.herb_drug_interactions,
            formula.map(|f| &f.herb_drug_interactions),
        ),
    }
}

fn or_stored(own: &Option<String>, stored: Option<&Option<String>>) -> Option<String> {
    own.clone().or_else(|| stored.cloned().flatten())
}

/// Resolve a stored formula for its preview screen.
pub fn preview_formula(
    formula: &Formula,
    total_grams: f64,
    settings: &ClinicSettings,
) -> FormulaView {
    formula_view(Some(formula), &BlobState::Absent, total_grams, settings)
}

// ═══════════════════════════════════════════
// Draft (prescription builder)
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum DraftLine {
    Herb { herb: Herb, grams: f64 },
    Formula { formula: Formula, grams: f64 },
}

/// Lines collected by the prescription builder, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrescriptionDraft {
    lines: Vec<DraftLine>,
}

impl PrescriptionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_herb(&mut self, herb: Herb, grams: f64) -> &mut Self {
        self.lines.push(DraftLine::Herb { herb, grams });
        self
    }

    pub fn add_formula(&mut self, formula: Formula, grams: f64) -> &mut Self {
        self.lines.push(DraftLine::Formula { formula, grams });
        self
    }

    /// Remove a line by position. Out-of-range positions are ignored.
    pub fn remove(&mut self, index: usize) -> Option<DraftLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_grams(&self) -> f64 {
        self.lines
            .iter()
            .map(|line| match line {
                DraftLine::Herb { grams, .. } | DraftLine::Formula { grams, .. } => *grams,
            })
            .sum()
    }

    /// View items for the builder's live preview, in insertion order.
    pub fn items(&self, settings: &ClinicSettings) -> Vec<PrescriptionItem> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let id = i as i64 + 1;
                match line {
                    DraftLine::Herb { herb, grams } => PrescriptionItem {
                        id,
                        kind: ItemKind::Herb,
                        quantity: *grams,
                        is_placeholder: false,
                        formula: None,
                        herb: Some(herb.clone()),
                    },
                    DraftLine::Formula { formula, grams } => PrescriptionItem {
                        id,
                        kind: ItemKind::Formula,
                        quantity: *grams,
                        is_placeholder: false,
                        formula: Some(preview_formula(formula, *grams, settings)),
                        herb: None,
                    },
                }
            })
            .collect()
    }

    /// Flatten the draft into a custom blob. Every herb carries explicit
    /// grams, so the stored blob renders with the weights shown here.
    pub fn to_custom_formula(&self, settings: &ClinicSettings) -> Value {
        let total = self.total_grams();
        let mut herbs = Vec::new();
        let mut contraindications = Vec::new();
        let mut cautions = Vec::new();
        let mut interactions = Vec::new();

        for line in &self.lines {
            match line {
                DraftLine::Herb { herb, grams } => {
                    herbs.push(json!({
                        "herbId": herb.id.map(|id| id.to_string()),
                        "pinyinName": herb.pinyin_name,
                        "chineseName": herb.chinese_name,
                        "latinName": herb.latin_name,
                        "grams": grams,
                        "percentage": percent_of(*grams, total),
                    }));
                    note(&mut contraindications, &herb.contraindications);
                    note(&mut cautions, &herb.cautions);
                    note(&mut interactions, &herb.herb_drug_interactions);
                }
                DraftLine::Formula { formula, grams } => {
                    let lines =
                        resolve_with(&formula.composition, *grams, settings.resolve_options());
                    for l in lines {
                        herbs.push(json!({
                            "herbId": l.herb_id,
                            "pinyinName": l.name,
                            "chineseName": l.chinese_name,
                            "latinName": l.latin_name,
                            "grams": l.grams,
                            "percentage": percent_of(l.grams, total),
                            "function": l.function,
                        }));
                    }
                    note(&mut contraindications, &formula.contraindications);
                    note(&mut cautions, &formula.cautions);
                    note(&mut interactions, &formula.herb_drug_interactions);
                }
            }
        }

        json!({
            "herbs": herbs,
            "totalGrams": total,
            "contraindications": contraindications.join("; "),
            "cautions": cautions.join("; "),
            "herbDrugInteractions": interactions.join("; "),
        })
    }
}

fn percent_of(grams: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    round1(grams * 100.0 / total)
}

fn note(target: &mut Vec<String>, text: &Option<String>) {
    if let Some(t) = text {
        if !target.contains(t) {
            target.push(t.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HerbComponent;
    use chrono::NaiveDateTime;

    fn created() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-05-02 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn patient() -> Patient {
        Patient {
            id: Some(3),
            name: "Chen Mei".into(),
            identifier: Some("mei@example.com".into()),
            contact_info: Some("555-0123".into()),
            medical_history: Some("8 Lotus Lane".into()),
            medications: vec![],
        }
    }

    fn rx() -> Prescription {
        let mut rx = Prescription::new(3, created());
        rx.id = Some(12);
        rx
    }

    fn si_jun_zi() -> Formula {
        Formula {
            id: Some(5),
            pinyin_name: "Si Jun Zi Tang".into(),
            chinese_name: Some("四君子汤".into()),
            english_name: Some("Four Gentlemen Decoction".into()),
            category: Some("Qi tonic".into()),
            composition: vec![
                HerbComponent {
                    name: "Ren Shen".into(),
                    dosage: Some("30%".into()),
                    ..Default::default()
                },
                HerbComponent {
                    name: "Bai Zhu".into(),
                    percentage: Some(30.0),
                    ..Default::default()
                },
                HerbComponent {
                    name: "Fu Ling".into(),
                    dosage: Some("25%".into()),
                    ..Default::default()
                },
                HerbComponent {
                    name: "Zhi Gan Cao".into(),
                    dosage: Some("15g".into()),
                    ..Default::default()
                },
            ],
            cautions: Some("Yin deficiency with heat".into()),
            ..Default::default()
        }
    }

    #[test]
    fn neither_source_gives_single_placeholder() {
        let data = build_view(&rx(), &patient(), None, None);
        assert_eq!(data.items.len(), 1);
        let item = &data.items[0];
        assert!(item.is_placeholder());
        assert_eq!(item.id, PLACEHOLDER_ITEM_ID);
        assert_eq!(item.name(), PLACEHOLDER_TEXT);
        assert_eq!(item.quantity, 100.0);
    }

    #[test]
    fn zero_herb_formula_is_not_placeholder() {
        let empty = Formula {
            id: Some(9),
            pinyin_name: "Empty Tang".into(),
            ..Default::default()
        };
        let data = build_view(&rx(), &patient(), Some(&empty), None);
        let item = &data.items[0];
        assert!(!item.is_placeholder());
        assert_ne!(item.id, PLACEHOLDER_ITEM_ID);
        let view = item.formula.as_ref().unwrap();
        assert!(!view.has_composition);
        assert_eq!(view.composition_source, CompositionSource::StoredFormula);
    }

    #[test]
    fn stored_formula_resolved_against_quantity() {
        let mut rx = rx();
        rx.quantity = Some(200.0);
        let data = build_view(&rx, &patient(), Some(&si_jun_zi()), None);
        let view = data.items[0].formula.as_ref().unwrap();
        let grams: Vec<f64> = view.herbs.iter().map(|h| h.grams).collect();
        assert_eq!(grams, vec![60.0, 60.0, 50.0, 30.0]);
        assert_eq!(data.items[0].quantity, 200.0);
    }

    #[test]
    fn custom_herbs_override_formula_composition() {
        let blob = json!({"herbs": [{"name": "Huang Qi", "percentage": 50}]});
        let data = build_view(&rx(), &patient(), Some(&si_jun_zi()), Some(&blob));
        let view = data.items[0].formula.as_ref().unwrap();
        assert_eq!(view.composition_source, CompositionSource::CustomFormula);
        assert_eq!(view.herbs.len(), 1);
        assert_eq!(view.herbs[0].grams, 50.0);
        // display metadata falls back to the referenced formula
        assert_eq!(view.pinyin_name, "Si Jun Zi Tang");
        assert_eq!(view.category.as_deref(), Some("Qi tonic"));
        assert_eq!(view.cautions.as_deref(), Some("Yin deficiency with heat"));
    }

    #[test]
    fn herbs_given_as_json_text_still_override_formula() {
        let blob = json!({"herbs": "[{\"name\":\"Huang Qi\",\"percentage\":50}]"});
        let data = build_view(&rx(), &patient(), Some(&si_jun_zi()), Some(&blob));
        let view = data.items[0].formula.as_ref().unwrap();
        assert_eq!(view.composition_source, CompositionSource::CustomFormula);
        assert_eq!(view.herbs.len(), 1);
        assert_eq!(view.herbs[0].name, "Huang Qi");
        assert_eq!(view.herbs[0].grams, 50.0);
    }

    #[test]
    fn blob_names_win_over_formula() {
        let blob = json!({
            "pinyinName": "Modified Si Jun Zi",
            "category": "Custom",
            "herbs": []
        });
        let data = build_view(&rx(), &patient(), Some(&si_jun_zi()), Some(&blob));
        let view = data.items[0].formula.as_ref().unwrap();
        assert_eq!(view.pinyin_name, "Modified Si Jun Zi");
        assert_eq!(view.category.as_deref(), Some("Custom"));
        assert_eq!(view.chinese_name.as_deref(), Some("四君子汤"));
        assert!(!view.has_composition);
    }

    #[test]
    fn escaped_blob_matches_clean_blob() {
        let clean = r#"{"herbs":[{"name":"Dang Gui","percentage":40},{"name":"Chuan Xiong","dosage":"60%"}]}"#;
        let escaped = clean.replace('"', "\\\"");

        let a = build_view(&rx(), &patient(), None, Some(&Value::String(clean.into())));
        let b = build_view(&rx(), &patient(), None, Some(&Value::String(escaped)));
        assert_eq!(a.items, b.items);
        assert_eq!(a.items[0].formula.as_ref().unwrap().herbs.len(), 2);
    }

    #[test]
    fn unreadable_blob_keeps_formula_metadata() {
        let blob = Value::String("{{not json".into());
        let data = build_view(&rx(), &patient(), Some(&si_jun_zi()), Some(&blob));
        let item = &data.items[0];
        assert!(!item.is_placeholder());
        let view = item.formula.as_ref().unwrap();
        assert!(view.herbs.is_empty());
        assert_eq!(view.pinyin_name, "Si Jun Zi Tang");
        assert_eq!(view.english_name.as_deref(), Some("Four Gentlemen Decoction"));
    }

    #[test]
    fn blob_without_herbs_uses_formula_composition() {
        let blob = json!({"notes": "patient prefers granules"});
        let data = build_view(&rx(), &patient(), Some(&si_jun_zi()), Some(&blob));
        let view = data.items[0].formula.as_ref().unwrap();
        assert_eq!(view.composition_source, CompositionSource::StoredFormula);
        assert_eq!(view.herbs.len(), 4);
    }

    #[test]
    fn blob_total_grams_used_when_undeclared() {
        let blob = json!({"totalGrams": 50, "herbs": [{"name": "Gan Cao", "percentage": 10}]});
        let data = build_view(&rx(), &patient(), None, Some(&blob));
        assert_eq!(data.items[0].quantity, 50.0);
        assert_eq!(data.items[0].formula.as_ref().unwrap().herbs[0].grams, 5.0);
    }

    #[test]
    fn patient_contact_copied() {
        let data = build_view(&rx(), &patient(), None, None);
        assert_eq!(data.patient_name, "Chen Mei");
        assert_eq!(data.patient_email.as_deref(), Some("mei@example.com"));
        assert_eq!(data.patient_phone.as_deref(), Some("555-0123"));
        assert_eq!(data.patient_address.as_deref(), Some("8 Lotus Lane"));
        assert_eq!(data.date, "2024-05-02");
        assert_eq!(data.number, "RX-20240502-0012");
    }

    #[test]
    fn stored_view_reads_custom_column() {
        let mut rx = rx();
        rx.custom_formula = Some(r#"{"herbs":[{"name":"Bai Shao","grams":12}]}"#.into());
        let data = build_stored_view(&rx, &patient(), None, &ClinicSettings::default());
        let herbs = &data.items[0].formula.as_ref().unwrap().herbs;
        assert_eq!(herbs[0].name, "Bai Shao");
        assert_eq!(herbs[0].grams, 12.0);
    }

    #[test]
    fn draft_keeps_insertion_order() {
        let herb = Herb {
            id: Some(1),
            pinyin_name: "Gan Cao".into(),
            chinese_name: "甘草".into(),
            ..Default::default()
        };
        let mut draft = PrescriptionDraft::new();
        draft.add_formula(si_jun_zi(), 100.0).add_herb(herb, 20.0);

        let items = draft.items(&ClinicSettings::default());
        assert_eq!(items[0].kind, ItemKind::Formula);
        assert_eq!(items[1].kind, ItemKind::Herb);
        assert_eq!(items[1].quantity, 20.0);
        assert_eq!(draft.total_grams(), 120.0);
    }

    #[test]
    fn draft_blob_round_trips_through_view() {
        let herb = Herb {
            id: Some(1),
            pinyin_name: "Gan Cao".into(),
            chinese_name: "甘草".into(),
            cautions: Some("Edema".into()),
            ..Default::default()
        };
        let mut draft = PrescriptionDraft::new();
        draft.add_formula(si_jun_zi(), 100.0).add_herb(herb, 20.0);
        let blob = draft.to_custom_formula(&ClinicSettings::default());

        let data = build_view(&rx(), &patient(), None, Some(&Value::String(blob.to_string())));
        let view = data.items[0].formula.as_ref().unwrap();
        assert_eq!(data.items[0].quantity, 120.0);
        let grams: Vec<f64> = view.herbs.iter().map(|h| h.grams).collect();
        assert_eq!(grams, vec![30.0, 30.0, 25.0, 15.0, 20.0]);
        assert_eq!(view.cautions.as_deref(), Some("Yin deficiency with heat; Edema"));
    }

    #[test]
    fn draft_remove_out_of_range() {
        let mut draft = PrescriptionDraft::new();
        assert!(draft.remove(0).is_none());
        draft.add_formula(si_jun_zi(), 10.0);
        assert!(draft.remove(0).is_some());
        assert!(draft.is_empty());
    }
}
