//! Inbound data adapters.
//!
//! Upstream records are inconsistently shaped: the same field arrives as
//! `pinyinName` or `pinyin_name`, numbers arrive as strings, lists arrive
//! as JSON text or comma-separated strings. This module is the only place
//! that tolerates those variations. Each entity gets one adapter that
//! turns a `serde_json::Value` into its canonical model; everything
//! downstream works on the models alone.
//!
//! Key lookup always tries the camelCase spelling first and falls back to
//! the snake_case spelling, so camelCase wins when both carry a usable
//! value. A null or blank camelCase value falls through to snake_case.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::custom_formula::{parse_lenient, ParseOutcome};
use crate::models::enums::PrescriptionStatus;
use crate::models::{
    ClinicalCase, ClinicalPattern, Formula, Herb, HerbCombination, HerbComponent, Patient,
    Prescription, TcmAction,
};

type Object = Map<String, Value>;

// ═══════════════════════════════════════════
// Field access
// ═══════════════════════════════════════════

/// `pinyinName` → `pinyin_name`.
pub fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Look up a field by its camelCase name, then by its snake_case name.
/// JSON `null` counts as absent.
pub fn field<'a>(obj: &'a Object, key: &str) -> Option<&'a Value> {
    let present = |v: &&Value| !v.is_null();
    obj.get(key).filter(present).or_else(|| {
        let snake = snake_case(key);
        if snake == key {
            None
        } else {
            obj.get(&snake).filter(present)
        }
    })
}

/// Values stored under the camelCase key, then the snake_case key.
fn spellings<'a>(obj: &'a Object, key: &str) -> impl Iterator<Item = &'a Value> {
    let snake = snake_case(key);
    let snake = (snake != key).then_some(snake);
    obj.get(key)
        .into_iter()
        .chain(snake.and_then(|k| obj.get(&k)))
        .filter(|v| !v.is_null())
}

/// Non-empty text. Numbers are stringified; string arrays are joined.
/// A blank camelCase value does not hide a filled snake_case one.
pub fn text(obj: &Object, key: &str) -> Option<String> {
    spellings(obj, key).find_map(value_to_text)
}

/// First non-empty text among several candidate keys.
pub fn first_text(obj: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(obj, k))
}

/// Finite number from a JSON number or a numeric string.
pub fn number(obj: &Object, key: &str) -> Option<f64> {
    spellings(obj, key).find_map(value_to_number)
}

/// A list of strings from an array, a JSON-array string, or a
/// comma/semicolon separated string.
pub fn string_list(obj: &Object, key: &str) -> Vec<String> {
    spellings(obj, key)
        .map(value_to_string_list)
        .find(|list| !list.is_empty())
        .unwrap_or_default()
}

/// Decode a stored list column (JSON array text or separated text).
pub fn list_column(raw: Option<String>) -> Vec<String> {
    raw.map(|s| value_to_string_list(&Value::String(s)))
        .unwrap_or_default()
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn value_to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn value_to_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_to_text).collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
                    return items.iter().filter_map(value_to_text).collect();
                }
            }
            trimmed
                .split([',', ';', '，'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Accept a JSON value that may itself be JSON text (stored columns,
/// double-encoded bodies). Unparseable text yields `None`.
pub fn decode_embedded(value: &Value) -> Option<Value> {
    match value {
        Value::String(raw) => match parse_lenient(raw) {
            ParseOutcome::Parsed { value, .. } => Some(value),
            ParseOutcome::Failed(attempts) => {
                tracing::debug!(attempts = attempts.len(), "Embedded JSON could not be decoded");
                None
            }
        },
        Value::Null => None,
        other => Some(other.clone()),
    }
}

fn id_text(obj: &Object, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| field(obj, k))
        .and_then(value_to_text)
}

fn id_number(obj: &Object, key: &str) -> Option<i64> {
    match field(obj, key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ═══════════════════════════════════════════
// Herb
// ═══════════════════════════════════════════

pub fn herb_from_value(value: &Value) -> Herb {
    let Some(obj) = value.as_object() else {
        return Herb::default();
    };

    Herb {
        id: id_number(obj, "id"),
        pinyin_name: first_text(obj, &["pinyinName", "name"]).unwrap_or_default(),
        chinese_name: text(obj, "chineseName").unwrap_or_default(),
        latin_name: text(obj, "latinName"),
        english_name: text(obj, "englishName"),
        category: text(obj, "category"),
        nature: text(obj, "nature"),
        flavor: text(obj, "flavor"),
        meridians: string_list(obj, "meridians"),
        dosage_range: first_text(obj, &["dosageRange", "dosage"]),
        contraindications: text(obj, "contraindications"),
        cautions: text(obj, "cautions"),
        herb_drug_interactions: text(obj, "herbDrugInteractions"),
        tcm_actions: field(obj, "tcmActions")
            .map(tcm_actions_from_value)
            .unwrap_or_default(),
    }
}

/// The actions tree may be an array, a single object, or JSON text of either.
pub fn tcm_actions_from_value(value: &Value) -> Vec<TcmAction> {
    let Some(decoded) = decode_embedded(value) else {
        return Vec::new();
    };
    object_list(&decoded)
        .into_iter()
        .map(|obj| TcmAction {
            function: first_text(obj, &["function", "name"]),
            patterns: children(obj, "patterns")
                .into_iter()
                .map(|p| ClinicalPattern {
                    pattern: first_text(p, &["pattern", "name"]),
                    cases: children(p, "cases")
                        .into_iter()
                        .map(|c| ClinicalCase {
                            case: first_text(c, &["case", "name"]),
                            combinations: children(c, "combinations")
                                .into_iter()
                                .map(|h| HerbCombination {
                                    herbs: first_text(h, &["herbs", "combination"]),
                                    effect: text(h, "effect"),
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

fn object_list(value: &Value) -> Vec<&Object> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(obj) => vec![obj],
        _ => Vec::new(),
    }
}

fn children<'a>(obj: &'a Object, key: &str) -> Vec<&'a Object> {
    field(obj, key).map(object_list).unwrap_or_default()
}

// ═══════════════════════════════════════════
// Formula and composition
// ═══════════════════════════════════════════

pub fn formula_from_value(value: &Value) -> Formula {
    let Some(obj) = value.as_object() else {
        return Formula::default();
    };

    Formula {
        id: id_number(obj, "id"),
        pinyin_name: first_text(obj, &["pinyinName", "name"]).unwrap_or_default(),
        chinese_name: text(obj, "chineseName"),
        english_name: text(obj, "englishName"),
        category: text(obj, "category"),
        composition: field(obj, "composition")
            .map(composition_from_value)
            .unwrap_or_default(),
        actions: string_list(obj, "actions"),
        indications: text(obj, "indications"),
        clinical_applications: text(obj, "clinicalApplications"),
        contraindications: text(obj, "contraindications"),
        cautions: text(obj, "cautions"),
        pharmacological_effects: text(obj, "pharmacologicalEffects"),
        research: text(obj, "research"),
        herb_drug_interactions: text(obj, "herbDrugInteractions"),
    }
}

/// A composition is an array of components, an object with a `herbs`
/// array, or JSON text of either. Anything else is an empty composition.
pub fn composition_from_value(value: &Value) -> Vec<HerbComponent> {
    let Some(decoded) = decode_embedded(value) else {
        return Vec::new();
    };
    match &decoded {
        Value::Array(items) => components_from_array(items),
        Value::Object(obj) => field(obj, "herbs")
            .and_then(Value::as_array)
            .map(|items| components_from_array(items))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

pub fn components_from_array(items: &[Value]) -> Vec<HerbComponent> {
    items.iter().filter_map(herb_component_from_value).collect()
}

/// One composition entry. A bare string is taken as the herb name.
pub fn herb_component_from_value(value: &Value) -> Option<HerbComponent> {
    match value {
        Value::String(name) => {
            let name = name.trim();
            (!name.is_empty()).then(|| HerbComponent {
                name: name.to_string(),
                ..Default::default()
            })
        }
        Value::Object(obj) => Some(HerbComponent {
            herb_id: id_text(obj, &["herbId", "id"]),
            name: first_text(obj, &["pinyinName", "name", "herbName"]).unwrap_or_default(),
            chinese_name: text(obj, "chineseName"),
            latin_name: text(obj, "latinName"),
            percentage: number(obj, "percentage"),
            grams: number(obj, "grams"),
            dosage: text(obj, "dosage"),
            function: text(obj, "function"),
        }),
        _ => None,
    }
}

// ═══════════════════════════════════════════
// Patient
// ═══════════════════════════════════════════

/// Accepts the generic column names as well as the contact aliases
/// (`email`, `phone`, `address`) used by the patient form.
pub fn patient_from_value(value: &Value) -> Patient {
    let Some(obj) = value.as_object() else {
        return Patient::default();
    };

    Patient {
        id: id_number(obj, "id"),
        name: text(obj, "name").unwrap_or_default(),
        identifier: first_text(obj, &["identifier", "email"]),
        contact_info: first_text(obj, &["contactInfo", "phone"]),
        medical_history: first_text(obj, &["medicalHistory", "address"]),
        medications: string_list(obj, "medications"),
    }
}

// ═══════════════════════════════════════════
// Prescription
// ═══════════════════════════════════════════

/// Build a prescription record from a create request.
///
/// A `customFormula` given as an object is stored as its JSON text; a
/// string is stored verbatim so later reads see exactly what was sent.
pub fn prescription_from_value(value: &Value, created_at: NaiveDateTime) -> Prescription {
    let mut rx = Prescription::new(0, created_at);
    let Some(obj) = value.as_object() else {
        return rx;
    };

    rx.id = id_number(obj, "id");
    rx.patient_id = id_number(obj, "patientId").unwrap_or(0);
    rx.formula_id = id_number(obj, "formulaId");
    rx.custom_formula = field(obj, "customFormula").and_then(|v| match v {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    });
    rx.quantity = number(obj, "quantity").or_else(|| number(obj, "totalGrams"));
    rx.notes = text(obj, "notes");
    rx.instructions = text(obj, "instructions");
    rx.duration = text(obj, "duration");
    rx.status = text(obj, "status")
        .and_then(|s| s.to_lowercase().parse().ok())
        .unwrap_or(PrescriptionStatus::default());
    rx.active_conditions = {
        let list = string_list(obj, "activeConditions");
        if list.is_empty() {
            string_list(obj, "medicalConditions")
        } else {
            list
        }
    };
    rx.active_medications = string_list(obj, "activeMedications");
    rx
}
