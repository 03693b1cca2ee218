//! Recovery of prescription-specific formula blobs.
//!
//! The `customFormula` column has been written by several generations of
//! the prescription builder. It arrives as an object, as JSON text, as
//! JSON text wrapped in another JSON string, or as text whose quotes were
//! escaped one time too many. [`parse_lenient`] runs an ordered list of
//! strategies and reports which one succeeded; callers never see an error.

use serde_json::{Map, Value};

use crate::models::HerbComponent;
use crate::normalize::{
    components_from_array, decode_embedded, field, first_text, number, string_list, text,
};

/// Parsers tried, in order, on blob text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Plain `serde_json` parse.
    Direct,
    /// Parse after replacing `\"`, `\n` and `\\` with their literal characters.
    Unescaped,
    /// Parse only the span from the first `{` to the last `}`.
    BraceSpan,
}

pub const STRATEGIES: [ParseStrategy; 3] = [
    ParseStrategy::Direct,
    ParseStrategy::Unescaped,
    ParseStrategy::BraceSpan,
];

/// One failed attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub strategy: ParseStrategy,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed { value: Value, strategy: ParseStrategy },
    Failed(Vec<ParseFailure>),
}

impl ParseStrategy {
    pub fn attempt(self, raw: &str) -> Result<Value, ParseFailure> {
        let fail = |reason: String| ParseFailure {
            strategy: self,
            reason,
        };

        let candidate = match self {
            Self::Direct => raw.to_string(),
            Self::Unescaped => unescape(raw),
            Self::BraceSpan => brace_span(raw)
                .ok_or_else(|| fail("no {...} span".into()))?
                .to_string(),
        };

        serde_json::from_str::<Value>(candidate.trim()).map_err(|e| fail(e.to_string()))
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\\"", "\"")
        .replace("\\n", "\n")
        .replace("\\\\", "\\")
}

fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Run every strategy in order until one yields JSON.
///
/// A result that is itself a JSON string (double encoding) is unwrapped
/// one more level.
pub fn parse_lenient(raw: &str) -> ParseOutcome {
    parse_with_depth(raw, 1)
}

fn parse_with_depth(raw: &str, unwrap_budget: u8) -> ParseOutcome {
    let mut failures = Vec::new();

    for strategy in STRATEGIES {
        match strategy.attempt(raw) {
            Ok(Value::String(inner)) if unwrap_budget > 0 => {
                return match parse_with_depth(&inner, unwrap_budget - 1) {
                    ParseOutcome::Parsed { value, .. } => ParseOutcome::Parsed { value, strategy },
                    ParseOutcome::Failed(mut nested) => {
                        failures.append(&mut nested);
                        ParseOutcome::Failed(failures)
                    }
                };
            }
            Ok(value) => return ParseOutcome::Parsed { value, strategy },
            Err(failure) => failures.push(failure),
        }
    }

    ParseOutcome::Failed(failures)
}

// ═══════════════════════════════════════════
// Interpreted blob
// ═══════════════════════════════════════════

/// The fields of a custom blob that the prescription view uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomFormula {
    /// `None` when the blob has no `herbs` array at all.
    pub herbs: Option<Vec<HerbComponent>>,
    pub pinyin_name: Option<String>,
    pub chinese_name: Option<String>,
    pub english_name: Option<String>,
    pub category: Option<String>,
    pub total_grams: Option<f64>,
    pub actions: Vec<String>,
    pub indications: Option<String>,
    pub clinical_applications: Option<String>,
    pub contraindications: Option<String>,
    pub cautions: Option<String>,
    pub pharmacological_effects: Option<String>,
    pub research: Option<String>,
    pub herb_drug_interactions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlobState {
    /// No blob, an empty string, or a JSON `null`.
    Absent,
    /// A blob was stored but nothing usable could be recovered from it.
    Unparseable,
    Parsed(CustomFormula),
}

impl BlobState {
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Interpret the stored blob. Accepts a pre-parsed object or text.
pub fn interpret(blob: Option<&Value>) -> BlobState {
    match blob {
        None | Some(Value::Null) => BlobState::Absent,
        Some(Value::Object(obj)) => BlobState::Parsed(from_object(obj)),
        Some(Value::String(raw)) => interpret_text(raw),
        Some(other) => {
            tracing::debug!(kind = json_kind(other), "Custom formula blob is not an object");
            BlobState::Unparseable
        }
    }
}

/// Interpret a blob stored as text.
pub fn interpret_text(raw: &str) -> BlobState {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return BlobState::Absent;
    }

    match parse_lenient(trimmed) {
        ParseOutcome::Parsed {
            value: Value::Object(obj),
            strategy,
        } => {
            if strategy != ParseStrategy::Direct {
                tracing::debug!(?strategy, "Recovered custom formula blob");
            }
            BlobState::Parsed(from_object(&obj))
        }
        ParseOutcome::Parsed { value, .. } => {
            tracing::debug!(kind = json_kind(&value), "Custom formula blob is not an object");
            BlobState::Unparseable
        }
        ParseOutcome::Failed(failures) => {
            tracing::debug!(
                attempts = failures.len(),
                last = failures.last().map(|f| f.reason.as_str()).unwrap_or(""),
                "Custom formula blob unreadable, continuing without it"
            );
            BlobState::Unparseable
        }
    }
}

fn from_object(obj: &Map<String, Value>) -> CustomFormula {
    CustomFormula {
        herbs: field(obj, "herbs")
            .and_then(decode_embedded)
            .and_then(|decoded| match decoded {
                Value::Array(items) => Some(components_from_array(&items)),
                _ => None,
            }),
        pinyin_name: first_text(obj, &["pinyinName", "formulaName", "name"]),
        chinese_name: text(obj, "chineseName"),
        english_name: text(obj, "englishName"),
        category: text(obj, "category"),
        total_grams: number(obj, "totalGrams"),
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

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLEAN: &str = r#"{"herbs":[{"name":"Ren Shen","percentage":40},{"name":"Gan Cao","dosage":"10%"}]}"#;

    fn herbs_of(state: BlobState) -> Vec<HerbComponent> {
        match state {
            BlobState::Parsed(cf) => cf.herbs.unwrap(),
            other => panic!("expected parsed blob, got {other:?}"),
        }
    }

    #[test]
    fn direct_parse_first() {
        match parse_lenient(CLEAN) {
            ParseOutcome::Parsed { strategy, .. } => assert_eq!(strategy, ParseStrategy::Direct),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn escaped_quotes_recovered_identically() {
        let escaped = CLEAN.replace('"', "\\\"");
        assert!(escaped.starts_with("{\\\"herbs\\\""));

        match parse_lenient(&escaped) {
            ParseOutcome::Parsed { strategy, .. } => assert_eq!(strategy, ParseStrategy::Unescaped),
            other => panic!("{other:?}"),
        }
        assert_eq!(herbs_of(interpret_text(&escaped)), herbs_of(interpret_text(CLEAN)));
    }

    #[test]
    fn brace_span_strips_surrounding_noise() {
        let noisy = format!("custom: {CLEAN} (saved)");
        match parse_lenient(&noisy) {
            ParseOutcome::Parsed { strategy, .. } => assert_eq!(strategy, ParseStrategy::BraceSpan),
            other => panic!("{other:?}"),
        }
        assert_eq!(herbs_of(interpret_text(&noisy)).len(), 2);
    }

    #[test]
    fn double_encoded_string_unwrapped() {
        let wrapped = serde_json::to_string(CLEAN).unwrap();
        assert_eq!(herbs_of(interpret_text(&wrapped)).len(), 2);
    }

    #[test]
    fn all_strategies_fail_without_panic() {
        match parse_lenient("{herbs: [broken") {
            ParseOutcome::Failed(failures) => {
                assert_eq!(failures.len(), 3);
                assert_eq!(failures[2].strategy, ParseStrategy::BraceSpan);
            }
            other => panic!("{other:?}"),
        }
        assert_eq!(interpret_text("{herbs: [broken"), BlobState::Unparseable);
    }

    #[test]
    fn empty_and_null_are_absent() {
        assert_eq!(interpret(None), BlobState::Absent);
        assert_eq!(interpret(Some(&Value::Null)), BlobState::Absent);
        assert_eq!(interpret_text("   "), BlobState::Absent);
        assert_eq!(interpret_text("null"), BlobState::Absent);
    }

    #[test]
    fn pre_parsed_object_with_snake_case() {
        let blob = json!({
            "pinyin_name": "Custom Qi Tonic",
            "total_grams": "150",
            "herb_drug_interactions": "Warfarin",
            "herbs": [{"pinyin_name": "Huang Qi", "grams": 30}]
        });
        match interpret(Some(&blob)) {
            BlobState::Parsed(cf) => {
                assert_eq!(cf.pinyin_name.as_deref(), Some("Custom Qi Tonic"));
                assert_eq!(cf.total_grams, Some(150.0));
                assert_eq!(cf.herb_drug_interactions.as_deref(), Some("Warfarin"));
                let herbs = cf.herbs.unwrap();
                assert_eq!(herbs[0].name, "Huang Qi");
                assert_eq!(herbs[0].grams, Some(30.0));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn object_without_herbs_array() {
        match interpret(Some(&json!({"cautions": "Pregnancy"}))) {
            BlobState::Parsed(cf) => {
                assert!(cf.herbs.is_none());
                assert_eq!(cf.cautions.as_deref(), Some("Pregnancy"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn array_blob_is_unparseable() {
        assert_eq!(interpret_text("[1,2,3]"), BlobState::Unparseable);
    }
}
