//! Formula composition resolution: turns a composition list and a batch
//! weight into per-herb percentage and gram lines.
//!
//! Shares come from an explicit `percentage`, else from the first
//! `<n>%` in the dosage text, else from the first `<n>g` in the dosage
//! text read as a percentage (stored formulas depend on that reading, so
//! it stays the default; see [`ResolveOptions::gram_dosage_as_percentage`]).
//! Explicit `grams` are reported as given and never rescaled.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TOTAL_GRAMS;
use crate::models::HerbComponent;

static RE_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").unwrap());
static RE_GRAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)g").unwrap());

/// Where a line's percentage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareSource {
    Explicit,
    DosagePercent,
    DosageGrams,
    Unresolved,
}

/// A composition line with its share resolved against a batch weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedHerbLine {
    pub herb_id: Option<String>,
    pub name: String,
    pub chinese_name: Option<String>,
    pub latin_name: Option<String>,
    pub dosage: Option<String>,
    pub function: Option<String>,
    pub percentage: f64,
    pub grams: f64,
    pub share_source: ShareSource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    /// Read a bare `"9g"` dosage as a 9 % share. When false, the gram
    /// figure is used as the line weight and the percentage is derived
    /// from it.
    pub gram_dosage_as_percentage: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            gram_dosage_as_percentage: true,
        }
    }
}

/// Resolve with the default batch weight of 100 g.
pub fn resolve_default(composition: &[HerbComponent]) -> Vec<ResolvedHerbLine> {
    resolve(composition, DEFAULT_TOTAL_GRAMS)
}

pub fn resolve(composition: &[HerbComponent], total_grams: f64) -> Vec<ResolvedHerbLine> {
    resolve_with(composition, total_grams, ResolveOptions::default())
}

pub fn resolve_with(
    composition: &[HerbComponent],
    total_grams: f64,
    options: ResolveOptions,
) -> Vec<ResolvedHerbLine> {
    composition
        .iter()
        .map(|component| resolve_line(component, total_grams, options))
        .collect()
}

fn resolve_line(
    component: &HerbComponent,
    total_grams: f64,
    options: ResolveOptions,
) -> ResolvedHerbLine {
    let dosage = component.dosage.as_deref().unwrap_or("");

    let (mut percentage, source) = match component.percentage.filter(|p| p.is_finite()) {
        Some(p) => (p, ShareSource::Explicit),
        None => match first_number(&RE_PERCENT, dosage) {
            Some(p) => (p, ShareSource::DosagePercent),
            None => match first_number(&RE_GRAMS, dosage) {
                Some(g) => (g, ShareSource::DosageGrams),
                None => (0.0, ShareSource::Unresolved),
            },
        },
    };

    let mut grams = match component.grams.filter(|g| g.is_finite()) {
        Some(g) => g,
        None => scale(percentage, total_grams),
    };

    if source == ShareSource::DosageGrams && !options.gram_dosage_as_percentage {
        if component.grams.is_none() {
            grams = percentage;
        }
        percentage = if total_grams > 0.0 {
            round1(grams * 100.0 / total_grams)
        } else {
            0.0
        };
    }

    if source == ShareSource::Unresolved && component.grams.is_none() {
        tracing::debug!(herb = %component.name, dosage, "No share found for composition line");
    }

    ResolvedHerbLine {
        herb_id: component.herb_id.clone(),
        name: component.name.clone(),
        chinese_name: component.chinese_name.clone(),
        latin_name: component.latin_name.clone(),
        dosage: component.dosage.clone(),
        function: component.function.clone(),
        percentage,
        grams,
        share_source: source,
    }
}

fn first_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Grams for a percentage share of `total_grams`, to one decimal place.
/// Zero or negative batch weights produce zero.
pub fn scale(percentage: f64, total_grams: f64) -> f64 {
    if total_grams <= 0.0 || !total_grams.is_finite() {
        return 0.0;
    }
    round1(percentage * total_grams / 100.0)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sum of resolved grams, to one decimal place.
pub fn total_resolved_grams(lines: &[ResolvedHerbLine]) -> f64 {
    round1(lines.iter().map(|l| l.grams).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str) -> HerbComponent {
        HerbComponent {
            name: name.into(),
            ..Default::default()
        }
    }

    fn with_percentage(name: &str, p: f64) -> HerbComponent {
        HerbComponent {
            percentage: Some(p),
            ..component(name)
        }
    }

    fn with_dosage(name: &str, dosage: &str) -> HerbComponent {
        HerbComponent {
            dosage: Some(dosage.into()),
            ..component(name)
        }
    }

    #[test]
    fn explicit_percentages_scale_to_total() {
        let comp = vec![
            with_percentage("Ren Shen", 30.0),
            with_percentage("Bai Zhu", 30.0),
            with_percentage("Fu Ling", 25.0),
            with_percentage("Gan Cao", 15.0),
        ];
        let lines = resolve(&comp, 250.0);
        let grams: Vec<f64> = lines.iter().map(|l| l.grams).collect();
        assert_eq!(grams, vec![75.0, 75.0, 62.5, 37.5]);
        assert!(lines.iter().all(|l| l.share_source == ShareSource::Explicit));
    }

    #[test]
    fn total_sums_resolved_grams() {
        let comp = vec![
            with_percentage("Dang Gui", 33.3),
            with_percentage("Chuan Xiong", 33.3),
            with_dosage("Bai Shao", "not listed"),
        ];
        assert_eq!(total_resolved_grams(&resolve(&comp, 30.0)), 20.0);
        assert_eq!(total_resolved_grams(&[]), 0.0);
    }

    #[test]
    fn rounds_to_one_decimal() {
        let lines = resolve(&[with_percentage("Chen Pi", 33.33)], 37.0);
        assert_eq!(lines[0].grams, 12.3);
    }

    #[test]
    fn empty_composition_is_empty() {
        assert!(resolve(&[], 100.0).is_empty());
    }

    #[test]
    fn percent_in_dosage_text() {
        let lines = resolve(&[with_dosage("Dang Gui", "about 12.5% of batch")], 200.0);
        assert_eq!(lines[0].percentage, 12.5);
        assert_eq!(lines[0].grams, 25.0);
        assert_eq!(lines[0].share_source, ShareSource::DosagePercent);
    }

    #[test]
    fn percent_preferred_over_grams_in_text() {
        let lines = resolve(&[with_dosage("Chuan Xiong", "6g (20%)")], 100.0);
        assert_eq!(lines[0].percentage, 20.0);
    }

    #[test]
    fn gram_dosage_read_as_percentage() {
        let lines = resolve(&[with_dosage("Ren Shen", "9g")], 300.0);
        assert_eq!(lines[0].percentage, 9.0);
        assert_eq!(lines[0].grams, 27.0);
        assert_eq!(lines[0].share_source, ShareSource::DosageGrams);
    }

    #[test]
    fn gram_dosage_as_weight_when_disabled() {
        let options = ResolveOptions {
            gram_dosage_as_percentage: false,
        };
        let lines = resolve_with(&[with_dosage("Ren Shen", "9g")], 300.0, options);
        assert_eq!(lines[0].grams, 9.0);
        assert_eq!(lines[0].percentage, 3.0);
    }

    #[test]
    fn explicit_grams_not_rescaled() {
        let comp = HerbComponent {
            grams: Some(12.0),
            percentage: Some(50.0),
            ..component("Huang Qi")
        };
        let lines = resolve(&[comp], 1000.0);
        assert_eq!(lines[0].grams, 12.0);
        assert_eq!(lines[0].percentage, 50.0);
    }

    #[test]
    fn non_positive_total_gives_zero_grams() {
        let comp = vec![with_percentage("Gan Cao", 10.0), with_dosage("Da Zao", "5%")];
        for total in [0.0, -50.0] {
            assert!(resolve(&comp, total).iter().all(|l| l.grams == 0.0));
        }
    }

    #[test]
    fn malformed_dosage_carries_through() {
        let comp = HerbComponent {
            function: Some("Harmonizes".into()),
            ..with_dosage("Sheng Jiang", "3 slices")
        };
        let lines = resolve(&[comp], 100.0);
        assert_eq!(lines[0].name, "Sheng Jiang");
        assert_eq!(lines[0].function.as_deref(), Some("Harmonizes"));
        assert_eq!(lines[0].percentage, 0.0);
        assert_eq!(lines[0].grams, 0.0);
        assert_eq!(lines[0].share_source, ShareSource::Unresolved);
    }

    #[test]
    fn order_preserved() {
        let comp = vec![component("C"), component("A"), component("B")];
        let names: Vec<String> = resolve_default(&comp).into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }
}
