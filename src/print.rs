//! A4 prescription printout via `printpdf`.
//!
//! Layout, top to bottom: clinic letterhead, prescription number and
//! date, patient block, one section per item with its composition table,
//! notes/instructions/duration, then advisory warnings. Long sections
//! continue on a new page.
//!
//! Text is set in the builtin Helvetica faces, which cover Latin-1 only.
//! When the clinic configures an external CJK font, lines carrying
//! Chinese names are set in that font instead.

use std::io::BufWriter;
use std::path::Path;

use printpdf::*;
use thiserror::Error;

use crate::composition::total_resolved_grams;
use crate::interactions::InteractionFlags;
use crate::prescription::{PrescriptionData, PrescriptionItem};
use crate::settings::ClinicSettings;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 20.0;
const INDENT: f32 = 25.0;
const COL_PERCENT: f32 = 120.0;
const COL_GRAMS: f32 = 150.0;

#[derive(Error, Debug)]
pub enum PrintError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Save(String),
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Writes lines top-down and opens a new page when the bottom margin is hit.
struct Pager<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    cjk: Option<IndirectFontRef>,
    y: Mm,
    pages: usize,
}

impl<'a> Pager<'a> {
    fn new(
        doc: &'a PdfDocumentReference,
        layer: PdfLayerReference,
        cjk: Option<IndirectFontRef>,
    ) -> Self {
        Self {
            doc,
            layer,
            cjk,
            y: Mm(TOP),
            pages: 1,
        }
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y.0 - needed < BOTTOM {
            self.pages += 1;
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Layer {}", self.pages),
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = Mm(TOP);
        }
    }

    /// Whether anything of `text` survives with the fonts at hand.
    fn can_print(&self, text: &str) -> bool {
        !text.trim().is_empty() && (self.cjk.is_some() || !latin1(text).trim().is_empty())
    }

    fn place(&self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        match &self.cjk {
            Some(cjk) if !is_latin1(text) => self.layer.use_text(text, size, Mm(x), self.y, cjk),
            _ => self
                .layer
                .use_text(latin1(text).trim_end(), size, Mm(x), self.y, font),
        }
    }

    fn text(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef, step: f32) {
        self.ensure_room(step);
        self.place(text, size, x, font);
        self.y -= Mm(step);
    }

    fn wrapped(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef, max_chars: usize) {
        for line in wrap_text(text, max_chars) {
            self.text(&line, size, x, font, size * 0.5);
        }
    }

    /// Cells of one table row at fixed x offsets.
    fn row(&mut self, cells: &[(f32, String)], size: f32, font: &IndirectFontRef, step: f32) {
        self.ensure_room(step);
        for (x, cell) in cells {
            self.place(cell, size, *x, font);
        }
        self.y -= Mm(step);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= Mm(mm);
    }
}

/// Render a prescription view. `flags` is matched to `data.items` by
/// position; missing entries print no warnings.
pub fn render_prescription_pdf(
    data: &PrescriptionData,
    settings: &ClinicSettings,
    flags: &[InteractionFlags],
) -> Result<Vec<u8>, PrintError> {
    let title = format!("Prescription {}", data.number);
    let (doc, page1, layer1) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PrintError::Font(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PrintError::Font(e.to_string()))?,
    };

    let cjk = match &settings.cjk_font_path {
        Some(path) => Some(load_external_font(&doc, Path::new(path))?),
        None => None,
    };

    let mut pager = Pager::new(&doc, doc.get_page(page1).get_layer(layer1), cjk);

    header(&mut pager, &fonts, data, settings);
    patient_block(&mut pager, &fonts, data);

    for (index, item) in data.items.iter().enumerate() {
        item_section(&mut pager, &fonts, item);
        if let Some(item_flags) = flags.get(index) {
            warnings(&mut pager, &fonts, item_flags);
        }
    }

    closing(&mut pager, &fonts, data, settings);

    let pages = pager.pages;
    drop(pager);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| PrintError::Save(e.to_string()))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| PrintError::Save(e.to_string()))?;

    tracing::debug!(number = %data.number, pages, bytes = bytes.len(), "Prescription PDF rendered");
    Ok(bytes)
}

fn load_external_font(
    doc: &PdfDocumentReference,
    path: &Path,
) -> Result<IndirectFontRef, PrintError> {
    let bytes = std::fs::read(path)
        .map_err(|e| PrintError::Font(format!("{}: {e}", path.display())))?;
    doc.add_external_font(bytes.as_slice())
        .map_err(|e| PrintError::Font(e.to_string()))
}

fn header(pager: &mut Pager<'_>, fonts: &Fonts, data: &PrescriptionData, settings: &ClinicSettings) {
    let clinic_name = settings.clinic_name.as_deref().unwrap_or(crate::config::APP_NAME);
    pager.text(clinic_name, 16.0, LEFT, &fonts.bold, 7.0);
    for line in [&settings.clinic_address, &settings.clinic_phone]
        .into_iter()
        .flatten()
    {
        pager.text(line, 9.0, LEFT, &fonts.regular, 4.5);
    }
    pager.gap(4.0);

    pager.text(&format!("Prescription {}", data.number), 12.0, LEFT, &fonts.bold, 5.5);
    pager.text(
        &format!("Date: {}   Status: {}", data.date, data.status.as_str()),
        9.0,
        LEFT,
        &fonts.regular,
        6.0,
    );
}

fn patient_block(pager: &mut Pager<'_>, fonts: &Fonts, data: &PrescriptionData) {
    pager.text("PATIENT", 11.0, LEFT, &fonts.bold, 6.0);
    pager.text(&data.patient_name, 10.0, INDENT, &fonts.regular, 4.5);
    for (label, value) in [
        ("Email", &data.patient_email),
        ("Phone", &data.patient_phone),
        ("Address", &data.patient_address),
    ] {
        if let Some(value) = value {
            pager.text(&format!("{label}: {value}"), 9.0, INDENT, &fonts.regular, 4.5);
        }
    }
    if !data.active_conditions.is_empty() {
        pager.wrapped(
            &format!("Conditions: {}", data.active_conditions.join(", ")),
            9.0,
            INDENT,
            &fonts.regular,
            90,
        );
    }
    if !data.active_medications.is_empty() {
        pager.wrapped(
            &format!("Medications: {}", data.active_medications.join(", ")),
            9.0,
            INDENT,
            &fonts.regular,
            90,
        );
    }
    pager.gap(5.0);
}

fn item_section(pager: &mut Pager<'_>, fonts: &Fonts, item: &PrescriptionItem) {
    if item.is_placeholder() {
        pager.text(item.name(), 11.0, LEFT, &fonts.bold, 8.0);
        return;
    }

    pager.text(
        &format!("{}  ({} g)", item.name(), format_grams(item.quantity)),
        11.0,
        LEFT,
        &fonts.bold,
        5.5,
    );

    let Some(formula) = &item.formula else {
        if let Some(herb) = &item.herb {
            if pager.can_print(&herb.chinese_name) {
                pager.text(&herb.chinese_name, 9.0, INDENT, &fonts.regular, 4.5);
            }
            let nature = herb
                .nature_kind()
                .map(|n| n.as_str().to_string())
                .or_else(|| herb.nature.clone());
            if let Some(nature) = nature {
                pager.text(&format!("Nature: {nature}"), 9.0, INDENT, &fonts.regular, 4.5);
            }
            if let Some(range) = &herb.dosage_range {
                pager.text(&format!("Dosage range: {range}"), 9.0, INDENT, &fonts.regular, 4.5);
            }
        }
        pager.gap(4.0);
        return;
    };

    if let Some(chinese) = &formula.chinese_name {
        if pager.can_print(chinese) {
            pager.text(chinese, 9.0, INDENT, &fonts.regular, 4.5);
        }
    }
    if let Some(english) = &formula.english_name {
        pager.text(english, 9.0, INDENT, &fonts.regular, 5.0);
    }

    if !formula.has_composition {
        pager.text("No composition listed", 9.0, INDENT, &fonts.regular, 6.0);
        return;
    }

    pager.row(
        &[
            (INDENT, "Herb".to_string()),
            (COL_PERCENT, "%".to_string()),
            (COL_GRAMS, "Grams".to_string()),
        ],
        9.0,
        &fonts.bold,
        4.5,
    );
    for line in &formula.herbs {
        pager.row(
            &[
                (INDENT, herb_label(&line.name, line.chinese_name.as_deref())),
                (COL_PERCENT, format_grams(line.percentage)),
                (COL_GRAMS, format_grams(line.grams)),
            ],
            9.0,
            &fonts.regular,
            4.5,
        );
    }
    pager.row(
        &[
            (INDENT, "Total".to_string()),
            (COL_GRAMS, format_grams(total_resolved_grams(&formula.herbs))),
        ],
        9.0,
        &fonts.bold,
        4.5,
    );
    pager.gap(4.0);
}

/// Pinyin followed by the Chinese name, when known.
fn herb_label(name: &str, chinese: Option<&str>) -> String {
    match chinese.map(str::trim).filter(|c| !c.is_empty()) {
        Some(chinese) => format!("{name} {chinese}"),
        None => name.to_string(),
    }
}

fn warnings(pager: &mut Pager<'_>, fonts: &Fonts, flags: &InteractionFlags) {
    if flags.is_empty() {
        return;
    }
    pager.text("ADVISORY:", 9.0, INDENT, &fonts.bold, 4.5);
    for (label, names) in [
        ("Contraindicated with", &flags.contraindications),
        ("Use with caution in", &flags.cautions),
        ("May interact with", &flags.medication_interactions),
    ] {
        if !names.is_empty() {
            pager.wrapped(
                &format!("{label}: {}", names.join(", ")),
                8.0,
                INDENT,
                &fonts.regular,
                95,
            );
        }
    }
    pager.gap(4.0);
}

fn closing(pager: &mut Pager<'_>, fonts: &Fonts, data: &PrescriptionData, settings: &ClinicSettings) {
    for (label, value) in [
        ("INSTRUCTIONS", &data.instructions),
        ("DURATION", &data.duration),
        ("NOTES", &data.notes),
    ] {
        if let Some(value) = value {
            pager.text(label, 10.0, LEFT, &fonts.bold, 5.0);
            pager.wrapped(value, 9.0, INDENT, &fonts.regular, 90);
            pager.gap(3.0);
        }
    }

    if let Some(practitioner) = &settings.practitioner_name {
        pager.gap(8.0);
        pager.text(&format!("Practitioner: {practitioner}"), 10.0, LEFT, &fonts.regular, 5.0);
    }
}

/// `12.0` → `"12"`, `12.5` → `"12.5"`.
fn format_grams(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| (c as u32) <= 0xFF)
}

/// Builtin PDF fonts only cover Latin-1.
fn latin1(text: &str) -> String {
    text.chars()
        .filter(|c| (*c as u32) <= 0xFF && !c.is_control())
        .collect()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::flag_view;
    use crate::models::{Formula, HerbComponent, Patient, Prescription};
    use crate::prescription::build_view;

    fn view(components: usize) -> PrescriptionData {
        let formula = Formula {
            pinyin_name: "Gui Pi Tang".into(),
            chinese_name: Some("归脾汤".into()),
            contraindications: Some("Fever".into()),
            composition: (0..components)
                .map(|i| HerbComponent {
                    name: format!("Herb {i}"),
                    percentage: Some(1.0),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let mut rx = Prescription::new(1, chrono::NaiveDateTime::default());
        rx.id = Some(3);
        rx.instructions = Some("Two scoops twice daily in warm water".into());
        rx.active_conditions = vec!["fever".into()];
        let patient = Patient {
            name: "Zhao Lin".into(),
            ..Default::default()
        };
        build_view(&rx, &patient, Some(&formula), None)
    }

    #[test]
    fn renders_pdf_bytes() {
        let data = view(4);
        let flags = flag_view(&data);
        let bytes = render_prescription_pdf(&data, &ClinicSettings::default(), &flags).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_composition_spans_pages() {
        let short = render_prescription_pdf(&view(2), &ClinicSettings::default(), &[]).unwrap();
        let long = render_prescription_pdf(&view(120), &ClinicSettings::default(), &[]).unwrap();
        assert!(long.len() > short.len());
    }

    #[test]
    fn placeholder_prints() {
        let rx = Prescription::new(1, chrono::NaiveDateTime::default());
        let data = build_view(&rx, &Patient::default(), None, None);
        assert!(render_prescription_pdf(&data, &ClinicSettings::default(), &[]).is_ok());
    }

    #[test]
    fn herb_items_print() {
        use crate::models::Herb;
        use crate::prescription::PrescriptionDraft;

        let settings = ClinicSettings::default();
        let mut draft = PrescriptionDraft::new();
        draft.add_herb(
            Herb {
                pinyin_name: "Huang Qi".into(),
                chinese_name: "黄芪".into(),
                nature: Some("Slightly warm".into()),
                dosage_range: Some("9-30g".into()),
                ..Default::default()
            },
            15.0,
        );
        let mut data = view(3);
        data.items = draft.items(&settings);
        assert!(render_prescription_pdf(&data, &settings, &[]).is_ok());
    }

    #[test]
    fn missing_cjk_font_is_font_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ClinicSettings {
            cjk_font_path: Some(dir.path().join("absent.otf").display().to_string()),
            ..Default::default()
        };
        assert!(matches!(
            render_prescription_pdf(&view(2), &settings, &[]),
            Err(PrintError::Font(_))
        ));
    }

    #[test]
    fn herb_label_appends_chinese_name() {
        assert_eq!(herb_label("Huang Qi", Some("黄芪")), "Huang Qi 黄芪");
        assert_eq!(herb_label("Huang Qi", Some("  ")), "Huang Qi");
        assert_eq!(latin1(&herb_label("Huang Qi", Some("黄芪"))).trim_end(), "Huang Qi");
        assert!(is_latin1("Café"));
        assert!(!is_latin1("黄芪"));
    }

    #[test]
    fn latin1_drops_cjk() {
        assert_eq!(latin1("Gui Pi Tang 归脾汤"), "Gui Pi Tang ");
        assert_eq!(latin1("Café"), "Café");
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("one two three four five six", 10);
        assert!(lines.iter().all(|l| l.len() <= 10));
        assert_eq!(lines.join(" "), "one two three four five six");
    }

    #[test]
    fn grams_formatting() {
        assert_eq!(format_grams(12.0), "12");
        assert_eq!(format_grams(12.5), "12.5");
    }
}
