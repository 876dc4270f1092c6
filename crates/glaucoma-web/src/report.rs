//! 患者报告 PDF 生成

use chrono::{DateTime, Utc};
use glaucoma_core::{GlaucomaError, Patient, Result};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Pt,
};

// A4，单位为点
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const TOP_MARGIN: f32 = 50.0;
const BOTTOM_MARGIN: f32 = 50.0;
const WRAP_COLUMNS: usize = 95;

const DISCLAIMER: [&str; 4] = [
    "This report is generated from the Glaucoma XAI decision support system.",
    "Clinical correlation is recommended before making any treatment decisions.",
    "In case of inconsistent or unexpected results, review OCT quality and",
    "consider additional investigations (visual fields, optic nerve exam, etc.).",
];

/// 渲染单个患者的报告
///
/// 使用 PDF 内置 Helvetica（WinAnsi 编码），编码外的字符（如中文）输出为 `?`。
pub fn render_patient_report(patient: &Patient, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Patient Report {}", patient.id),
        pt(PAGE_WIDTH),
        pt(PAGE_HEIGHT),
        "Report",
    );
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(report_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(report_error)?;

    {
        let mut writer = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT - TOP_MARGIN,
        };

        writer.text("Glaucoma XAI - Patient Report", 16.0, 50.0, &bold, 25.0);
        writer.text(
            &format!("Report Date: {}", generated_at.format("%d-%b-%Y %H:%M UTC")),
            10.0,
            50.0,
            &regular,
            30.0,
        );

        writer.heading("Patient Information", &bold);
        let age = patient.age.to_string();
        let fields = [
            ("Name", patient.full_name.as_str()),
            ("Age", age.as_str()),
            ("Gender", or_fallback(Some(patient.gender.as_str()), "N/A")),
            ("MRN", or_fallback(patient.mrn.as_deref(), "N/A")),
        ];
        for (label, value) in fields {
            writer.text(&format!("{}: {}", label, value), 10.0, 60.0, &regular, 15.0);
        }
        writer.gap(10.0);

        writer.heading("Medical History", &bold);
        writer.paragraph(or_fallback(patient.medical_history.as_deref(), "Not provided"), &regular);
        writer.gap(13.0);

        writer.heading("Risk Factors", &bold);
        writer.paragraph(or_fallback(patient.risk_factors.as_deref(), "Not provided"), &regular);
        writer.gap(13.0);

        writer.heading("Comments", &bold);
        for line in DISCLAIMER {
            writer.text(line, 9.0, 60.0, &regular, 12.0);
        }
    }

    doc.save_to_bytes().map_err(report_error)
}

/// 逐行向下书写，空间不足时自动换页
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageWriter<'_> {
    fn text(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef, advance: f32) {
        if self.y < BOTTOM_MARGIN {
            self.new_page();
        }
        self.layer.use_text(winansi_text(text), size, pt(x), pt(self.y), font);
        self.y -= advance;
    }

    fn heading(&mut self, text: &str, font: &IndirectFontRef) {
        self.text(text, 12.0, 50.0, font, 18.0);
    }

    fn paragraph(&mut self, text: &str, font: &IndirectFontRef) {
        for line in wrap_text(text, WRAP_COLUMNS) {
            self.text(&line, 10.0, 60.0, font, 12.0);
        }
    }

    fn gap(&mut self, amount: f32) {
        self.y -= amount;
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(pt(PAGE_WIDTH), pt(PAGE_HEIGHT), "Report");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - TOP_MARGIN;
    }
}

fn pt(value: f32) -> Mm {
    Mm::from(Pt(value))
}

fn or_fallback<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback,
    }
}

/// WinAnsi 中 Latin-1 之外的字符
const WINANSI_EXTRA: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

/// 替换内置字体无法编码的字符，避免被静默丢弃
fn winansi_text(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c,
            _ if WINANSI_EXTRA.contains(c) => c,
            _ => '?',
        })
        .collect()
}

fn report_error<E: std::fmt::Debug>(err: E) -> GlaucomaError {
    GlaucomaError::Report(format!("{:?}", err))
}

/// 按单词折行，保留原有换行
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(history: Option<String>) -> Patient {
        Patient {
            id: 7,
            full_name: "Jane Doe".to_string(),
            age: 61,
            gender: "Female".to_string(),
            medical_history: history,
            risk_factors: None,
            mrn: None,
        }
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render_patient_report(&patient(Some("Hypertension".into())), Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_long_history_spills_over() {
        let history = "Intraocular pressure recorded above threshold. ".repeat(400);
        let bytes = render_patient_report(&patient(Some(history)), Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);

        let lines = wrap_text("first line\nsecond", 80);
        assert_eq!(lines, vec!["first line", "second"]);
    }

    #[test]
    fn test_non_winansi_characters_are_replaced() {
        assert_eq!(winansi_text("张伟"), "??");
        assert_eq!(winansi_text("Zoë Müller – 61"), "Zoë Müller – 61");

        let mut p = patient(None);
        p.full_name = "张伟".to_string();
        let bytes = render_patient_report(&p, Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_or_fallback() {
        assert_eq!(or_fallback(None, "N/A"), "N/A");
        assert_eq!(or_fallback(Some("  "), "N/A"), "N/A");
        assert_eq!(or_fallback(Some("MRN-1"), "N/A"), "MRN-1");
    }
}
