//! Report Assembler: renders an analysis page and prepends it to the
//! uploaded résumé.
//!
//! The page is drawn with the built-in Helvetica faces (no font embedding)
//! and inserted as the first kid of the résumé's root page tree, so the
//! original pages and their resources are left untouched.

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::info;

use crate::errors::AppError;

pub mod layout;

use layout::{encode_win_ansi, wrap_text};

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: f32 = 54.0;
const BODY_SIZE: f32 = 10.0;
const BODY_LEADING: f32 = 13.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH as f32 - 2.0 * MARGIN;
const JD_EXCERPT_CHARS: usize = 900;

/// Everything the analysis page shows.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub similarity: f64,
    pub feedback: String,
    pub job_description: String,
    pub generated_at: DateTime<Utc>,
}

/// `resume_analysis_YYYYMMDD_HHMMSS.pdf`, UTC.
pub fn report_filename(generated_at: DateTime<Utc>) -> String {
    generated_at
        .format("resume_analysis_%Y%m%d_%H%M%S.pdf")
        .to_string()
}

/// Builds the combined PDF: analysis page first, then every résumé page.
pub fn assemble(report: &AnalysisReport, resume_pdf: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::load_mem(resume_pdf)
        .map_err(|e| AppError::Extraction(format!("résumé PDF could not be read: {e}")))?;

    let pages_id = root_pages_id(&doc)
        .map_err(|e| AppError::Extraction(format!("résumé PDF has no page tree: {e}")))?;
    let resume_pages = doc.get_pages().len();

    let content = render_content(report);
    let encoded = content
        .encode()
        .map_err(|e| AppError::Report(format!("content stream encoding failed: {e}")))?;

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        },
    });

    prepend_page(&mut doc, pages_id, page_id)
        .map_err(|e| AppError::Report(format!("could not insert analysis page: {e}")))?;

    let mut out = Vec::with_capacity(resume_pdf.len() + 4096);
    doc.save_to(&mut out)
        .map_err(|e| AppError::Report(format!("could not serialize PDF: {e}")))?;

    info!(resume_pages, bytes = out.len(), "analysis report assembled");
    Ok(out)
}

fn root_pages_id(doc: &Document) -> Result<ObjectId, lopdf::Error> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    doc.get_dictionary(catalog_id)?.get(b"Pages")?.as_reference()
}

fn prepend_page(doc: &mut Document, pages_id: ObjectId, page_id: ObjectId) -> Result<(), lopdf::Error> {
    let pages = doc.get_object_mut(pages_id)?.as_dict_mut()?;
    let kids = pages.get_mut(b"Kids")?.as_array_mut()?;
    kids.insert(0, Object::Reference(page_id));
    let kid_count = kids.len() as i64;

    // Count covers every leaf below this node, not just direct kids.
    let count = pages
        .get(b"Count")
        .and_then(Object::as_i64)
        .map(|c| c + 1)
        .unwrap_or(kid_count);
    pages.set("Count", count);
    Ok(())
}

/// Cursor-based text writer for one page.
struct PageWriter {
    ops: Vec<Operation>,
    y: f32,
    truncated: bool,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            y: PAGE_HEIGHT as f32 - MARGIN,
            truncated: false,
        }
    }

    fn has_room(&self, leading: f32) -> bool {
        self.y - leading >= MARGIN + BODY_LEADING
    }

    fn line(&mut self, font: &str, size: f32, leading: f32, text: &str) {
        if self.truncated {
            return;
        }
        if !self.has_room(leading) {
            self.truncated = true;
            self.emit("F1", BODY_SIZE, "... (truncated)");
            return;
        }
        self.y -= leading;
        self.emit(font, size, text);
    }

    fn emit(&mut self, font: &str, size: f32, text: &str) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("Td", vec![MARGIN.into(), self.y.into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn gap(&mut self, points: f32) {
        self.y -= points;
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, TEXT_WIDTH / BODY_SIZE) {
            self.line("F1", BODY_SIZE, BODY_LEADING, &line);
        }
    }
}

fn render_content(report: &AnalysisReport) -> Content {
    let mut page = PageWriter::new();

    page.line("F2", 18.0, 18.0, "Resume Analysis Report");
    page.line(
        "F1",
        9.0,
        14.0,
        &format!("Generated {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
    );
    page.gap(10.0);
    page.line(
        "F2",
        14.0,
        18.0,
        &format!("Similarity score: {:.2}%", report.similarity),
    );
    page.gap(10.0);

    page.line("F2", 12.0, 16.0, "Job description");
    let excerpt: String = report.job_description.chars().take(JD_EXCERPT_CHARS).collect();
    let ellipsis = if report.job_description.chars().count() > JD_EXCERPT_CHARS {
        "..."
    } else {
        ""
    };
    page.paragraph(&format!("{}{ellipsis}", excerpt.trim_end()));
    page.gap(10.0);

    page.line("F2", 12.0, 16.0, "Feedback");
    if report.feedback.trim().is_empty() {
        page.paragraph("No feedback was provided.");
    } else {
        page.paragraph(&report.feedback);
    }

    Content {
        operations: page.ops,
    }
}

#[cfg(test)]
/// Minimal résumé with `pages` blank pages.
pub(crate) fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

#[cfg(test)]
/// One-page PDF whose content stream shows each of `lines` with Helvetica.
pub(crate) fn sample_text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), (720 - 16 * i as i64).into()]),
            Operation::new("Tj", vec![Object::string_literal(line.as_bytes().to_vec())]),
            Operation::new("ET", vec![]),
        ]);
    }
    let content = Content { operations }.encode().unwrap();
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(feedback: &str) -> AnalysisReport {
        AnalysisReport {
            similarity: 82.5,
            feedback: feedback.to_string(),
            job_description: "Looking for a Python backend engineer with FastAPI experience"
                .to_string(),
            generated_at: Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 3).unwrap(),
        }
    }

    #[test]
    fn test_report_filename_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 3).unwrap();
        assert_eq!(report_filename(at), "resume_analysis_20261017_090503.pdf");
    }

    #[test]
    fn test_assemble_prepends_analysis_page() {
        let merged = assemble(&report("Quantify your API work."), &sample_pdf(2)).unwrap();
        let doc = Document::load_mem(&merged).unwrap();

        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let first = pages[&1];
        let content = doc.get_page_content(first).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("Similarity score: 82.50%"));
        assert!(text.contains("Quantify your API work."));
    }

    #[test]
    fn test_assemble_updates_page_count() {
        let merged = assemble(&report("ok"), &sample_pdf(1)).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        let pages_id = root_pages_id(&doc).unwrap();
        let count = doc
            .get_dictionary(pages_id)
            .unwrap()
            .get(b"Count")
            .unwrap()
            .as_i64()
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_assemble_rejects_garbage() {
        let err = assemble(&report("ok"), b"not a pdf").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_long_feedback_is_truncated_on_one_page() {
        let long = "Add measurable outcomes to every bullet. ".repeat(400);
        let content = render_content(&report(&long));
        let lines = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .count();
        // One page of 10pt text cannot hold more than ~55 lines.
        assert!(lines < 60);
        let last_tj = content
            .operations
            .iter()
            .rev()
            .find(|op| op.operator == "Tj")
            .unwrap();
        assert!(matches!(&last_tj.operands[0], Object::String(s, _) if s == b"... (truncated)"));
    }

    #[test]
    fn test_empty_feedback_placeholder() {
        let content = render_content(&report("   "));
        let has_placeholder = content.operations.iter().any(|op| {
            matches!(op.operands.first(), Some(Object::String(s, _)) if s == b"No feedback was provided.")
        });
        assert!(has_placeholder);
    }
}
