//! # PDF Text-Layer Reader
//!
//! Vector PDFs already carry their text, so they bypass the OCR pipeline and
//! are read directly with `lopdf`.

use std::path::Path;

use lopdf::Document;
use tracing::{debug, info, warn};

/// Reads the embedded text layer of a PDF document
pub trait PdfTextReader: Send + Sync {
    /// Text of every page in page order, each followed by `\n`.
    ///
    /// Returns an empty string when the document cannot be opened.
    fn extract_text(&self, path: &Path) -> String;
}

/// `lopdf`-backed reader
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfReader;

impl LopdfReader {
    pub fn new() -> Self {
        Self
    }
}

impl PdfTextReader for LopdfReader {
    fn extract_text(&self, path: &Path) -> String {
        let document = match Document::load(path) {
            Ok(document) => document,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to open PDF");
                return String::new();
            }
        };

        let pages = document.get_pages();
        debug!(pages = pages.len(), "PDF loaded");

        let mut text = String::new();
        for page_number in pages.keys() {
            match document.extract_text(&[*page_number]) {
                Ok(content) => text.push_str(&content),
                Err(err) => {
                    debug!(page = page_number, error = %err, "Page has no decodable text")
                }
            }
            text.push('\n');
        }

        info!(
            path = %path.display(),
            pages = pages.len(),
            characters = text.chars().count(),
            "Extracted PDF text layer"
        );
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use tempfile::TempDir;

    fn write_pdf(path: &Path, lines: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_every_page_is_newline_terminated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invoice.pdf");
        write_pdf(&path, &["INVOICE 2024-001", "TOTAL DUE 99.00"]);

        let text = LopdfReader::new().extract_text(&path);

        assert!(text.ends_with('\n'));
        assert!(text.matches('\n').count() >= 2);
    }

    #[test]
    fn test_unreadable_document_yields_empty_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();

        assert_eq!(LopdfReader::new().extract_text(&path), "");
    }

    #[test]
    fn test_missing_document_yields_empty_text() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            LopdfReader::new().extract_text(&dir.path().join("absent.pdf")),
            ""
        );
    }
}
