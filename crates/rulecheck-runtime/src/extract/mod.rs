//! PDF text extraction into a [`PageStore`].
//!
//! Extraction never fails: an unreadable document yields an empty store
//! and an unreadable page yields empty text, both logged at `warn`. Pages
//! whose text layer is empty are sent to OCR when an engine is available.

mod ocr;

pub use ocr::{OcrCapability, OcrEngine, OcrError, TesseractOcr};

use lopdf::Document;
use rulecheck_core::{normalize_page_text, PageStore};
use std::path::Path;

/// Turns document bytes into pages of text.
pub trait PageExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> PageStore;
}

/// Text-layer extraction with `lopdf`, plus optional OCR of blank pages.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    ocr: OcrCapability,
}

impl PdfExtractor {
    /// Extractor without OCR.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr(mut self, ocr: OcrCapability) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn ocr(&self) -> &OcrCapability {
        &self.ocr
    }

    fn text_layer(bytes: &[u8]) -> Option<Vec<String>> {
        let doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open PDF");
                return None;
            }
        };

        let texts = doc
            .get_pages()
            .into_keys()
            .map(|page| {
                doc.extract_text(&[page]).unwrap_or_else(|e| {
                    tracing::warn!(page, error = %e, "Failed to extract page text");
                    String::new()
                })
            })
            .collect();
        Some(texts)
    }

    /// Normalize each page and OCR the ones left blank.
    fn assemble(&self, texts: Vec<String>, bytes: &[u8]) -> PageStore {
        let texts = texts.into_iter().enumerate().map(|(index, raw)| {
            let text = normalize_page_text(&raw);
            if !text.is_empty() {
                return text;
            }

            let Some(engine) = self.ocr.engine() else {
                return text;
            };

            let page = index as u32 + 1;
            match engine.recognize(bytes, page) {
                Ok(recognized) => {
                    tracing::debug!(page, engine = engine.name(), "Page text recovered by OCR");
                    normalize_page_text(&recognized)
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "OCR failed, page left empty");
                    String::new()
                }
            }
        });

        PageStore::from_texts(texts.collect::<Vec<_>>())
    }
}

impl PageExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> PageStore {
        let Some(texts) = Self::text_layer(bytes) else {
            return PageStore::default();
        };

        let store = self.assemble(texts, bytes);
        let blank = store.blank_pages();
        if !blank.is_empty() {
            tracing::info!(
                pages = store.len(),
                blank = ?blank,
                ocr = self.ocr.is_available(),
                "Some pages have no extractable text"
            );
        }
        store
    }
}

/// Read and extract a PDF from disk; a read error yields an empty store.
pub fn extract_file(extractor: &dyn PageExtractor, path: impl AsRef<Path>) -> PageStore {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => extractor.extract(&bytes),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read document");
            PageStore::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingOcr {
        calls: Mutex<Vec<u32>>,
        fail: bool,
    }

    impl OcrEngine for RecordingOcr {
        fn recognize(&self, _pdf_bytes: &[u8], page: u32) -> Result<String, OcrError> {
            self.calls.lock().push(page);
            if self.fail {
                Err(OcrError::NoImage(page))
            } else {
                Ok(format!("  Scanned page {}  \n\n  signed  ", page))
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn blank_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..page_count)
            .map(|_| {
                let page_id = doc.add_object(dictionary! {
                    "Type" => Object::Name(b"Page".to_vec()),
                    "Parent" => Object::Reference(pages_id),
                    "MediaBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(595),
                        Object::Integer(842),
                    ],
                });
                Object::Reference(page_id)
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => Object::Name(b"Pages".to_vec()),
                "Kids" => kids,
                "Count" => Object::Integer(page_count as i64),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => Object::Name(b"Catalog".to_vec()),
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_invalid_bytes_yield_empty_store() {
        let store = PdfExtractor::new().extract(b"definitely not a pdf");
        assert!(store.is_empty());
    }

    #[test]
    fn test_blank_pages_without_ocr_stay_empty() {
        let store = PdfExtractor::new().extract(&blank_pdf(2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.blank_pages(), vec![1, 2]);
    }

    #[test]
    fn test_blank_pages_are_ocred_and_normalized() {
        let ocr = Arc::new(RecordingOcr::default());
        let extractor =
            PdfExtractor::new().with_ocr(OcrCapability::Available(ocr.clone()));

        let store = extractor.extract(&blank_pdf(2));
        assert_eq!(*ocr.calls.lock(), vec![1, 2]);
        assert_eq!(store.get(2).unwrap().text, "Scanned page 2\nsigned");
        assert!(store.blank_pages().is_empty());
    }

    #[test]
    fn test_assemble_only_ocrs_blank_pages() {
        let ocr = Arc::new(RecordingOcr::default());
        let extractor =
            PdfExtractor::new().with_ocr(OcrCapability::Available(ocr.clone()));

        let store = extractor.assemble(
            vec!["  Text layer \n".to_string(), "   ".to_string(), "More".to_string()],
            b"",
        );
        assert_eq!(*ocr.calls.lock(), vec![2]);
        assert_eq!(store.get(1).unwrap().text, "Text layer");
        assert_eq!(store.get(3).unwrap().text, "More");
    }

    #[test]
    fn test_ocr_failure_leaves_page_empty() {
        let ocr = Arc::new(RecordingOcr {
            fail: true,
            ..Default::default()
        });
        let extractor = PdfExtractor::new().with_ocr(OcrCapability::Available(ocr));

        let store = extractor.assemble(vec![String::new(), "Body".to_string()], b"");
        assert_eq!(store.len(), 2);
        assert_eq!(store.blank_pages(), vec![1]);
    }

    #[test]
    fn test_extract_file_missing_path() {
        let store = extract_file(&PdfExtractor::new(), "/nonexistent/rulecheck/input.pdf");
        assert!(store.is_empty());
    }

    #[test]
    fn test_extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, blank_pdf(3)).unwrap();

        assert_eq!(extract_file(&PdfExtractor::new(), &path).len(), 3);
    }
}
