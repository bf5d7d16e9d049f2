//! OCR fallback for pages without a text layer.
//!
//! Pages are rendered with `pdftoppm` (poppler-utils) and read with the
//! `tesseract` CLI. Whether both tools exist is probed once, at startup,
//! with [`OcrCapability::detect`].

use std::fmt;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;

/// Errors from OCR of a single page.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to run {tool}: {reason}")]
    ToolFailed { tool: &'static str, reason: String },

    #[error("Renderer produced no image for page {0}")]
    NoImage(u32),
}

/// Recognizes the text of one PDF page.
pub trait OcrEngine: Send + Sync {
    /// OCR text of `page` (1-based) of the PDF in `pdf_bytes`.
    fn recognize(&self, pdf_bytes: &[u8], page: u32) -> Result<String, OcrError>;

    fn name(&self) -> &str;
}

/// `pdftoppm` + `tesseract` engine.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// Render resolution
    pub dpi: u32,

    /// Tesseract language code
    pub lang: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            dpi: 200,
            lang: "eng".to_string(),
        }
    }
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Whether `pdftoppm` and `tesseract` can be executed.
    pub fn tools_available() -> bool {
        let pdftoppm = Command::new("pdftoppm").arg("-v").output().is_ok();
        let tesseract = Command::new("tesseract").arg("--version").output().is_ok();

        if !pdftoppm {
            tracing::debug!("pdftoppm not found, install poppler-utils for OCR support");
        }
        if !tesseract {
            tracing::debug!("tesseract not found, install tesseract-ocr for OCR support");
        }

        pdftoppm && tesseract
    }

    fn render_page(&self, pdf: &Path, page: u32, dir: &Path) -> Result<std::path::PathBuf, OcrError> {
        let prefix = dir.join("page");
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| OcrError::ToolFailed {
                tool: "pdftoppm",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "pdftoppm",
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let image = prefix.with_extension("png");
        if image.exists() {
            Ok(image)
        } else {
            Err(OcrError::NoImage(page))
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, pdf_bytes: &[u8], page: u32) -> Result<String, OcrError> {
        let dir = tempfile::tempdir()?;
        let pdf = dir.path().join("document.pdf");
        std::fs::write(&pdf, pdf_bytes)?;

        let image = self.render_page(&pdf, page, dir.path())?;

        let output = Command::new("tesseract")
            .arg(&image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .map_err(|e| OcrError::ToolFailed {
                tool: "tesseract",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "tesseract",
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Whether OCR can be used in this process.
#[derive(Clone, Default)]
pub enum OcrCapability {
    Available(Arc<dyn OcrEngine>),
    #[default]
    Unavailable,
}

impl OcrCapability {
    /// Probe for the external OCR tools.
    pub fn detect() -> Self {
        if TesseractOcr::tools_available() {
            tracing::debug!("OCR available via tesseract");
            OcrCapability::Available(Arc::new(TesseractOcr::default()))
        } else {
            tracing::info!("OCR unavailable, image-only pages will stay empty");
            OcrCapability::Unavailable
        }
    }

    pub fn engine(&self) -> Option<&Arc<dyn OcrEngine>> {
        match self {
            OcrCapability::Available(engine) => Some(engine),
            OcrCapability::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine().is_some()
    }
}

impl fmt::Debug for OcrCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrCapability::Available(engine) => write!(f, "Available({})", engine.name()),
            OcrCapability::Unavailable => write!(f, "Unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOcr;

    impl OcrEngine for FixedOcr {
        fn recognize(&self, _pdf_bytes: &[u8], page: u32) -> Result<String, OcrError> {
            Ok(format!("page {}", page))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_capability_accessors() {
        let available = OcrCapability::Available(Arc::new(FixedOcr));
        assert!(available.is_available());
        assert_eq!(format!("{:?}", available), "Available(fixed)");
        assert_eq!(
            available.engine().unwrap().recognize(b"", 3).unwrap(),
            "page 3"
        );

        let unavailable = OcrCapability::default();
        assert!(!unavailable.is_available());
        assert!(unavailable.engine().is_none());
    }

    #[test]
    fn test_tesseract_defaults() {
        let ocr = TesseractOcr::new().with_dpi(300).with_lang("deu");
        assert_eq!(ocr.dpi, 300);
        assert_eq!(ocr.lang, "deu");
        assert_eq!(TesseractOcr::default().dpi, 200);
    }
}
