//! OCR fallback for PDFs without a text layer.
//!
//! `TesseractOcr` shells out to `pdftoppm` (poppler-utils) to rasterize pages and to
//! `tesseract` to recognize them, one page at a time in page order.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

use super::ExtractionError;

/// Recognizes the text of every page of a PDF, concatenated in page order.
pub trait OcrEngine: Send + Sync {
    fn recognize_pdf(&self, document: &[u8]) -> Result<String, ExtractionError>;
}

pub struct TesseractOcr {
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            dpi: 300,
        }
    }

    /// True when both external tools are on the PATH.
    pub fn is_available(&self) -> bool {
        check_binary("tesseract") && check_binary("pdftoppm")
    }

    /// Renders every page to `<out_dir>/page-N.png` and returns the images in page order.
    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let dpi = self.dpi.to_string();
        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi])
            .arg(pdf_path)
            .arg(out_dir.join("page"))
            .status();

        match status {
            Ok(s) if s.success() => {}
            Ok(_) => {
                return Err(ExtractionError::OcrFailed(
                    "pdftoppm failed to convert PDF pages".to_string(),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::ToolNotFound(
                    "pdftoppm (install poppler-utils)".to_string(),
                ))
            }
            Err(e) => return Err(ExtractionError::Io(e)),
        }

        let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter_map(|path| {
                let number = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(page_number_from_file_name)?;
                Some((number, path))
            })
            .collect();
        pages.sort_by_key(|(number, _)| *number);

        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::OcrFailed(format!("tesseract failed: {stderr}")))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                ExtractionError::ToolNotFound("tesseract (install tesseract-ocr)".to_string()),
            ),
            Err(e) => Err(ExtractionError::Io(e)),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize_pdf(&self, document: &[u8]) -> Result<String, ExtractionError> {
        let temp_dir = TempDir::new()?;
        let pdf_path = temp_dir.path().join("document.pdf");
        std::fs::write(&pdf_path, document)?;

        let images = self.rasterize(&pdf_path, temp_dir.path())?;
        if images.is_empty() {
            return Err(ExtractionError::OcrFailed(
                "pdftoppm produced no page images".to_string(),
            ));
        }

        let mut text = String::new();
        for (index, image) in images.iter().enumerate() {
            let page_text = self.run_tesseract(image)?;
            debug!("OCR page {}: {} chars", index + 1, page_text.len());
            text.push_str(&page_text);
        }
        Ok(text)
    }
}

/// pdftoppm names files `page-1.png`, `page-01.png`, `page-001.png` depending on page count.
fn page_number_from_file_name(name: &str) -> Option<u32> {
    name.strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
