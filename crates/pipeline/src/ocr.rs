//! OCR for scanned PDFs.
//!
//! [`TesseractOcr`] rasterises each page with `pdftoppm` and reads it back
//! with the `tesseract` CLI, so both poppler-utils and tesseract must be on
//! `PATH` (or configured explicitly).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::pdf::format_pages;

/// Rasterisation resolution handed to `pdftoppm`.
pub const DEFAULT_DPI: u32 = 300;

/// Error type for OCR operations.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("{binary} binary not found: {source}")]
    NotFound {
        binary: String,
        source: std::io::Error,
    },

    #[error("{binary} failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        binary: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a scanned PDF into text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Text of every page joined with `--- Page n ---` markers.
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, OcrError>;
}

pub struct TesseractOcr {
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    dpi: u32,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            pdftoppm: PathBuf::from("pdftoppm"),
            tesseract: PathBuf::from("tesseract"),
            dpi: DEFAULT_DPI,
        }
    }
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binaries(pdftoppm: impl Into<PathBuf>, tesseract: impl Into<PathBuf>) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
            tesseract: tesseract.into(),
            ..Self::default()
        }
    }

    async fn rasterize(&self, pdf_path: &Path, out_prefix: &Path) -> Result<(), OcrError> {
        let output = tokio::process::Command::new(&self.pdftoppm)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf_path)
            .arg(out_prefix)
            .output()
            .await
            .map_err(|source| OcrError::NotFound {
                binary: self.pdftoppm.display().to_string(),
                source,
            })?;
        check_status(&self.pdftoppm, &output)
    }

    async fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let output = tokio::process::Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .output()
            .await
            .map_err(|source| OcrError::NotFound {
                binary: self.tesseract.display().to_string(),
                source,
            })?;
        check_status(&self.tesseract, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn check_status(binary: &Path, output: &std::process::Output) -> Result<(), OcrError> {
    if output.status.success() {
        return Ok(());
    }
    Err(OcrError::ExecutionFailed {
        binary: binary.display().to_string(),
        exit_code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Page number of a `pdftoppm` output file such as `page-07.png`. The
/// zero-padding width depends on the page count, so order numerically.
fn page_index(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Rendered page images in `dir`, ordered by page number.
fn page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let index = page_index(entry.file_name().to_str()?)?;
            Some((index, entry.path()))
        })
        .collect();
    pages.sort_by_key(|(index, _)| *index);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, OcrError> {
        let workdir = tempfile::tempdir()?;
        let pdf_path = workdir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, pdf).await?;

        self.rasterize(&pdf_path, &workdir.path().join("page")).await?;

        let images = page_images(workdir.path())?;
        let mut texts = Vec::with_capacity(images.len());
        for image in &images {
            texts.push(self.recognize(image).await?);
        }
        tracing::debug!(pages = images.len(), "OCR completed");
        Ok(format_pages(texts))
    }
}
