//! Production text extraction backend
//!
//! PDF text is extracted in-process with `pdf-extract` (page count via
//! `lopdf`). The OCR paths shell out to poppler's `pdftoppm` and `tesseract`,
//! working through a temp directory that is removed afterwards.

use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::ExtractionBackend;

/// Text extraction engine backed by local tooling
pub struct TextEngine {
    /// Hard cap on in-process PDF extraction, which can hang on broken fonts
    pdf_timeout: Duration,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self {
            pdf_timeout: Duration::from_secs(120),
        }
    }
}

impl TextEngine {
    /// Check if tesseract OCR is available
    pub fn has_tesseract() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Check if pdftoppm is available (for PDF rasterization)
    pub fn has_pdftoppm() -> bool {
        Command::new("pdftoppm")
            .arg("-v")
            .output()
            .map(|_| true) // pdftoppm -v prints to stderr, existence is enough
            .unwrap_or(false)
    }
}

#[async_trait]
impl ExtractionBackend for TextEngine {
    async fn extract_pdf(&self, data: &[u8]) -> Result<(String, Option<u32>)> {
        let data = data.to_vec();
        let task = tokio::task::spawn_blocking(move || -> Result<(String, Option<u32>)> {
            let pages = lopdf::Document::load_mem(&data)
                .ok()
                .map(|doc| doc.get_pages().len() as u32);

            let text = pdf_extract::extract_text_from_mem(&data)
                .map_err(|e| Error::Extraction(format!("pdf text extraction failed: {}", e)))?;

            Ok((text, pages))
        });

        match tokio::time::timeout(self.pdf_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(Error::Extraction(format!(
                "pdf extraction aborted: {}",
                join_err
            ))),
            Err(_) => Err(Error::Extraction(format!(
                "pdf extraction timed out after {}s",
                self.pdf_timeout.as_secs()
            ))),
        }
    }

    async fn ocr_pdf_pages(&self, data: &[u8]) -> Result<String> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || ocr_pdf_pages_sync(&data))
            .await
            .map_err(|e| Error::Extraction(format!("pdf OCR aborted: {}", e)))?
    }

    async fn extract_image(&self, data: &[u8]) -> Result<String> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || ocr_image_sync(&data))
            .await
            .map_err(|e| Error::Extraction(format!("image OCR aborted: {}", e)))?
    }
}

/// Rasterize PDF pages at 150 DPI and OCR each one
fn ocr_pdf_pages_sync(data: &[u8]) -> Result<String> {
    if !TextEngine::has_pdftoppm() || !TextEngine::has_tesseract() {
        return Err(Error::Extraction(
            "PDF OCR requires pdftoppm and tesseract (apt install poppler-utils tesseract-ocr)"
                .to_string(),
        ));
    }

    let temp_dir = scratch_dir("ocr")?;
    let result = (|| {
        let pdf_path = temp_dir.join("input.pdf");
        fs::write(&pdf_path, data)
            .map_err(|e| Error::Extraction(format!("failed to write temp PDF: {}", e)))?;

        let rasterized = Command::new("pdftoppm")
            .args([
                "-png",
                "-r",
                "150",
                pdf_path.to_str().unwrap_or_default(),
                temp_dir.join("page").to_str().unwrap_or_default(),
            ])
            .output()
            .map_err(|e| Error::Extraction(format!("pdftoppm failed: {}", e)))?;

        if !rasterized.status.success() {
            let stderr = String::from_utf8_lossy(&rasterized.stderr);
            return Err(Error::Extraction(format!("pdftoppm error: {}", stderr)));
        }

        let mut page_images: Vec<PathBuf> = fs::read_dir(&temp_dir)
            .map_err(|e| Error::Extraction(format!("failed to read temp dir: {}", e)))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        page_images.sort();

        let mut texts = Vec::with_capacity(page_images.len());
        for image_path in &page_images {
            let ocr = Command::new("tesseract")
                .args([
                    image_path.to_str().unwrap_or_default(),
                    "stdout",
                    "-l",
                    "eng",
                ])
                .output()
                .map_err(|e| Error::Extraction(format!("tesseract failed: {}", e)))?;

            if ocr.status.success() {
                texts.push(String::from_utf8_lossy(&ocr.stdout).into_owned());
            }
        }

        Ok(texts.join("\n"))
    })();

    fs::remove_dir_all(&temp_dir).ok();
    result
}

/// OCR a single raster image with tesseract
fn ocr_image_sync(data: &[u8]) -> Result<String> {
    if !TextEngine::has_tesseract() {
        return Err(Error::Extraction(
            "image OCR requires tesseract (apt install tesseract-ocr)".to_string(),
        ));
    }

    let temp_dir = scratch_dir("img")?;
    let result = (|| {
        let image_path = temp_dir.join("input.png");
        fs::write(&image_path, data)
            .map_err(|e| Error::Extraction(format!("failed to write temp image: {}", e)))?;

        let ocr = Command::new("tesseract")
            .args([
                image_path.to_str().unwrap_or_default(),
                "stdout",
                "-l",
                "eng",
            ])
            .output()
            .map_err(|e| Error::Extraction(format!("tesseract failed: {}", e)))?;

        if !ocr.status.success() {
            let stderr = String::from_utf8_lossy(&ocr.stderr);
            return Err(Error::Extraction(format!("tesseract error: {}", stderr)));
        }

        Ok(String::from_utf8_lossy(&ocr.stdout).into_owned())
    })();

    fs::remove_dir_all(&temp_dir).ok();
    result
}

fn scratch_dir(label: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("docpipe-{}-{}", label, Uuid::new_v4()));
    fs::create_dir_all(&dir)
        .map_err(|e| Error::Extraction(format!("failed to create temp dir: {}", e)))?;
    Ok(dir)
}
