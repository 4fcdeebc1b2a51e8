//! PDF text extraction via pdfium.
//!
//! pdfium is not safe to drive from async worker threads, so the actual
//! parsing runs inside `spawn_blocking`.

use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ChatError, Result};

/// True when the path declares itself a PDF (by extension, case-insensitive).
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Concatenate page texts in order, each prefixed with its 1-based number.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for (idx, page) in pages.into_iter().enumerate() {
        text.push_str(&format!("\n\nPage {}:\n{}", idx + 1, page.as_ref()));
    }
    text
}

#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    library_dir: Option<PathBuf>,
}

impl PdfExtractor {
    /// `library_dir` points at a directory holding the pdfium shared library;
    /// `None` uses the system library search path.
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    pub async fn extract_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        self.extract(bytes).await
    }

    pub async fn extract(&self, bytes: Vec<u8>) -> Result<String> {
        let library_dir = self.library_dir.clone();

        let text = tokio::task::spawn_blocking(move || extract_blocking(library_dir.as_deref(), bytes))
            .await
            .map_err(|e| ChatError::PdfParse(format!("extraction task panicked: {}", e)))??;

        debug!("Parsed PDF content:\n{}", text);
        Ok(text)
    }
}

fn bind(library_dir: Option<&Path>) -> Result<Pdfium> {
    let bindings = match library_dir {
        Some(dir) => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ChatError::PdfLibrary(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn extract_blocking(library_dir: Option<&Path>, bytes: Vec<u8>) -> Result<String> {
    let pdfium = bind(library_dir)?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| ChatError::PdfParse(format!("{:?}", e)))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| ChatError::PdfParse(format!("page {}: {:?}", idx + 1, e)))?;
        texts.push(text.all());
    }

    Ok(join_pages(texts))
}
