//! pdfium-backed [`PdfEngine`].
//!
//! ## Binding
//!
//! The pdfium shared library is located at [`PdfiumEngine::new`] time
//! (or on first use for [`PdfiumEngine::lazy`]):
//! an explicit path (file or directory, usually from `PDFIUM_LIB_PATH`),
//! then the working directory, then the system library. Failure is reported
//! once as [`EngineError::EngineUnavailable`] instead of on the first page.
//!
//! ## Why bind per call?
//!
//! `Pdfium` owns the library's global init/destroy pair and its documents
//! borrow from it. Creating one per blocking call keeps every document's
//! lifetime inside a single `spawn_blocking` closure, which is the only
//! place pdfium is ever touched.

use super::compose::ComposedPage;
use super::{PdfEngine, UnitProgress};
use crate::error::EngineError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// [`PdfEngine`] over the pdfium C++ library.
#[derive(Debug, Clone)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Locate and test-bind the pdfium library.
    pub fn new(library_path: Option<PathBuf>) -> Result<Self, EngineError> {
        let engine = Self { library_path };
        engine.bind()?;
        info!("pdfium bound ({})", engine.describe_source());
        Ok(engine)
    }

    /// Record where to find pdfium without binding now.
    ///
    /// A missing library then surfaces as `EngineUnavailable` from the
    /// first engine call instead of here.
    pub fn lazy(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn describe_source(&self) -> String {
        match &self.library_path {
            Some(p) => p.display().to_string(),
            None => "system library".to_string(),
        }
    }

    fn bind(&self) -> Result<Pdfium, EngineError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(library_file(path)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| EngineError::EngineUnavailable(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

/// Open a document, classifying failures.
fn open<'a>(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, EngineError> {
    // pdfium accepts a header anywhere in the first 1 KiB
    let head = &bytes[..bytes.len().min(1024)];
    if !head.windows(4).any(|w| w == b"%PDF") {
        return Err(EngineError::UnsupportedInputFormat(
            "file does not start with a PDF header".into(),
        ));
    }
    pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            EngineError::CorruptOrEncryptedInput("the document is password protected".into())
        } else {
            EngineError::CorruptOrEncryptedInput(detail)
        }
    })
}

fn internal(context: &str) -> impl Fn(PdfiumError) -> EngineError + '_ {
    move |e| EngineError::EngineInternalFailure(format!("{context}: {e}"))
}

fn paper(width: f32, height: f32) -> PdfPagePaperSize {
    PdfPagePaperSize::Custom(PdfPoints::new(width), PdfPoints::new(height))
}

impl PdfEngine for PdfiumEngine {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, EngineError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        Ok(document.pages().len() as usize)
    }

    fn merge(&self, documents: &[&[u8]], on_document: UnitProgress<'_>) -> Result<Vec<u8>, EngineError> {
        let pdfium = self.bind()?;
        let mut merged = pdfium
            .create_new_pdf()
            .map_err(internal("Failed to create document"))?;
        let total = documents.len();
        for (i, bytes) in documents.iter().enumerate() {
            let source = open(&pdfium, bytes)?;
            merged
                .pages_mut()
                .append(&source)
                .map_err(internal("Failed to copy pages"))?;
            debug!("Merged document {}/{} ({} pages)", i + 1, total, source.pages().len());
            on_document(i + 1, total);
        }
        merged.save_to_bytes().map_err(internal("Failed to save merged PDF"))
    }

    fn extract_range(&self, pdf: &[u8], start: usize, end: usize) -> Result<Vec<u8>, EngineError> {
        let pdfium = self.bind()?;
        let source = open(&pdfium, pdf)?;
        let total = source.pages().len() as usize;
        if start == 0 || start > end || end > total {
            return Err(EngineError::EngineInternalFailure(format!(
                "page range {start}-{end} outside a {total}-page document"
            )));
        }
        let mut out = pdfium
            .create_new_pdf()
            .map_err(internal("Failed to create document"))?;
        out.pages_mut()
            .copy_page_range_from_document(
                &source,
                (start - 1) as PdfPageIndex..=(end - 1) as PdfPageIndex,
                0,
            )
            .map_err(internal("Failed to copy pages"))?;
        out.save_to_bytes().map_err(internal("Failed to save PDF"))
    }

    fn images_to_pdf(
        &self,
        images: &[DynamicImage],
        on_image: UnitProgress<'_>,
    ) -> Result<Vec<u8>, EngineError> {
        let pdfium = self.bind()?;
        let mut document = pdfium
            .create_new_pdf()
            .map_err(internal("Failed to create document"))?;
        let total = images.len();
        for (i, img) in images.iter().enumerate() {
            // one PDF point per pixel
            let (w, h) = (img.width() as f32, img.height() as f32);
            let mut page = document
                .pages_mut()
                .create_page_at_end(paper(w, h))
                .map_err(internal("Failed to add page"))?;
            page.objects_mut()
                .create_image_object(
                    PdfPoints::ZERO,
                    PdfPoints::ZERO,
                    img,
                    Some(PdfPoints::new(w)),
                    Some(PdfPoints::new(h)),
                )
                .map_err(internal("Failed to place image"))?;
            on_image(i + 1, total);
        }
        document.save_to_bytes().map_err(internal("Failed to save PDF"))
    }

    fn rasterize(
        &self,
        pdf: &[u8],
        scale: f32,
        on_page: UnitProgress<'_>,
    ) -> Result<Vec<DynamicImage>, EngineError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        let pages = document.pages();
        let total = pages.len() as usize;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let mut images = Vec::with_capacity(total);
        for (i, page) in pages.iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| EngineError::EngineInternalFailure(format!("Failed to render page {}: {e}", i + 1)))?;
            let image = bitmap.as_image();
            debug!("Rendered page {} → {}x{} px", i + 1, image.width(), image.height());
            images.push(image);
            on_page(i + 1, total);
        }
        Ok(images)
    }

    fn extract_text(&self, pdf: &[u8]) -> Result<Vec<String>, EngineError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        let mut out = Vec::new();
        for (i, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| EngineError::EngineInternalFailure(format!("Failed to read text of page {}: {e}", i + 1)))?;
            out.push(text.all());
        }
        Ok(out)
    }

    fn compose_text(&self, pages: &[ComposedPage]) -> Result<Vec<u8>, EngineError> {
        let pdfium = self.bind()?;
        let mut document = pdfium
            .create_new_pdf()
            .map_err(internal("Failed to create document"))?;
        let font = document.fonts_mut().helvetica();
        for composed in pages {
            let mut page = document
                .pages_mut()
                .create_page_at_end(paper(composed.width, composed.height))
                .map_err(internal("Failed to add page"))?;
            for line in &composed.lines {
                page.objects_mut()
                    .create_text_object(
                        PdfPoints::new(line.x),
                        PdfPoints::new(line.baseline),
                        &line.text,
                        font,
                        PdfPoints::new(line.font_size),
                    )
                    .map_err(internal("Failed to draw text"))?;
            }
        }
        debug!("Composed {} page(s)", pages.len());
        document.save_to_bytes().map_err(internal("Failed to save PDF"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_resolves_to_platform_library_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = library_file(dir.path());
        assert_eq!(file.parent(), Some(dir.path()));
        assert!(file.to_string_lossy().contains("pdfium"));
    }

    #[test]
    fn explicit_file_is_used_verbatim() {
        let p = PathBuf::from("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(library_file(&p), p);
    }

    #[test]
    fn lazy_engine_reports_missing_library_per_call() {
        let engine = PdfiumEngine::lazy(Some(PathBuf::from("/nonexistent/libpdfium.so")));
        let err = engine.page_count(b"%PDF-1.7").unwrap_err();
        assert!(matches!(err, EngineError::EngineUnavailable(_)));
    }

    #[test]
    fn missing_library_is_engine_unavailable() {
        let err = PdfiumEngine::new(Some(PathBuf::from("/nonexistent/libpdfium.so"))).unwrap_err();
        assert!(matches!(err, EngineError::EngineUnavailable(_)));
    }
}
