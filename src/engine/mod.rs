//! External engine adapters.
//!
//! Each submodule wraps one third-party capability behind a small typed
//! contract that returns [`EngineError`] on failure:
//!
//! ```text
//! pdfium   ──▶ PdfEngine (merge, split, image→PDF, rasterise, text, compose)
//! docx     ──▶ DOCX paragraph reader / minimal DOCX writer   (zip + quick-xml)
//! qr       ──▶ QR matrix → fixed-size PNG                     (qrcode + image)
//! compose  ──▶ text layout of a virtual A4 column into page tiles
//! encode   ──▶ image decode / JPEG / PNG / base64
//! ```
//!
//! All engine calls are blocking; the pipeline runs them inside
//! `tokio::task::spawn_blocking`.
//!
//! [`PdfEngine`] is a trait so tests can substitute an in-memory fake.

pub mod compose;
pub mod docx;
pub mod encode;
pub mod pdfium;
pub mod qr;

use crate::error::EngineError;
use compose::ComposedPage;
use image::DynamicImage;

pub use self::pdfium::PdfiumEngine;

/// Progress hook for multi-unit engine work: `(done, total)`, 1-indexed.
pub type UnitProgress<'a> = &'a mut dyn FnMut(usize, usize);

/// PDF assembly, rasterisation and text extraction.
///
/// Implementations must be `Send + Sync`; calls happen on the blocking pool.
/// Page numbers in this API are 1-based and ranges inclusive.
pub trait PdfEngine: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf: &[u8]) -> Result<usize, EngineError>;

    /// Concatenate every page of every document, in argument order.
    fn merge(&self, documents: &[&[u8]], on_document: UnitProgress<'_>) -> Result<Vec<u8>, EngineError>;

    /// Copy pages `start..=end` into a new document.
    fn extract_range(&self, pdf: &[u8], start: usize, end: usize) -> Result<Vec<u8>, EngineError>;

    /// One page per image, sized to the image's pixel dimensions.
    fn images_to_pdf(
        &self,
        images: &[DynamicImage],
        on_image: UnitProgress<'_>,
    ) -> Result<Vec<u8>, EngineError>;

    /// Render every page at `scale` × its natural size, in page order.
    fn rasterize(
        &self,
        pdf: &[u8],
        scale: f32,
        on_page: UnitProgress<'_>,
    ) -> Result<Vec<DynamicImage>, EngineError>;

    /// Plain text of each page, in page order.
    fn extract_text(&self, pdf: &[u8]) -> Result<Vec<String>, EngineError>;

    /// Draw pre-laid-out text pages into a new document.
    fn compose_text(&self, pages: &[ComposedPage]) -> Result<Vec<u8>, EngineError>;
}

/// Join per-page text: items of a page with a space, pages with a blank line.
pub fn join_page_text(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_text_joined_with_blank_line() {
        let pages = vec!["Hello\nworld".to_string(), "  second   page ".to_string()];
        assert_eq!(join_page_text(&pages), "Hello world\n\nsecond page");
    }
}
