//! Static tool catalog and route resolution.
//!
//! Every tool is one row of a fixed table: display metadata plus the
//! per-tool configuration the pipeline needs (what it accepts, how many
//! files, how progress is reported). Nothing here is user-mutable.

use crate::intake::{AcceptSpec, IntakeMode};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Catalog grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ToolCategory {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "DOCX")]
    Docx,
    Image,
    #[serde(rename = "AI")]
    Ai,
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolCategory::Pdf => "PDF",
            ToolCategory::Docx => "DOCX",
            ToolCategory::Image => "Image",
            ToolCategory::Ai => "AI",
        })
    }
}

/// Stable identifier of a tool; its string form is the route slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolId {
    Summarize,
    Translate,
    CorrectText,
    RemoveBackground,
    EditImage,
    ImageToPdf,
    QrGenerator,
    MergePdf,
    SplitPdf,
    PdfToJpg,
    PdfToWord,
    PdfToExcel,
    CompressPdf,
    WordToPdf,
    DocxToText,
    ExcelToPdf,
}

impl ToolId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::Summarize => "summarize",
            ToolId::Translate => "translate",
            ToolId::CorrectText => "correct-text",
            ToolId::RemoveBackground => "remove-background",
            ToolId::EditImage => "edit-image",
            ToolId::ImageToPdf => "image-to-pdf",
            ToolId::QrGenerator => "qr-generator",
            ToolId::MergePdf => "merge-pdf",
            ToolId::SplitPdf => "split-pdf",
            ToolId::PdfToJpg => "pdf-to-jpg",
            ToolId::PdfToWord => "pdf-to-word",
            ToolId::PdfToExcel => "pdf-to-excel",
            ToolId::CompressPdf => "compress-pdf",
            ToolId::WordToPdf => "word-to-pdf",
            ToolId::DocxToText => "docx-to-text",
            ToolId::ExcelToPdf => "excel-to-pdf",
        }
    }

    /// The catalog row for this tool.
    pub fn descriptor(&self) -> &'static ToolDescriptor {
        // every ToolId has exactly one row; checked by `every_id_has_one_row`
        TOOLS
            .iter()
            .find(|t| t.id == *self)
            .unwrap_or(&TOOLS[0])
    }

    /// True if running the tool needs the pdfium library.
    pub fn needs_pdf_engine(&self) -> bool {
        matches!(
            self,
            ToolId::MergePdf
                | ToolId::SplitPdf
                | ToolId::PdfToJpg
                | ToolId::PdfToWord
                | ToolId::PdfToExcel
                | ToolId::WordToPdf
                | ToolId::ImageToPdf
        )
    }

    /// True if running the tool calls the AI gateway.
    pub fn uses_ai(&self) -> bool {
        matches!(
            self,
            ToolId::Summarize
                | ToolId::Translate
                | ToolId::CorrectText
                | ToolId::RemoveBackground
                | ToolId::EditImage
                | ToolId::PdfToExcel
        )
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TOOLS
            .iter()
            .map(|t| t.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}

/// How a tool reports progress while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// One update per unit of work (file, page): `round(i / N * 100)`.
    PerUnit,
    /// Synthetic ticking while one opaque AI call is outstanding.
    TickingText,
    /// As `TickingText`, on the slower image interval.
    TickingImage,
    /// Single fast local step; only the initial and final values.
    Immediate,
}

/// Static metadata and intake contract of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub title: &'static str,
    pub description: &'static str,
    pub category: ToolCategory,
    pub accent_color: &'static str,
    pub is_coming_soon: bool,
    #[serde(skip)]
    pub accept: AcceptSpec,
    #[serde(skip)]
    pub mode: IntakeMode,
    /// Minimum number of input files.
    pub min_files: usize,
    /// Whether accepted files get a preview handle.
    pub previews: bool,
    #[serde(skip)]
    pub progress: ProgressMode,
}

impl ToolDescriptor {
    /// Route path, e.g. `/merge-pdf`.
    pub fn path(&self) -> String {
        format!("/{}", self.id.as_str())
    }
}

#[allow(clippy::too_many_arguments)]
const fn tool(
    id: ToolId,
    title: &'static str,
    description: &'static str,
    category: ToolCategory,
    accent_color: &'static str,
    accept: AcceptSpec,
    mode: IntakeMode,
    min_files: usize,
    progress: ProgressMode,
) -> ToolDescriptor {
    ToolDescriptor {
        id,
        title,
        description,
        category,
        accent_color,
        is_coming_soon: false,
        accept,
        mode,
        min_files,
        previews: false,
        progress,
    }
}

const fn with_previews(mut t: ToolDescriptor) -> ToolDescriptor {
    t.previews = true;
    t
}

const fn coming_soon(mut t: ToolDescriptor) -> ToolDescriptor {
    t.is_coming_soon = true;
    t
}

use IntakeMode::{Multiple, Single};
use ProgressMode::{Immediate, PerUnit, TickingImage, TickingText};
use ToolCategory::{Ai, Docx, Image, Pdf};

/// The full catalog in display order.
pub static TOOLS: [ToolDescriptor; 16] = [
    // AI
    tool(ToolId::Summarize, "Summarize Document", "Use AI to get a quick summary of any text file.",
        Ai, "#6366F1", AcceptSpec::TEXT, Single, 1, TickingText),
    tool(ToolId::Translate, "Translate Document", "Translate text files into different languages.",
        Ai, "#EC4899", AcceptSpec::TEXT, Single, 1, TickingText),
    tool(ToolId::CorrectText, "Correct Grammar", "Fix spelling and grammar mistakes in your text.",
        Ai, "#10B981", AcceptSpec::TEXT, Single, 1, TickingText),
    // Image
    with_previews(tool(ToolId::RemoveBackground, "Remove Background",
        "Automatically remove the background from an image.",
        Image, "#F59E0B", AcceptSpec::ANY_IMAGE, Single, 1, TickingImage)),
    with_previews(tool(ToolId::EditImage, "Edit Image with AI",
        "Describe the edits you want and let AI apply them.",
        Image, "#3B82F6", AcceptSpec::ANY_IMAGE, Single, 1, TickingImage)),
    with_previews(tool(ToolId::ImageToPdf, "Image to PDF", "Convert JPG and PNG images to PDF.",
        Image, "#8B5CF6", AcceptSpec::PNG_JPEG, Multiple, 1, PerUnit)),
    tool(ToolId::QrGenerator, "QR Code Generator", "Create a QR code from any text or link.",
        Image, "#0F172A", AcceptSpec::NONE, Single, 0, Immediate),
    // PDF
    tool(ToolId::MergePdf, "Merge PDF", "Combine multiple PDF files into one single document.",
        Pdf, "#EF4444", AcceptSpec::PDF, Multiple, 2, PerUnit),
    tool(ToolId::SplitPdf, "Split PDF", "Extract specific pages from a PDF file.",
        Pdf, "#0EA5E9", AcceptSpec::PDF, Single, 1, Immediate),
    tool(ToolId::PdfToJpg, "PDF to JPG", "Convert each page of a PDF into a JPG image.",
        Pdf, "#D946EF", AcceptSpec::PDF, Single, 1, PerUnit),
    tool(ToolId::PdfToWord, "PDF to Word", "Convert your PDF files to editable DOCX documents.",
        Pdf, "#2563EB", AcceptSpec::PDF, Single, 1, Immediate),
    tool(ToolId::PdfToExcel, "PDF to Excel", "Extract tables from PDF files into a CSV file.",
        Pdf, "#16A34A", AcceptSpec::PDF, Single, 1, PerUnit),
    coming_soon(tool(ToolId::CompressPdf, "Compress PDF", "Reduce the file size of your PDF documents.",
        Pdf, "#64748B", AcceptSpec::PDF, Single, 1, Immediate)),
    // DOCX
    tool(ToolId::WordToPdf, "Word to PDF", "Convert DOCX files to PDF for easy sharing.",
        Docx, "#2563EB", AcceptSpec::DOCX, Single, 1, Immediate),
    tool(ToolId::DocxToText, "DOCX to Text", "Extract plain text from a Word document.",
        Docx, "#475569", AcceptSpec::WORD, Single, 1, Immediate),
    coming_soon(tool(ToolId::ExcelToPdf, "Excel to PDF", "Convert Excel spreadsheets to PDF documents.",
        Docx, "#16A34A", AcceptSpec::NONE, Single, 1, Immediate)),
];

/// Result of resolving a route path.
#[derive(Debug, Clone, Copy)]
pub enum Route {
    Tool(ToolId),
    ComingSoon(&'static ToolDescriptor),
    NotFound,
}

/// Map a path such as `/merge-pdf`, `merge-pdf` or `#/merge-pdf` to a route.
pub fn resolve(path: &str) -> Route {
    let slug = path.trim_start_matches('#').trim_matches('/');
    match TOOLS.iter().find(|t| t.id.as_str() == slug) {
        Some(t) if t.is_coming_soon => Route::ComingSoon(t),
        Some(t) => Route::Tool(t.id),
        None => Route::NotFound,
    }
}

/// Tools of one category, in catalog order.
pub fn by_category(category: ToolCategory) -> impl Iterator<Item = &'static ToolDescriptor> {
    TOOLS.iter().filter(move |t| t.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_has_one_row() {
        for t in TOOLS.iter() {
            let n = TOOLS.iter().filter(|o| o.id == t.id).count();
            assert_eq!(n, 1, "{} appears {n} times", t.id);
            assert_eq!(t.id.descriptor().id, t.id);
        }
    }

    #[test]
    fn resolve_routes() {
        assert!(matches!(resolve("/merge-pdf"), Route::Tool(ToolId::MergePdf)));
        assert!(matches!(resolve("#/qr-generator"), Route::Tool(ToolId::QrGenerator)));
        match resolve("/compress-pdf") {
            Route::ComingSoon(d) => assert_eq!(d.title, "Compress PDF"),
            other => panic!("expected coming soon, got {other:?}"),
        }
        assert!(matches!(resolve("/about"), Route::NotFound));
    }

    #[test]
    fn slug_round_trips_through_from_str() {
        assert_eq!("pdf-to-excel".parse::<ToolId>().unwrap(), ToolId::PdfToExcel);
        assert!("pdf-to-pptx".parse::<ToolId>().is_err());
    }

    #[test]
    fn merge_needs_two_pdfs() {
        let d = ToolId::MergePdf.descriptor();
        assert_eq!(d.min_files, 2);
        assert_eq!(d.mode, IntakeMode::Multiple);
        assert_eq!(d.path(), "/merge-pdf");
    }

    #[test]
    fn engine_and_ai_requirements() {
        assert!(ToolId::PdfToExcel.needs_pdf_engine() && ToolId::PdfToExcel.uses_ai());
        assert!(!ToolId::QrGenerator.needs_pdf_engine() && !ToolId::QrGenerator.uses_ai());
        assert!(!ToolId::DocxToText.needs_pdf_engine());
        assert!(ToolId::Summarize.uses_ai());
    }

    #[test]
    fn categories_partition_catalog() {
        let total: usize = [ToolCategory::Pdf, ToolCategory::Docx, ToolCategory::Image, ToolCategory::Ai]
            .into_iter()
            .map(|c| by_category(c).count())
            .sum();
        assert_eq!(total, TOOLS.len());
        assert_eq!(by_category(ToolCategory::Ai).count(), 3);
    }
}
