//! Per-tool transforms.
//!
//! Each transform turns validated inputs into artifacts. Engine work goes
//! through [`Pipeline::blocking`]; AI work goes through the gateway, one
//! call at a time, with a ticker for single opaque calls.

use super::job::input_text;
use super::{Pipeline, ToolJob};
use crate::engine::compose::{layout, PageGeometry};
use crate::engine::encode::{decode_image, encode_jpeg};
use crate::engine::qr::QrRequest;
use crate::engine::{docx, join_page_text};
use crate::error::{AiError, ExpectedOutput, ToolError};
use crate::gateway::{language_name, AiOperation, AiOutput};
use crate::intake::{SourceFile, MIME_CSV, MIME_DOCX, MIME_JPEG, MIME_PDF, MIME_PNG, MIME_TEXT};
use crate::present::{artifact_name, language_slug, NameRule};
use crate::progress::{ProgressTicker, StateHandle};
use crate::prompts::NO_TABLES_FOUND;
use crate::state::Artifact;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Milestone set once text input has been read.
const TEXT_READ_PROGRESS: u8 = 30;
/// Milestone set once image input has been read.
const IMAGE_READ_PROGRESS: u8 = 40;

impl Pipeline {
    pub(super) async fn transform(
        &self,
        files: &[SourceFile],
        job: &ToolJob,
        run: &StateHandle,
    ) -> Result<Vec<Artifact>, ToolError> {
        match job {
            ToolJob::MergePdf => self.merge(files, run).await,
            ToolJob::SplitPdf { start, end } => self.split(&files[0], *start, *end, run).await,
            ToolJob::PdfToJpg => self.pdf_to_jpg(&files[0], run).await,
            ToolJob::PdfToWord => self.pdf_to_word(&files[0], run).await,
            ToolJob::PdfToExcel => self.pdf_to_excel(&files[0], run).await,
            ToolJob::WordToPdf => self.word_to_pdf(&files[0], run).await,
            ToolJob::DocxToText => self.docx_to_text(&files[0], run).await,
            ToolJob::ImageToPdf => self.image_to_pdf(files, run).await,
            ToolJob::Summarize | ToolJob::Translate { .. } | ToolJob::CorrectGrammar => {
                self.text_ai(&files[0], job, run).await
            }
            ToolJob::RemoveBackground | ToolJob::EditImage { .. } => {
                self.image_ai(&files[0], job, run).await
            }
            ToolJob::QrCode { text, dark, light } => {
                let req = QrRequest::parse(text, dark, light)?;
                let png = self.qr_png(&req)?;
                Ok(vec![Artifact::new(artifact_name("", &NameRule::Qr), MIME_PNG, png)])
            }
            ToolJob::CompressPdf | ToolJob::ExcelToPdf => Err(ToolError::ComingSoon(job.tool_id())),
        }
    }

    // ── PDF assembly ─────────────────────────────────────────────────────

    async fn merge(&self, files: &[SourceFile], run: &StateHandle) -> Result<Vec<Artifact>, ToolError> {
        let files = files.to_vec();
        let merged = self
            .blocking(run, move |engine, state| {
                let docs: Vec<&[u8]> = files.iter().map(|f| f.bytes()).collect();
                engine.merge(&docs, &mut |done, total| state.unit_done(done, total))
            })
            .await?;
        Ok(vec![Artifact::new(
            artifact_name("", &NameRule::Merged),
            MIME_PDF,
            merged,
        )])
    }

    async fn split(
        &self,
        file: &SourceFile,
        start: usize,
        end: usize,
        run: &StateHandle,
    ) -> Result<Vec<Artifact>, ToolError> {
        let source = file.clone();
        let pdf = self
            .blocking(run, move |engine, _| engine.extract_range(source.bytes(), start, end))
            .await?;
        Ok(vec![Artifact::new(
            artifact_name(file.name(), &NameRule::PageRange { start, end }),
            MIME_PDF,
            pdf,
        )])
    }

    async fn image_to_pdf(&self, files: &[SourceFile], run: &StateHandle) -> Result<Vec<Artifact>, ToolError> {
        let files = files.to_vec();
        let pdf = self
            .blocking(run, move |engine, state| {
                let images = files
                    .iter()
                    .map(|f| decode_image(f.bytes()))
                    .collect::<Result<Vec<_>, _>>()?;
                engine.images_to_pdf(&images, &mut |done, total| state.unit_done(done, total))
            })
            .await?;
        Ok(vec![Artifact::new(
            artifact_name("", &NameRule::ImagesToPdf),
            MIME_PDF,
            pdf,
        )])
    }

    // ── Rasterisation ────────────────────────────────────────────────────

    async fn pdf_to_jpg(&self, file: &SourceFile, run: &StateHandle) -> Result<Vec<Artifact>, ToolError> {
        let source = file.clone();
        let scale = self.config.jpg_scale;
        let quality = self.config.jpg_quality;
        let pages = self
            .blocking(run, move |engine, state| {
                let images = engine.rasterize(source.bytes(), scale, &mut |_, _| {})?;
                let total = images.len();
                let mut out = Vec::with_capacity(total);
                for (i, img) in images.iter().enumerate() {
                    out.push(encode_jpeg(img, quality)?);
                    state.unit_done(i + 1, total);
                }
                Ok(out)
            })
            .await?;
        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, jpeg)| {
                Artifact::new(artifact_name(file.name(), &NameRule::Page(i + 1)), MIME_JPEG, jpeg)
            })
            .collect())
    }

    // ── Text extraction / composition ────────────────────────────────────

    async fn pdf_to_word(&self, file: &SourceFile, run: &StateHandle) -> Result<Vec<Artifact>, ToolError> {
        let source = file.clone();
        let docx_bytes = self
            .blocking(run, move |engine, _| {
                let pages = engine.extract_text(source.bytes())?;
                let text = join_page_text(&pages);
                let paragraphs: Vec<String> = text.split('\n').map(str::to_string).collect();
                debug!("PDF→DOCX: {} page(s), {} paragraph(s)", pages.len(), paragraphs.len());
                docx::write_docx(&paragraphs)
            })
            .await?;
        Ok(vec![Artifact::new(
            artifact_name(file.name(), &NameRule::FromPdf("docx")),
            MIME_DOCX,
            docx_bytes,
        )])
    }

    async fn docx_to_text(&self, file: &SourceFile, run: &StateHandle) -> Result<Vec<Artifact>, ToolError> {
        let source = file.clone();
        let text = self
            .blocking(run, move |_, _| docx::extract_text(source.bytes()))
            .await?;
        Ok(vec![Artifact::new(
            artifact_name(file.name(), &NameRule::FromDocx("txt")),
            MIME_TEXT,
            text.into_bytes(),
        )])
    }

    async fn word_to_pdf(&self, file: &SourceFile, run: &StateHandle) -> Result<Vec<Artifact>, ToolError> {
        let source = file.clone();
        let pdf = self
            .blocking(run, move |engine, _| {
                let paragraphs = docx::extract_paragraphs(source.bytes())?;
                let pages = layout(&paragraphs, &PageGeometry::default());
                debug!("DOCX→PDF: {} paragraph(s) on {} page(s)", paragraphs.len(), pages.len());
                engine.compose_text(&pages)
            })
            .await?;
        Ok(vec![Artifact::new(
            artifact_name(file.name(), &NameRule::FromDocx("pdf")),
            MIME_PDF,
            pdf,
        )])
    }

    // ── AI-backed ────────────────────────────────────────────────────────

    /// Rasterise, then ask for tables page by page, strictly in order.
    async fn pdf_to_excel(&self, file: &SourceFile, run: &StateHandle) -> Result<Vec<Artifact>, ToolError> {
        let source = file.clone();
        let scale = self.config.table_scan_scale;
        let quality = self.config.table_scan_quality;
        let pages: Vec<Arc<[u8]>> = self
            .blocking(run, move |engine, _| {
                engine
                    .rasterize(source.bytes(), scale, &mut |_, _| {})?
                    .iter()
                    .map(|img| encode_jpeg(img, quality).map(Arc::from))
                    .collect()
            })
            .await?;

        let total = pages.len();
        let mut blocks = Vec::new();
        for (i, image) in pages.into_iter().enumerate() {
            let op = AiOperation::ExtractTableCsv {
                image,
                mime: MIME_JPEG.to_string(),
            };
            let csv = expect_text(self.gateway.invoke(&op).await?)?;
            if csv == NO_TABLES_FOUND {
                debug!("Page {}/{}: no tables", i + 1, total);
            } else {
                debug!("Page {}/{}: {} bytes of CSV", i + 1, total, csv.len());
                blocks.push(csv);
            }
            run.unit_done(i + 1, total);
        }

        if blocks.is_empty() {
            warn!("No tables found in {} page(s)", total);
            return Err(ToolError::NoTablesFound);
        }
        info!("Tables found on {}/{} page(s)", blocks.len(), total);
        Ok(vec![Artifact::new(
            artifact_name(file.name(), &NameRule::FromPdf("csv")),
            MIME_CSV,
            blocks.join("\n\n").into_bytes(),
        )])
    }

    async fn text_ai(
        &self,
        file: &SourceFile,
        job: &ToolJob,
        run: &StateHandle,
    ) -> Result<Vec<Artifact>, ToolError> {
        let text = input_text(file)?.to_string();
        milestone(run, TEXT_READ_PROGRESS);

        let (op, rule) = match job {
            ToolJob::Summarize => (
                AiOperation::Summarize { text },
                NameRule::TextSuffix("summary".into()),
            ),
            ToolJob::Translate { language } => {
                let name = language_name(language);
                let slug = language_slug(&name);
                (
                    AiOperation::Translate { text, language: name },
                    NameRule::TextSuffix(slug),
                )
            }
            _ => (
                AiOperation::CorrectGrammar { text },
                NameRule::TextSuffix("corrected".into()),
            ),
        };

        let output = {
            let _ticker = self.ticker(job, run);
            self.gateway.invoke(&op).await?
        };
        let body = expect_text(output)?;
        Ok(vec![Artifact::new(
            artifact_name(file.name(), &rule),
            MIME_TEXT,
            body.into_bytes(),
        )])
    }

    async fn image_ai(
        &self,
        file: &SourceFile,
        job: &ToolJob,
        run: &StateHandle,
    ) -> Result<Vec<Artifact>, ToolError> {
        let image: Arc<[u8]> = Arc::from(file.bytes());
        let mime = file.mime().to_string();
        milestone(run, IMAGE_READ_PROGRESS);

        let (op, rule) = match job {
            ToolJob::EditImage { instruction } => (
                AiOperation::EditImage {
                    image,
                    mime,
                    instruction: instruction.clone(),
                },
                NameRule::ImageSuffix("edited"),
            ),
            _ => (
                AiOperation::RemoveBackground { image, mime },
                NameRule::ImageSuffix("no-bg"),
            ),
        };

        let output = {
            let _ticker = self.ticker(job, run);
            self.gateway.invoke(&op).await?
        };
        match output {
            AiOutput::Image { mime, bytes } => Ok(vec![Artifact::new(
                artifact_name(file.name(), &rule),
                mime,
                bytes,
            )]),
            AiOutput::Text(_) => Err(AiError::NoOutputReturned {
                expected: ExpectedOutput::Image,
            }
            .into()),
        }
    }

    fn ticker(&self, job: &ToolJob, run: &StateHandle) -> ProgressTicker {
        ProgressTicker::start(
            run.clone(),
            self.tool_interval(job.tool_id()),
            self.config.tick_step,
            self.config.tick_ceiling,
        )
    }
}

/// Raise progress to `percent` unless it is already past it.
fn milestone(run: &StateHandle, percent: u8) {
    if run.snapshot().progress < percent {
        run.progress(percent);
    }
}

fn expect_text(output: AiOutput) -> Result<String, ToolError> {
    match output {
        AiOutput::Text(t) => Ok(t),
        AiOutput::Image { .. } => Err(AiError::NoOutputReturned {
            expected: ExpectedOutput::Text,
        }
        .into()),
    }
}
