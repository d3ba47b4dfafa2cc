//! Result presentation: artifact names, outcome summaries, and the
//! "download" that puts artifacts on disk.

use crate::error::ToolError;
use crate::state::{Artifact, ProcessState, ProcessStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::info;

static RE_PDF_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());
static RE_DOCX_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.docx?$").unwrap());
static RE_LAST_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^./\\]*$").unwrap());
static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap());

/// Fixed name of a merged PDF.
pub const MERGED_NAME: &str = "merged-document.pdf";
/// Fixed name of an image-to-PDF result.
pub const IMAGES_TO_PDF_NAME: &str = "images-to-pdf.pdf";
/// Fixed name of a generated QR code.
pub const QR_NAME: &str = "convertai-qr.png";

/// How an output filename is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRule {
    Merged,
    ImagesToPdf,
    Qr,
    /// `{stem}-pages-{start}-{end}.pdf`
    PageRange { start: usize, end: usize },
    /// `{stem}-page-{n}.jpg`, 1-based.
    Page(usize),
    /// Swap a trailing `.pdf` for `.{0}`.
    FromPdf(&'static str),
    /// Swap a trailing `.doc`/`.docx` for `.{0}`.
    FromDocx(&'static str),
    /// `{stem}-{0}.txt`
    TextSuffix(String),
    /// `{stem}-{0}.png`
    ImageSuffix(&'static str),
}

/// Name without its last extension; `image` when that leaves nothing.
pub fn stem(name: &str) -> String {
    let s = RE_LAST_EXT.replace(name, "");
    if s.is_empty() {
        "image".to_string()
    } else {
        s.into_owned()
    }
}

fn swap_extension(re: &Regex, name: &str, ext: &str) -> String {
    if re.is_match(name) {
        re.replace(name, format!(".{ext}").as_str()).into_owned()
    } else {
        format!("{name}.{ext}")
    }
}

/// Lower-case, spaces to dashes: `"Brazilian Portuguese"` → `brazilian-portuguese`.
pub fn language_slug(language: &str) -> String {
    language
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Output filename for `source` (the input's original name) under `rule`.
pub fn artifact_name(source: &str, rule: &NameRule) -> String {
    let source = RE_UNSAFE.replace_all(source, "_");
    let pdf_stem = || RE_PDF_EXT.replace(&source, "").into_owned();
    match rule {
        NameRule::Merged => MERGED_NAME.to_string(),
        NameRule::ImagesToPdf => IMAGES_TO_PDF_NAME.to_string(),
        NameRule::Qr => QR_NAME.to_string(),
        NameRule::PageRange { start, end } => format!("{}-pages-{start}-{end}.pdf", pdf_stem()),
        NameRule::Page(n) => format!("{}-page-{n}.jpg", pdf_stem()),
        NameRule::FromPdf(ext) => swap_extension(&RE_PDF_EXT, &source, ext),
        NameRule::FromDocx(ext) => swap_extension(&RE_DOCX_EXT, &source, ext),
        NameRule::TextSuffix(suffix) => format!("{}-{suffix}.txt", stem(&source)),
        NameRule::ImageSuffix(suffix) => format!("{}-{suffix}.png", stem(&source)),
    }
}

/// One-paragraph human summary of a session state.
pub fn describe(state: &ProcessState) -> String {
    match state.status {
        ProcessStatus::Idle => "Ready. Add a file to begin.".to_string(),
        ProcessStatus::Processing => format!("Processing... {}%", state.progress),
        ProcessStatus::Success => {
            let names: Vec<&str> = state.artifacts.iter().map(|a| a.filename.as_str()).collect();
            match names.len() {
                0 => "Done.".to_string(),
                1 => format!("Done! Your file is ready: {}", names[0]),
                n => format!("Done! {n} files are ready: {}", names.join(", ")),
            }
        }
        ProcessStatus::Error => match &state.error {
            Some(e) if e.configuration => {
                format!("Error: {} Check your configuration, then start over.", e.message)
            }
            Some(e) => format!("Error: {} Start over to try again.", e.message),
            None => "Error: the conversion failed.".to_string(),
        },
    }
}

/// Write every artifact into `dir`, each atomically (temp file + rename).
///
/// Returns the final paths in artifact order.
pub async fn save_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>, ToolError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ToolError::OutputWriteFailed { path, source }
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err(dir))?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(&artifact.filename);
        let tmp_path = dir.join(format!(".{}.tmp", artifact.filename));
        tokio::fs::write(&tmp_path, &artifact.bytes)
            .await
            .map_err(write_err(&path))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(write_err(&path))?;
        info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
        written.push(path);
    }
    Ok(written)
}
