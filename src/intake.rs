//! File intake: turn user-selected files into validated [`SourceFile`]s.
//!
//! Each tool declares an [`AcceptSpec`] (the same vocabulary as an HTML
//! `accept` attribute: `.ext`, `type/subtype`, `type/*`) and an
//! [`IntakeMode`]. Single-file tools replace their selection; multi-file
//! tools keep an ordered, append-only list whose order is the processing
//! order.
//!
//! ## Partially valid drops
//! One policy for every tool: valid files from a drop are kept, invalid ones
//! are dropped and reported in [`IntakeReport::rejected`]. A drop with no
//! valid file at all fails with [`ValidationError::InvalidType`] and leaves
//! the selection untouched.
//!
//! ## Previews
//! Image tools materialise a [`PreviewHandle`] per file: a temporary file a
//! viewer can open. The handle is released when the file is replaced,
//! removed, or the intake is cleared or dropped.

use crate::error::{ToolError, ValidationError};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_OCTET: &str = "application/octet-stream";

// ── Source file ──────────────────────────────────────────────────────────

/// An accepted input: original name, declared MIME type, bytes.
///
/// Immutable once constructed. Cloning shares the byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    mime: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Build from a name and bytes, detecting the MIME type.
    pub fn detect(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime = detect_mime(Some(&name), &bytes).to_string();
        Self { name, mime, bytes }
    }

    /// Read a file from disk, detecting its MIME type.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ToolError::InputReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::detect(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Detect a MIME type from the file name, falling back to magic bytes.
pub fn detect_mime(name: Option<&str>, bytes: &[u8]) -> &'static str {
    if let Some(ext) = name.and_then(extension_of) {
        match ext.as_str() {
            "pdf" => return MIME_PDF,
            "docx" => return MIME_DOCX,
            "doc" => return MIME_DOC,
            "txt" => return MIME_TEXT,
            "csv" => return MIME_CSV,
            "png" => return MIME_PNG,
            "jpg" | "jpeg" => return MIME_JPEG,
            "webp" => return "image/webp",
            "gif" => return "image/gif",
            "bmp" => return "image/bmp",
            _ => {}
        }
    }
    // fallback: magic
    if bytes.starts_with(b"%PDF") {
        return MIME_PDF;
    }
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return MIME_PNG;
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return MIME_JPEG;
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "image/webp";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }
    // DOCX is a zip with PK; assume Word when nothing else matched
    if bytes.starts_with(b"PK\x03\x04") {
        return MIME_DOCX;
    }
    if !bytes.is_empty() && std::str::from_utf8(bytes).is_ok() {
        return MIME_TEXT;
    }
    MIME_OCTET
}

// ── Accept spec ──────────────────────────────────────────────────────────

/// The set of files a tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptSpec {
    patterns: &'static [&'static str],
    label: &'static str,
}

impl AcceptSpec {
    pub const PDF: AcceptSpec = AcceptSpec::new(&[".pdf", MIME_PDF], "PDF files only");
    pub const TEXT: AcceptSpec = AcceptSpec::new(&[".txt", MIME_TEXT], "TEXT files only (.txt)");
    pub const WORD: AcceptSpec = AcceptSpec::new(&[".doc", ".docx", MIME_DOC, MIME_DOCX], "DOCX files only");
    pub const DOCX: AcceptSpec = AcceptSpec::new(&[".docx", MIME_DOCX], "DOCX files only");
    pub const ANY_IMAGE: AcceptSpec = AcceptSpec::new(&["image/*"], "PNG, JPG, WEBP, etc.");
    pub const PNG_JPEG: AcceptSpec = AcceptSpec::new(&[MIME_PNG, MIME_JPEG], "JPG or PNG images");
    pub const NONE: AcceptSpec = AcceptSpec::new(&[], "no input file");

    pub const fn new(patterns: &'static [&'static str], label: &'static str) -> Self {
        Self { patterns, label }
    }

    /// Human label, e.g. "PDF files only".
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn patterns(&self) -> &'static [&'static str] {
        self.patterns
    }

    /// True if the file's extension or MIME type matches any pattern.
    pub fn accepts(&self, file: &SourceFile) -> bool {
        let ext = file.extension();
        let mime = file.mime().to_ascii_lowercase();
        self.patterns.iter().any(|p| {
            if let Some(want) = p.strip_prefix('.') {
                ext.as_deref() == Some(want)
            } else if let Some(prefix) = p.strip_suffix("/*") {
                mime.split_once('/').map(|(t, _)| t) == Some(prefix)
            } else {
                mime == *p
            }
        })
    }
}

// ── Preview handle ───────────────────────────────────────────────────────

/// A scoped temporary copy of a file for previewing.
///
/// The file is deleted when the handle is dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
}

impl PreviewHandle {
    /// Copy `source` into `dir`, or the system temp directory.
    pub fn acquire(source: &SourceFile, dir: Option<&Path>) -> Result<Self, ToolError> {
        let suffix = source
            .extension()
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let mut builder = tempfile::Builder::new();
        builder.prefix("convertai-preview-").suffix(&suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| ToolError::Internal(format!("preview allocation failed: {e}")))?;
        file.write_all(source.bytes())
            .map_err(|e| ToolError::Internal(format!("preview write failed: {e}")))?;
        debug!("Preview for '{}' at {}", source.name(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

// ── Intake ───────────────────────────────────────────────────────────────

/// Whether a tool takes one file or an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMode {
    /// Exactly one file; a new selection replaces the old.
    Single,
    /// Ordered, append-only list.
    Multiple,
}

/// Outcome of one [`FileIntake::accept`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeReport {
    pub accepted: usize,
    /// Names of files dropped for having the wrong type.
    pub rejected: Vec<String>,
}

impl IntakeReport {
    /// Aggregate warning for rejected files, if any.
    pub fn warning(&self, spec: &AcceptSpec) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }
        Some(format!(
            "Ignored {} file(s) of the wrong type ({}). Accepted: {}",
            self.rejected.len(),
            self.rejected.join(", "),
            spec.label()
        ))
    }
}

struct Entry {
    file: SourceFile,
    preview: Option<PreviewHandle>,
}

/// The current file selection of one tool session.
pub struct FileIntake {
    spec: AcceptSpec,
    mode: IntakeMode,
    previews: bool,
    preview_dir: Option<PathBuf>,
    entries: Vec<Entry>,
}

impl FileIntake {
    pub fn new(spec: AcceptSpec, mode: IntakeMode) -> Self {
        Self {
            spec,
            mode,
            previews: false,
            preview_dir: None,
            entries: Vec::new(),
        }
    }

    /// Materialise a [`PreviewHandle`] for every accepted file.
    pub fn with_previews(mut self, enabled: bool) -> Self {
        self.previews = enabled;
        self
    }

    /// Write previews under `dir` instead of the system temp directory.
    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = Some(dir.into());
        self
    }

    pub fn spec(&self) -> &AcceptSpec {
        &self.spec
    }

    pub fn mode(&self) -> IntakeMode {
        self.mode
    }

    /// Offer a drop of files.
    ///
    /// Single mode keeps the first valid file of the drop and replaces the
    /// previous selection. Multiple mode appends every valid file in order.
    /// Either way the selection only changes once every preview exists.
    pub fn accept(&mut self, drop: Vec<SourceFile>) -> Result<IntakeReport, ToolError> {
        let mut report = IntakeReport::default();
        let mut valid = Vec::new();
        for file in drop {
            if self.spec.accepts(&file) {
                valid.push(file);
            } else {
                warn!("Rejected '{}' ({}): expected {}", file.name(), file.mime(), self.spec.label());
                report.rejected.push(file.name().to_string());
            }
        }

        if valid.is_empty() {
            let name = report.rejected.join(", ");
            return Err(ValidationError::InvalidType {
                name,
                accepted: self.spec.label().to_string(),
            }
            .into());
        }

        if self.mode == IntakeMode::Single {
            for extra in valid.drain(1..) {
                report.rejected.push(extra.name().to_string());
            }
        }

        let staged = valid
            .into_iter()
            .map(|file| {
                let preview = if self.previews {
                    Some(PreviewHandle::acquire(&file, self.preview_dir.as_deref())?)
                } else {
                    None
                };
                Ok::<_, ToolError>(Entry { file, preview })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;

        report.accepted = staged.len();
        if self.mode == IntakeMode::Single {
            // old preview released here
            self.entries = staged;
        } else {
            self.entries.extend(staged);
        }
        Ok(report)
    }

    /// Remove the file at `index`, releasing its preview.
    pub fn remove(&mut self, index: usize) -> Option<SourceFile> {
        if index < self.entries.len() {
            Some(self.entries.remove(index).file)
        } else {
            None
        }
    }

    /// Drop every file and preview.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Accepted files in processing order.
    pub fn files(&self) -> Vec<SourceFile> {
        self.entries.iter().map(|e| e.file.clone()).collect()
    }

    /// Paths of live previews, in file order.
    pub fn preview_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|e| e.preview.as_ref().map(|p| p.path().to_path_buf()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FileIntake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileIntake")
            .field("spec", &self.spec.label())
            .field("mode", &self.mode)
            .field("files", &self.entries.iter().map(|e| e.file.name()).collect::<Vec<_>>())
            .finish()
    }
}
