//! Tool jobs and their local validation.
//!
//! A [`ToolJob`] names a tool plus its tool-specific parameters. Everything
//! that can be checked without an engine or the network is checked here,
//! before the pipeline leaves `Idle`.

use crate::catalog::ToolId;
use crate::engine::qr::QrRequest;
use crate::error::ValidationError;
use crate::intake::SourceFile;
use tracing::warn;

/// One requested conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolJob {
    MergePdf,
    /// 1-based, inclusive.
    SplitPdf { start: usize, end: usize },
    PdfToJpg,
    PdfToWord,
    PdfToExcel,
    CompressPdf,
    WordToPdf,
    DocxToText,
    ExcelToPdf,
    ImageToPdf,
    Summarize,
    /// `language` is a code (`de`) or a display name (`German`).
    Translate { language: String },
    CorrectGrammar,
    RemoveBackground,
    EditImage { instruction: String },
    /// Colours are `#rrggbb` hex strings.
    QrCode { text: String, dark: String, light: String },
}

impl ToolJob {
    pub fn tool_id(&self) -> ToolId {
        match self {
            ToolJob::MergePdf => ToolId::MergePdf,
            ToolJob::SplitPdf { .. } => ToolId::SplitPdf,
            ToolJob::PdfToJpg => ToolId::PdfToJpg,
            ToolJob::PdfToWord => ToolId::PdfToWord,
            ToolJob::PdfToExcel => ToolId::PdfToExcel,
            ToolJob::CompressPdf => ToolId::CompressPdf,
            ToolJob::WordToPdf => ToolId::WordToPdf,
            ToolJob::DocxToText => ToolId::DocxToText,
            ToolJob::ExcelToPdf => ToolId::ExcelToPdf,
            ToolJob::ImageToPdf => ToolId::ImageToPdf,
            ToolJob::Summarize => ToolId::Summarize,
            ToolJob::Translate { .. } => ToolId::Translate,
            ToolJob::CorrectGrammar => ToolId::CorrectText,
            ToolJob::RemoveBackground => ToolId::RemoveBackground,
            ToolJob::EditImage { .. } => ToolId::EditImage,
            ToolJob::QrCode { .. } => ToolId::QrGenerator,
        }
    }

    /// Check inputs and parameters against the tool's catalog row.
    ///
    /// Page ranges need the page count and are checked separately by
    /// [`check_page_range`].
    pub fn validate(&self, files: &[SourceFile]) -> Result<(), ValidationError> {
        let descriptor = self.tool_id().descriptor();

        if descriptor.min_files > 0 {
            if files.is_empty() {
                return Err(ValidationError::NoFiles);
            }
            if files.len() < descriptor.min_files {
                return Err(ValidationError::TooFewFiles {
                    required: descriptor.min_files,
                    got: files.len(),
                });
            }
        }
        if let Some(bad) = files.iter().find(|f| !descriptor.accept.accepts(f)) {
            return Err(ValidationError::InvalidType {
                name: bad.name().to_string(),
                accepted: descriptor.accept.label().to_string(),
            });
        }

        match self {
            ToolJob::Translate { language } if language.trim().is_empty() => {
                Err(ValidationError::EmptyField("Target language"))
            }
            ToolJob::EditImage { instruction } if instruction.trim().is_empty() => {
                Err(ValidationError::EmptyField("Edit instructions"))
            }
            ToolJob::QrCode { text, dark, light } => QrRequest::parse(text, dark, light).map(|_| ()),
            ToolJob::Summarize | ToolJob::Translate { .. } | ToolJob::CorrectGrammar => {
                let Some(file) = files.first() else {
                    return Err(ValidationError::EmptyField("Input text"));
                };
                if input_text(file)?.trim().is_empty() {
                    Err(ValidationError::EmptyField("Input text"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

/// The file body as text. Invalid UTF-8 is refused rather than repaired.
pub fn input_text(file: &SourceFile) -> Result<&str, ValidationError> {
    std::str::from_utf8(file.bytes()).map_err(|e| {
        warn!("'{}' is not UTF-8 (valid up to byte {})", file.name(), e.valid_up_to());
        ValidationError::NotUtf8Text {
            name: file.name().to_string(),
        }
    })
}

/// Valid iff `1 ≤ start ≤ end ≤ total`.
pub fn check_page_range(start: usize, end: usize, total: usize) -> Result<(), ValidationError> {
    if start >= 1 && start <= end && end <= total {
        Ok(())
    } else {
        Err(ValidationError::InvalidPageRange { start, end, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{MIME_PDF, MIME_PNG, MIME_TEXT};

    fn pdf(name: &str) -> SourceFile {
        SourceFile::new(name, MIME_PDF, b"%PDF-1.7".to_vec())
    }

    #[test]
    fn merge_needs_two_pdfs() {
        assert_eq!(ToolJob::MergePdf.validate(&[]), Err(ValidationError::NoFiles));
        assert_eq!(
            ToolJob::MergePdf.validate(&[pdf("a.pdf")]),
            Err(ValidationError::TooFewFiles { required: 2, got: 1 })
        );
        assert!(ToolJob::MergePdf.validate(&[pdf("a.pdf"), pdf("b.pdf")]).is_ok());
    }

    #[test]
    fn wrong_type_is_rejected_by_name() {
        let png = SourceFile::new("cat.png", MIME_PNG, vec![0x89, b'P', b'N', b'G']);
        let err = ToolJob::MergePdf.validate(&[pdf("a.pdf"), png]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidType { ref name, .. } if name == "cat.png"));
    }

    #[test]
    fn qr_needs_no_files_but_text() {
        let job = ToolJob::QrCode {
            text: "https://convertai.life".into(),
            dark: "#000000".into(),
            light: "#ffffff".into(),
        };
        assert!(job.validate(&[]).is_ok());
        let empty = ToolJob::QrCode {
            text: " ".into(),
            dark: "#000000".into(),
            light: "#ffffff".into(),
        };
        assert_eq!(empty.validate(&[]), Err(ValidationError::EmptyField("QR content")));
    }

    #[test]
    fn text_tools_reject_blank_input() {
        let blank = SourceFile::new("notes.txt", MIME_TEXT, b"  \n ".to_vec());
        assert_eq!(
            ToolJob::Summarize.validate(&[blank]),
            Err(ValidationError::EmptyField("Input text"))
        );
        let text = SourceFile::new("notes.txt", MIME_TEXT, b"hello".to_vec());
        assert_eq!(
            ToolJob::Translate { language: "".into() }.validate(&[text]),
            Err(ValidationError::EmptyField("Target language"))
        );
    }

    #[test]
    fn text_tools_refuse_invalid_utf8() {
        let latin1 = SourceFile::new("caf\u{e9}.txt", MIME_TEXT, b"caf\xe9 au lait".to_vec());
        assert_eq!(
            ToolJob::CorrectGrammar.validate(std::slice::from_ref(&latin1)),
            Err(ValidationError::NotUtf8Text {
                name: "caf\u{e9}.txt".into()
            })
        );
        assert!(input_text(&latin1).is_err());

        let utf8 = SourceFile::new("cafe.txt", MIME_TEXT, "café au lait".as_bytes().to_vec());
        assert_eq!(input_text(&utf8), Ok("café au lait"));
    }

    #[test]
    fn page_range_bounds() {
        assert!(check_page_range(1, 1, 1).is_ok());
        assert!(check_page_range(2, 5, 5).is_ok());
        assert!(check_page_range(0, 1, 5).is_err());
        assert!(check_page_range(3, 2, 5).is_err());
        assert!(check_page_range(1, 6, 5).is_err());
    }
}
