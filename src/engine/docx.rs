//! DOCX reading and writing.
//!
//! A DOCX file is a zip package; the body lives in `word/document.xml`.
//! Reading walks that XML with `quick-xml` and collects the text of each
//! `w:p` paragraph (`w:t` runs, `w:tab` → tab, `w:br`/`w:cr` → newline).
//! Writing emits the three parts a word processor needs to open a document
//! and nothing else: no styles, no fonts, no numbering.

use crate::error::EngineError;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_TAIL: &str = "<w:sectPr/></w:body></w:document>";

// ── Reading ──────────────────────────────────────────────────────────────

/// Text of every paragraph in document order. Empty paragraphs are kept.
pub fn extract_paragraphs(docx: &[u8]) -> Result<Vec<String>, EngineError> {
    let mut archive = ZipArchive::new(Cursor::new(docx))
        .map_err(|e| EngineError::UnsupportedInputFormat(format!("not a DOCX package: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| {
            EngineError::CorruptOrEncryptedInput(format!("package has no {DOCUMENT_PART}"))
        })?
        .read_to_string(&mut xml)
        .map_err(|e| EngineError::CorruptOrEncryptedInput(e.to_string()))?;
    let paragraphs = parse_document_xml(&xml)?;
    debug!("DOCX: {} paragraphs", paragraphs.len());
    Ok(paragraphs)
}

/// Plain text with paragraphs separated by a blank line.
pub fn extract_text(docx: &[u8]) -> Result<String, EngineError> {
    Ok(extract_paragraphs(docx)?.join("\n\n"))
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>, EngineError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_run = 0usize;
    let mut in_text = false;

    let push = |current: &mut Option<String>, s: &str| {
        if let Some(p) = current.as_mut() {
            p.push_str(s);
        }
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current = Some(String::new()),
                b"w:r" => in_run += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                // w:tab also appears as a tab-stop definition outside runs
                b"w:tab" if in_run > 0 => push(&mut current, "\t"),
                b"w:br" | b"w:cr" if in_run > 0 => push(&mut current, "\n"),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| EngineError::CorruptOrEncryptedInput(e.to_string()))?;
                push(&mut current, &text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => in_run = in_run.saturating_sub(1),
                b"w:p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(EngineError::CorruptOrEncryptedInput(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(paragraphs)
}

// ── Writing ──────────────────────────────────────────────────────────────

/// Build a minimal DOCX with one plain paragraph per entry.
pub fn write_docx(paragraphs: &[String]) -> Result<Vec<u8>, EngineError> {
    let fail = |e: &dyn std::fmt::Display| {
        EngineError::EngineInternalFailure(format!("Failed to write DOCX: {e}"))
    };
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", RELS_XML.to_string()),
        (DOCUMENT_PART, document_xml(paragraphs)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options).map_err(|e| fail(&e))?;
        zip.write_all(body.as_bytes()).map_err(|e| fail(&e))?;
    }
    let cursor = zip.finish().map_err(|e| fail(&e))?;
    Ok(cursor.into_inner())
}

fn document_xml(paragraphs: &[String]) -> String {
    let mut xml = String::from(DOCUMENT_HEAD);
    for para in paragraphs {
        if para.is_empty() {
            xml.push_str("<w:p/>");
            continue;
        }
        xml.push_str("<w:p><w:r>");
        for (i, segment) in para.split('\t').enumerate() {
            if i > 0 {
                xml.push_str("<w:tab/>");
            }
            if !segment.is_empty() {
                xml.push_str(r#"<w:t xml:space="preserve">"#);
                xml.push_str(&escape(segment));
                xml.push_str("</w:t>");
            }
        }
        xml.push_str("</w:r></w:p>");
    }
    xml.push_str(DOCUMENT_TAIL);
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<w:document xmlns:w="x"><w:body>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
<w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve">world &amp; co</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
</w:body></w:document>"#;

    #[test]
    fn parses_runs_tabs_and_breaks() {
        let paras = parse_document_xml(SAMPLE).unwrap();
        assert_eq!(paras, vec!["Hello\tworld & co", "", "line one\nline two"]);
    }

    #[test]
    fn written_docx_reads_back() {
        let paras = vec![
            "Title <draft>".to_string(),
            String::new(),
            "col1\tcol2".to_string(),
        ];
        let bytes = write_docx(&paras).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(extract_paragraphs(&bytes).unwrap(), paras);
        assert_eq!(extract_text(&bytes).unwrap(), "Title <draft>\n\n\n\ncol1\tcol2");
    }

    #[test]
    fn non_zip_is_unsupported() {
        let err = extract_paragraphs(b"%PDF-1.7 not a docx").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedInputFormat(_)));
    }

    #[test]
    fn zip_without_document_part_is_corrupt() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("hello.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        let err = extract_paragraphs(&bytes).unwrap_err();
        assert!(matches!(err, EngineError::CorruptOrEncryptedInput(_)));
    }
}
