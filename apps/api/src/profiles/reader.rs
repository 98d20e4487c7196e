//! Document Reader: resume bytes to plain text.

use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Extensions accepted for upload, lowercase without the dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc"];

static RE_PARAGRAPH_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"</w:p>|<w:br\s*/>|<w:tab\s*/>").unwrap());
static RE_TEXT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").unwrap());

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Unsupported file format '{0}'. Allowed: .pdf, .docx, .doc")]
    UnsupportedFormat(String),

    #[error("Error extracting text from PDF: {0}")]
    Pdf(String),

    #[error("Error extracting text from DOCX: {0}")]
    Docx(String),
}

/// Synchronous, CPU-bound. Callers run it on the blocking pool.
pub trait DocumentReader: Send + Sync {
    fn read(&self, filename: &str, bytes: &[u8]) -> Result<String, ReadError>;
}

/// Lowercased extension of `filename`, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

pub fn is_allowed_file(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// PDF via `pdf-extract`, Word via the OOXML package body.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextReader;

impl DocumentReader for FileTextReader {
    fn read(&self, filename: &str, bytes: &[u8]) -> Result<String, ReadError> {
        match file_extension(filename).as_deref() {
            Some("pdf") => read_pdf(bytes),
            // Legacy .doc is attempted as OOXML; binary Word files fail here.
            Some("docx") | Some("doc") => read_docx(bytes),
            other => Err(ReadError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

fn read_pdf(bytes: &[u8]) -> Result<String, ReadError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ReadError::Pdf("parser aborted on malformed document".to_string()))?
        .map(|text| text.trim().to_string())
        .map_err(|e| ReadError::Pdf(e.to_string()))
}

fn read_docx(bytes: &[u8]) -> Result<String, ReadError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ReadError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ReadError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ReadError::Docx(e.to_string()))?;
    Ok(document_xml_to_text(&xml))
}

/// Collects `<w:t>` runs, breaking lines at paragraph ends.
fn document_xml_to_text(xml: &str) -> String {
    let mut text = String::new();
    for segment in RE_PARAGRAPH_END.split(xml) {
        let line: String = RE_TEXT_RUN
            .captures_iter(segment)
            .filter_map(|c| c.get(1))
            .map(|m| decode_entities(m.as_str()))
            .collect();
        if !line.trim().is_empty() {
            text.push_str(line.trim_end());
            text.push('\n');
        }
    }
    text.trim().to_string()
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("word/document.xml", zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(is_allowed_file("resume.pdf"));
        assert!(is_allowed_file("Resume.DOCX"));
        assert!(is_allowed_file("old.doc"));
        assert!(!is_allowed_file("notes.txt"));
        assert!(!is_allowed_file("no_extension"));
    }

    #[test]
    fn test_reads_docx_paragraphs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">jane@x.com </w:t></w:r><w:r><w:t>| R&amp;D</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = FileTextReader.read("jane.docx", &docx_bytes(xml)).unwrap();
        assert_eq!(text, "Jane Doe\njane@x.com | R&D");
    }

    #[test]
    fn test_binary_doc_fails_cleanly() {
        let err = FileTextReader
            .read("legacy.doc", b"\xD0\xCF\x11\xE0 not a zip")
            .unwrap_err();
        assert!(matches!(err, ReadError::Docx(_)));
    }

    #[test]
    fn test_corrupt_pdf_fails_cleanly() {
        let err = FileTextReader.read("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, ReadError::Pdf(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileTextReader.read("notes.txt", b"hello").unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedFormat(ext) if ext == "txt"));
    }
}
