//! Text extraction for uploaded contract documents (PDF, DOCX/DOC, TXT).
//!
//! Callers supply raw bytes plus the declared type tag; this module returns
//! the document's plain UTF-8 text or a wrapped error naming the source
//! format and the underlying cause. Failures are never retried here.

use std::io::Read;

use thiserror::Error;
use tracing::info;

/// File extensions accepted by the upload endpoint.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "doc", "txt"];

/// Cap on the decompressed size of word/document.xml (zip-bomb protection).
const MAX_DOCUMENT_XML_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("Failed to extract text from DOCX: {0}")]
    Docx(String),

    #[error("Failed to extract text from TXT: {0}")]
    Txt(#[from] std::str::Utf8Error),
}

/// Extracts plain text from document bytes based on the declared type tag
/// (case-insensitive; one of `pdf`, `docx`, `doc`, `txt`).
pub fn extract_text(file_content: &[u8], file_type: &str) -> Result<String, ExtractError> {
    match file_type.to_ascii_lowercase().as_str() {
        "pdf" => extract_pdf(file_content),
        "docx" | "doc" => extract_docx(file_content),
        "txt" => extract_txt(file_content),
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

/// PDF text via pdf-extract. The library walks the page tree and joins
/// page text itself; the in-memory document is dropped on every path.
fn extract_pdf(file_content: &[u8]) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text_from_mem(file_content)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    info!("Extracted {} characters from PDF", text.len());
    Ok(text)
}

/// DOCX is a ZIP archive; the body lives in word/document.xml. Paragraphs
/// (`w:p`) whose trimmed text is non-empty are kept and joined with newlines.
fn extract_docx(file_content: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(file_content))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let doc_xml = {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        read_bounded(entry, MAX_DOCUMENT_XML_BYTES)
            .map_err(|e| ExtractError::Docx(e.to_string()))?
            .ok_or_else(|| {
                ExtractError::Docx("word/document.xml exceeds size limit".to_string())
            })?
    };

    let paragraphs = collect_paragraphs(&doc_xml)?;
    info!(
        "Extracted {} paragraphs from DOCX",
        paragraphs.len()
    );
    Ok(paragraphs.join("\n"))
}

/// Reads at most `max_bytes` from `reader`; `None` when the source holds
/// more. A source of exactly `max_bytes` is within the limit.
fn read_bounded<R: Read>(reader: R, max_bytes: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut out = Vec::new();
    reader.take(max_bytes + 1).read_to_end(&mut out)?;
    if out.len() as u64 > max_bytes {
        return Ok(None);
    }
    Ok(Some(out))
}

/// Streams the document XML and gathers `w:t` run text per `w:p` paragraph.
fn collect_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                current.push_str(text.as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn extract_txt(file_content: &[u8]) -> Result<String, ExtractError> {
    let text = std::str::from_utf8(file_content)?;
    info!("Extracted {} characters from TXT file", text.len());
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{body}</w:body></w:document>"
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn txt_decodes_utf8() {
        let text = extract_text("Payment due in 30 days.".as_bytes(), "txt").unwrap();
        assert_eq!(text, "Payment due in 30 days.");
    }

    #[test]
    fn txt_rejects_invalid_utf8() {
        let err = extract_text(&[0xff, 0xfe, 0x00], "txt").unwrap_err();
        assert!(matches!(err, ExtractError::Txt(_)));
        assert!(err.to_string().contains("TXT"));
    }

    #[test]
    fn unsupported_tag_is_rejected() {
        let err = extract_text(b"anything", "exe").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn type_tag_is_case_insensitive() {
        assert!(extract_text(b"hello", "TXT").is_ok());
    }

    #[test]
    fn docx_joins_paragraphs_with_newline() {
        let bytes = docx_with_paragraphs(&["First clause.", "Second clause."]);
        let text = extract_text(&bytes, "docx").unwrap();
        assert_eq!(text, "First clause.\nSecond clause.");
    }

    #[test]
    fn docx_skips_whitespace_only_paragraphs() {
        let bytes = docx_with_paragraphs(&["Kept.", "   ", "Also kept."]);
        let text = extract_text(&bytes, "docx").unwrap();
        assert_eq!(text, "Kept.\nAlso kept.");
    }

    #[test]
    fn doc_tag_uses_docx_path() {
        let bytes = docx_with_paragraphs(&["Legacy extension."]);
        let text = extract_text(&bytes, "doc").unwrap();
        assert_eq!(text, "Legacy extension.");
    }

    #[test]
    fn invalid_pdf_wraps_error_with_format() {
        let err = extract_text(b"not a pdf", "pdf").unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }

    #[test]
    fn invalid_zip_wraps_error_for_docx() {
        let err = extract_text(b"not a zip", "docx").unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
        assert!(err.to_string().contains("DOCX"));
    }

    #[test]
    fn read_bounded_accepts_source_of_exactly_max_bytes() {
        let data = [7u8; 16];
        let out = read_bounded(&data[..], 16).unwrap();
        assert_eq!(out.as_deref(), Some(&data[..]));
    }

    #[test]
    fn read_bounded_rejects_source_over_max_bytes() {
        let data = [7u8; 17];
        assert!(read_bounded(&data[..], 16).unwrap().is_none());
    }

    #[test]
    fn docx_without_document_xml_fails() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text(&buf, "docx").unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }
}
