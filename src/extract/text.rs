// Document-to-text conversion for syllabus uploads

use std::io::Cursor;

use docx_rust::document::BodyContent;
use docx_rust::DocxFile;
use lopdf::Document;
use tracing::warn;

use crate::config::{DOCX_MEDIA_TYPE, PDF_MEDIA_TYPE};
use crate::extract::ExtractionError;

/// Convert raw document bytes into plain text according to the declared media
/// type. Fails with `EmptyInput` when no usable text comes out.
pub fn extract_text(bytes: &[u8], media_type: &str) -> Result<String, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::EmptyInput);
    }

    let text = match media_type {
        PDF_MEDIA_TYPE => pdf_text(bytes)?,
        DOCX_MEDIA_TYPE => docx_text(bytes)?,
        other => return Err(ExtractionError::UnsupportedMediaType(other.to_string())),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyInput);
    }

    Ok(trimmed.to_string())
}

/// Extract text page by page and concatenate. A single unreadable page is
/// skipped rather than failing the whole document.
fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = Document::load_mem(bytes)
        .map_err(|e| ExtractionError::InvalidDocument(format!("failed to read PDF: {e}")))?;

    let mut text = String::new();
    let pages = document.get_pages();
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                warn!(page = *page_number, error = %e, "skipping unreadable PDF page");
            }
        }
    }

    Ok(text)
}

fn docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let file = DocxFile::from_reader(Cursor::new(bytes))
        .map_err(|e| ExtractionError::InvalidDocument(format!("failed to read document: {e:?}")))?;
    let docx = file
        .parse()
        .map_err(|e| ExtractionError::InvalidDocument(format!("failed to parse document: {e:?}")))?;

    let mut text = String::new();
    for content in &docx.document.body.content {
        if let BodyContent::Paragraph(paragraph) = content {
            for run_text in paragraph.iter_text() {
                text.push_str(run_text);
            }
            text.push('\n');
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bytes_rejected() {
        let err = extract_text(&[], PDF_MEDIA_TYPE).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyInput));
    }

    #[test]
    fn test_unknown_media_type_rejected() {
        let err = extract_text(b"plain text", "text/plain").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_garbage_pdf_rejected() {
        let err = extract_text(b"not a pdf at all", PDF_MEDIA_TYPE).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidDocument(_)));
    }
}
