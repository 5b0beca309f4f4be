//! Document text extraction.
//!
//! Uploaded files arrive as raw bytes plus a file name; the extension
//! selects the decoder. PDFs are decoded page by page so one bad page
//! never sinks the whole document.

use lopdf::Document;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Select the extractor from the file extension. Anything that is
    /// not a PDF is treated as plain text.
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            DocumentKind::Pdf
        } else {
            DocumentKind::PlainText
        }
    }
}

/// Extract the full text of an uploaded document.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ApiError> {
    match kind {
        DocumentKind::Pdf => extract_pdf_text(bytes),
        DocumentKind::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Decode each page in document order and join the page texts with a
/// newline. Pages with no extractable text contribute an empty string.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, ApiError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ApiError::BadRequest(format!("could not parse PDF: {e}")))?;

    let pages: Vec<String> = doc
        .get_pages()
        .keys()
        .map(|page_number| {
            doc.extract_text(&[*page_number]).unwrap_or_else(|e| {
                tracing::debug!("No extractable text on page {}: {}", page_number, e);
                String::new()
            })
        })
        .collect();

    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_pdf() {
        assert_eq!(DocumentKind::from_file_name("handbook.pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_file_name("HANDBOOK.PDF"), DocumentKind::Pdf);
    }

    #[test]
    fn everything_else_is_plain_text() {
        assert_eq!(DocumentKind::from_file_name("notes.txt"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_file_name("readme.md"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_file_name("no_extension"), DocumentKind::PlainText);
    }

    #[test]
    fn plain_text_decodes_valid_utf8() {
        let text = extract_text("hello world".as_bytes(), DocumentKind::PlainText).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn plain_text_tolerates_invalid_bytes() {
        let bytes = [b'o', b'k', 0xFF, 0xFE, b'!'];
        let text = extract_text(&bytes, DocumentKind::PlainText).unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn garbage_bytes_are_not_a_pdf() {
        let err = extract_text(b"definitely not a pdf", DocumentKind::Pdf).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
