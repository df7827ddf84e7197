//! Document loader: uploaded bytes + declared kind -> one string of text.
//!
//! Pure and single-pass. PDFs are read with `lopdf`, page by page in page order.

use lopdf::Document;
use tracing::{debug, instrument, warn};

use crate::domain::DocumentKind;
use crate::error::QuizError;

/// Extract text from a named upload, deriving the kind from its extension.
pub fn load_named(file_name: &str, bytes: &[u8]) -> Result<String, QuizError> {
  let kind = DocumentKind::from_file_name(file_name)?;
  load_document(kind, bytes)
}

#[instrument(level = "info", skip(bytes), fields(bytes = bytes.len()))]
pub fn load_document(kind: DocumentKind, bytes: &[u8]) -> Result<String, QuizError> {
  let text = match kind {
    DocumentKind::Pdf => extract_pdf_text(bytes)?,
    DocumentKind::PlainText => decode_plain_text(bytes)?,
  };
  debug!(chars = text.chars().count(), "document text extracted");
  Ok(text)
}

fn decode_plain_text(bytes: &[u8]) -> Result<String, QuizError> {
  let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
  Ok(std::str::from_utf8(bytes)?.to_string())
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, QuizError> {
  let doc = Document::load_mem(bytes).map_err(|e| QuizError::UnsupportedFormat {
    extension: "pdf".into(),
    detail: Some(format!("not a readable PDF: {}", e)),
  })?;
  if doc.is_encrypted() {
    return Err(QuizError::UnsupportedFormat {
      extension: "pdf".into(),
      detail: Some("encrypted PDFs are not supported".into()),
    });
  }

  let mut text = String::new();
  // get_pages() is a BTreeMap keyed by page number, so iteration is page order.
  for page_num in doc.get_pages().into_keys() {
    match doc.extract_text(&[page_num]) {
      Ok(page_text) => text.push_str(&page_text),
      // Image-only or oddly encoded pages contribute nothing.
      Err(e) => warn!(page = page_num, error = %e, "could not extract text from PDF page"),
    }
  }
  Ok(text)
}
