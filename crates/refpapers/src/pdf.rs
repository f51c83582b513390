//! Built-in PDF reading with `lopdf`.
//!
//! Used for full text when the extractor of an ending is set to
//! [`BUILTIN_EXTRACTOR`](crate::extract::BUILTIN_EXTRACTOR), and to show the
//! embedded title and author when renaming a file.

use lopdf::{Dictionary, Document};

use super::*;

/// Document information embedded in a PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfMetadata {
  /// `/Title` entry
  pub title:  Option<String>,
  /// `/Author` entry
  pub author: Option<String>,
}

/// Reads text and metadata from PDF files.
#[derive(Debug, Default)]
pub struct PdfAnalyzer;

impl PdfAnalyzer {
  /// Creates an analyzer.
  pub fn new() -> Self { Self }

  /// Text of all pages, in page order.
  pub fn extract_text(&self, path: impl AsRef<Path>) -> Result<String> {
    let doc = Document::load(path.as_ref())?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    Ok(doc.extract_text(&pages)?)
  }

  /// The document information dictionary, empty if the PDF has none.
  pub fn metadata(&self, path: impl AsRef<Path>) -> Result<PdfMetadata> {
    let doc = Document::load(path.as_ref())?;
    let Some(reference) = doc.trailer.get(b"Info").ok().and_then(|o| o.as_reference().ok()) else {
      return Ok(PdfMetadata::default());
    };
    let info = doc.get_object(reference).and_then(|obj| obj.as_dict())?;
    Ok(PdfMetadata { title: text_entry(info, "Title"), author: text_entry(info, "Author") })
  }
}

/// Decodes a PDF text string, which is either UTF-16BE with a byte order mark
/// or a single byte encoding.
fn text_entry(dict: &Dictionary, key: &str) -> Option<String> {
  let bytes = dict.get(key.as_bytes()).ok()?.as_str().ok()?;
  let text = match bytes.strip_prefix(&[0xFE, 0xFF]) {
    Some(utf16) => {
      let units = utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
      char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)).collect()
    },
    None => String::from_utf8_lossy(bytes).into_owned(),
  };
  Some(text.trim().to_string()).filter(|text| !text.is_empty())
}
