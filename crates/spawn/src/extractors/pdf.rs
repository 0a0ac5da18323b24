//! PDF metadata extractor.
//!
//! Reads the page tree, document-information dictionary, an optional text
//! sample from the first few pages, form-field declarations, and an image
//! presence check. Anything that goes wrong ends up in an `error` field
//! rather than failing the document.

use crate::document::Fragment;
use crate::registry::MetadataExtractor;
use crate::{Result, SpawnError};
use lopdf::{Dictionary, Document, Object};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, error};

const DEFAULT_MAX_PAGES_TO_EXTRACT: usize = 5;
const TEXT_PREVIEW_LIMIT: usize = 10_000;
const IMAGE_CHECK_PAGES: usize = 3;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("static regex"));

/// Extract metadata from PDF files.
pub struct PdfExtractor {
    extract_text: bool,
    max_pages_to_extract: usize,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            extract_text: true,
            max_pages_to_extract: DEFAULT_MAX_PAGES_TO_EXTRACT,
        }
    }

    /// Control text sampling.
    pub fn with_text_extraction(extract_text: bool, max_pages_to_extract: usize) -> Self {
        Self {
            extract_text,
            max_pages_to_extract,
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf-extractor"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[".pdf"]
    }

    fn supported_mime_prefixes(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn extract(&self, path: &Path) -> Result<Fragment> {
        let mut fragment = Fragment::new();

        if let Err(e) = self.extract_impl(path, &mut fragment) {
            error!(path = %path.display(), error = %e, "error extracting PDF metadata");
            fragment.insert("error".to_string(), json!(e.to_string()));
        }

        Ok(fragment)
    }
}

impl PdfExtractor {
    fn extract_impl(&self, path: &Path, fragment: &mut Fragment) -> Result<()> {
        let doc = Document::load(path)
            .map_err(|e| SpawnError::parsing_with_source(format!("Failed to load PDF: {}", e), e))?;

        let pages = doc.get_pages();
        fragment.insert("page_count".to_string(), json!(pages.len()));

        if let Some(info) = document_info(&doc) {
            for (field, key) in [
                (b"Title".as_slice(), "title"),
                (b"Author".as_slice(), "author"),
                (b"Subject".as_slice(), "subject"),
                (b"Keywords".as_slice(), "keywords"),
                (b"Producer".as_slice(), "producer"),
                (b"Creator".as_slice(), "creator"),
            ] {
                if let Some(value) = info_string(&doc, info, field) {
                    if !value.is_empty() {
                        fragment.insert(key.to_string(), json!(value));
                    }
                }
            }

            if let Some(date) = info_string(&doc, info, b"CreationDate").and_then(|d| parse_pdf_date(&d)) {
                fragment.insert("creation_date".to_string(), json!(date));
            }
            if let Some(date) = info_string(&doc, info, b"ModDate").and_then(|d| parse_pdf_date(&d)) {
                fragment.insert("modification_date".to_string(), json!(date));
            }
        }

        if self.extract_text {
            let mut text = String::new();
            for page_number in pages.keys().take(self.max_pages_to_extract) {
                match doc.extract_text(&[*page_number]) {
                    Ok(page_text) => {
                        text.push_str(&page_text);
                        text.push_str("\n\n");
                    }
                    Err(e) => {
                        debug!(page = page_number, error = %e, "error extracting text from page");
                    }
                }
            }

            if !text.trim().is_empty() {
                let preview: String = if text.chars().count() > TEXT_PREVIEW_LIMIT {
                    let mut capped: String = text.chars().take(TEXT_PREVIEW_LIMIT).collect();
                    capped.push_str("...");
                    capped
                } else {
                    text.clone()
                };
                fragment.insert("text_preview".to_string(), json!(preview));
                fragment.insert(
                    "word_count".to_string(),
                    json!(WORD_RE.find_iter(&text).count()),
                );
                fragment.insert("char_count".to_string(), json!(text.chars().count()));
            }
        }

        let form_fields = extract_form_fields(&doc);
        if !form_fields.is_empty() {
            fragment.insert("form_fields".to_string(), json!(form_fields));
            fragment.insert("is_form".to_string(), json!(true));
        }

        fragment.insert("is_encrypted".to_string(), json!(doc.is_encrypted()));

        let has_images = pages
            .values()
            .take(IMAGE_CHECK_PAGES)
            .any(|page_id| page_has_xobjects(&doc, *page_id));
        fragment.insert("has_images".to_string(), json!(has_images));

        Ok(())
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn document_info(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    resolve(doc, info)?.as_dict().ok()
}

fn info_string(doc: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let object = resolve(doc, info.get(key).ok()?)?;
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(bytes) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE when the BOM says so, otherwise treat as
/// (mostly Latin-1 compatible) PDFDocEncoding.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    }
    .trim_matches('\0')
    .to_string()
}

/// Parse the PDF date format `D:YYYYMMDDHHmmSS[...]` into ISO-8601.
///
/// The timezone suffix is currently ignored.
fn parse_pdf_date(date_string: &str) -> Option<String> {
    let digits = date_string.strip_prefix("D:").unwrap_or(date_string);
    if digits.len() < 14 || !digits.as_bytes()[..14].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    let hour: u32 = digits[8..10].parse().ok()?;
    let minute: u32 = digits[10..12].parse().ok()?;
    let second: u32 = digits[12..14].parse().ok()?;

    let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    let datetime = date.and_hms_opt(hour, minute, second)?;
    Some(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn extract_form_fields(doc: &Document) -> Vec<Value> {
    let mut fields = Vec::new();

    let Ok(catalog) = doc.catalog() else {
        return fields;
    };
    let Some(acro_form) = catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return fields;
    };
    let Some(field_refs) = acro_form
        .get(b"Fields")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
    else {
        return fields;
    };

    for field_ref in field_refs {
        let Some(field_dict) = resolve(doc, field_ref).and_then(|obj| obj.as_dict().ok()) else {
            continue;
        };
        let name = field_dict
            .get(b"T")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| match obj {
                Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                _ => None,
            })
            .unwrap_or_default();
        let field_type = field_dict
            .get(b"FT")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| match obj {
                Object::Name(bytes) => Some(decode_pdf_string(bytes)),
                _ => None,
            })
            .unwrap_or_else(|| "unknown".to_string());

        fields.push(json!({"name": name, "type": field_type}));
    }

    fields
}

fn page_has_xobjects(doc: &Document, page_id: (u32, u16)) -> bool {
    let Some(page_dict) = doc.get_object(page_id).ok().and_then(|obj| obj.as_dict().ok()) else {
        return false;
    };
    let Some(resources) = page_dict
        .get(b"Resources")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return false;
    };

    resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .map(|xobjects| !xobjects.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pdf_date() {
        assert_eq!(
            parse_pdf_date("D:20201231235959+00'00'").as_deref(),
            Some("2020-12-31T23:59:59")
        );
        assert_eq!(
            parse_pdf_date("20230115123045").as_deref(),
            Some("2023-01-15T12:30:45")
        );
    }

    #[test]
    fn test_parse_pdf_date_rejects_short_or_garbage() {
        assert_eq!(parse_pdf_date("D:2023"), None);
        assert_eq!(parse_pdf_date("not a date at all"), None);
        // Month 13 is not a date.
        assert_eq!(parse_pdf_date("D:20231315123045"), None);
    }

    #[test]
    fn test_decode_pdf_string_utf16() {
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_pdf_string_plain() {
        assert_eq!(decode_pdf_string(b"Report"), "Report");
    }

    #[test]
    fn test_unreadable_pdf_reports_error_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 definitely truncated").unwrap();

        let fragment = PdfExtractor::new().extract(&path).unwrap();
        assert!(fragment.get("error").is_some());
    }

    #[test]
    fn test_minimal_pdf_document() {
        // lopdf can author a document as well as read one; build a one-page
        // PDF in memory and run the extractor over it.
        use lopdf::dictionary;
        use lopdf::{Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = lopdf::content::Content {
            operations: vec![
                lopdf::content::Operation::new("BT", vec![]),
                lopdf::content::Operation::new("Tf", vec!["F1".into(), 24.into()]),
                lopdf::content::Operation::new("Td", vec![100.into(), 600.into()]),
                lopdf::content::Operation::new("Tj", vec![Object::string_literal("Hello crawler")]),
                lopdf::content::Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one_page.pdf");
        doc.save(&path).unwrap();

        let fragment = PdfExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["page_count"], 1);
        assert_eq!(fragment["is_encrypted"], false);
        assert_eq!(fragment["has_images"], false);
        assert!(fragment.get("error").is_none());
        assert!(fragment["text_preview"]
            .as_str()
            .unwrap()
            .contains("Hello crawler"));
    }
}
