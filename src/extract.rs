//! Text extraction from uploaded files.
//!
//! Single capability boundary for raw file decoding: bytes plus a declared
//! type in, plain text out. Anything outside the allow-list (txt, json,
//! pdf, docx) is rejected with `UNSUPPORTED_FORMAT`.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::errors::ApiError;

pub const ALLOWED_TYPES: [&str; 4] = ["txt", "json", "pdf", "docx"];

pub fn extract(bytes: &[u8], declared_type: &str) -> Result<String, ApiError> {
    match declared_type {
        "txt" => decode_utf8(bytes),
        "json" => extract_json(bytes),
        "pdf" => extract_pdf(bytes),
        "docx" => extract_docx(bytes),
        other => Err(ApiError::validation(
            "UNSUPPORTED_FORMAT",
            format!(
                "file type '{}' not allowed; allowed: {}",
                other,
                ALLOWED_TYPES.join(", ")
            ),
        )),
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String, ApiError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        ApiError::validation("INVALID_ENCODING", "file is not valid UTF-8 text")
    })
}

fn extract_json(bytes: &[u8]) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ApiError::validation("EXTRACTION_FAILED", format!("invalid JSON: {}", e)))?;
    Ok(flatten_json(&value))
}

/// Renders nested JSON as "key: value" lines so object structure survives
/// chunking as readable text.
fn flatten_json(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, val)| format!("{}: {}", key, flatten_json(val)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items
            .iter()
            .map(flatten_json)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ApiError> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| ApiError::validation("EXTRACTION_FAILED", format!("pdf parse error: {}", e)))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document.extract_text(&[page_no]).map_err(|e| {
            ApiError::validation(
                "EXTRACTION_FAILED",
                format!("pdf text extraction failed on page {}: {}", page_no, e),
            )
        })?;
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    Ok(pages.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ApiError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ApiError::validation("EXTRACTION_FAILED", format!("docx open error: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| {
            ApiError::validation("EXTRACTION_FAILED", format!("docx missing document.xml: {}", e))
        })?
        .read_to_string(&mut xml)
        .map_err(|e| ApiError::validation("EXTRACTION_FAILED", format!("docx read error: {}", e)))?;

    // Paragraph ends become newlines before tags are stripped, so paragraph
    // structure survives as line breaks.
    let with_breaks = xml.replace("</w:p>", "\n");
    let stripped = tag_regex().replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'");

    let lines: Vec<&str> = decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    Ok(lines.join("\n"))
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}
