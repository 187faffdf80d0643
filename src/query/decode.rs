//! Turning a cached body into JSON
//!
//! Bodies are stored exactly as received, so every read decompresses according to
//! `Content-Encoding`, decodes text according to the `Content-Type` charset and then
//! parses JSON.

use flate2::read::{GzDecoder, ZlibDecoder};
use serde_json::Value;
use std::borrow::Cow;
use std::io::Read;
use tracing::debug;

use super::QueryError;
use crate::cache::EntryMetadata;

/// Text encodings accepted in `Content-Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    UsAscii,
    Latin1,
}

impl Charset {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "us-ascii" | "ascii" => Some(Charset::UsAscii),
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" => Some(Charset::Latin1),
            _ => None,
        }
    }
}

/// Reverses the `Content-Encoding` of a body
pub fn decompress<'a>(body: &'a [u8], content_encoding: Option<&str>) -> Result<Cow<'a, [u8]>, QueryError> {
    let encoding = content_encoding.map(|e| e.trim().to_ascii_lowercase());
    let mut out = Vec::new();
    let read = match encoding.as_deref() {
        None | Some("") | Some("identity") => return Ok(Cow::Borrowed(body)),
        Some("gzip") | Some("x-gzip") => GzDecoder::new(body).read_to_end(&mut out),
        Some("deflate") => ZlibDecoder::new(body).read_to_end(&mut out),
        Some(other) => return Err(QueryError::UnsupportedEncoding(other.to_string())),
    };
    read.map_err(|e| QueryError::Decompress(e.to_string()))?;
    Ok(Cow::Owned(out))
}

/// Determines the charset declared by a `Content-Type` value
///
/// JSON media types default to UTF-8 (RFC 8259). Any other media type must
/// declare its charset explicitly.
pub fn charset_of(content_type: Option<&str>) -> Result<Charset, QueryError> {
    let content_type = content_type.unwrap_or("");
    let mut parts = content_type.split(';');
    let media_type = parts.next().unwrap_or("").trim().to_ascii_lowercase();

    let declared = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    });

    match declared {
        Some(label) => Charset::from_label(&label).ok_or(QueryError::UnsupportedCharset(label)),
        None if media_type == "application/json" || media_type.ends_with("+json") => {
            debug!("No charset in '{}', decoding as UTF-8 JSON", content_type);
            Ok(Charset::Utf8)
        }
        None => Err(QueryError::MissingCharset(content_type.to_string())),
    }
}

/// Decodes bytes in the given charset
pub fn decode_text(bytes: &[u8], charset: Charset) -> Result<Cow<'_, str>, QueryError> {
    match charset {
        Charset::Utf8 => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| QueryError::InvalidText(e.to_string())),
        Charset::UsAscii => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(at) => Err(QueryError::InvalidText(format!(
                "non-ASCII byte 0x{:02x} at offset {}",
                bytes[at], at
            ))),
            None => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|e| QueryError::InvalidText(e.to_string())),
        },
        Charset::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
    }
}

/// Full pipeline: decompress, decode and parse a stored body
pub fn decode_body(body: &[u8], metadata: &EntryMetadata) -> Result<Value, QueryError> {
    let raw = decompress(body, metadata.content_encoding.as_deref())?;
    let charset = charset_of(metadata.content_type.as_deref())?;
    let text = decode_text(&raw, charset)?;
    Ok(serde_json::from_str(&text)?)
}
