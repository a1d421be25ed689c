//! Character encoding detection and decoding of byte input
//!
//! Rendered templates usually arrive as `&str`, but callers handing over raw
//! bytes (a file, a stored response body) need them decoded first. The
//! charset is chosen by a three-level cascade:
//!
//! 1. **Content-Type**: a `charset` parameter on the supplied header value
//! 2. **Meta tags**: `<meta charset>` or `<meta http-equiv ... content="...; charset=...">`
//!    within the first 1024 bytes
//! 3. **Default**: UTF-8
//!
//! ```rust
//! use html_plaintext::charset::{decode_html, detect_charset};
//!
//! assert_eq!(detect_charset(Some("text/html; charset=latin1"), b""), "LATIN1");
//! assert_eq!(detect_charset(None, b"<p>plain</p>"), "UTF-8");
//!
//! let text = decode_html(b"<p>Caf\xE9</p>", Some("text/html; charset=ISO-8859-1"))
//!     .expect("valid latin-1");
//! assert_eq!(text, "<p>Café</p>");
//! ```

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::ConversionError;

/// Charset used when neither header nor markup names one
const DEFAULT_CHARSET: &str = "UTF-8";

/// Meta declarations are only honored near the top of the document
const META_SCAN_LIMIT: usize = 1024;

fn content_type_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"';,\s]+)"#).ok())
        .as_ref()
}

fn meta_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| {
            Regex::new(r#"(?i)<meta\b[^>]*?\bcharset\s*=\s*["']?([A-Za-z0-9_.:\-]+)"#).ok()
        })
        .as_ref()
}

/// Detect the charset of `html`, returning an uppercase label
pub fn detect_charset(content_type: Option<&str>, html: &[u8]) -> String {
    content_type
        .and_then(extract_charset_from_content_type)
        .or_else(|| extract_charset_from_html(html))
        .map(|label| label.to_ascii_uppercase())
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// Extract the `charset` parameter from a Content-Type header value
///
/// ```rust
/// use html_plaintext::charset::extract_charset_from_content_type;
///
/// assert_eq!(
///     extract_charset_from_content_type("text/html; charset=\"utf-8\""),
///     Some("utf-8".to_string())
/// );
/// assert_eq!(extract_charset_from_content_type("text/html"), None);
/// ```
pub fn extract_charset_from_content_type(content_type: &str) -> Option<String> {
    content_type_regex()?
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract a charset declared by a meta tag in the head of the document
pub fn extract_charset_from_html(html: &[u8]) -> Option<String> {
    let prefix = &html[..html.len().min(META_SCAN_LIMIT)];
    // Lossy is fine here: declarations are ASCII
    let prefix = String::from_utf8_lossy(prefix);

    meta_regex()?
        .captures(&prefix)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode `html` to UTF-8 using the detected charset
///
/// # Errors
///
/// - `ConversionError::EncodingError` if the detected label is unknown
/// - `ConversionError::ParseError` if the bytes are not valid in that charset
pub fn decode_html<'a>(
    html: &'a [u8],
    content_type: Option<&str>,
) -> Result<Cow<'a, str>, ConversionError> {
    let label = detect_charset(content_type, html);
    let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        ConversionError::EncodingError(format!("Unsupported charset '{label}'"))
    })?;

    if encoding == UTF_8 {
        return std::str::from_utf8(html).map(Cow::Borrowed).map_err(|e| {
            ConversionError::ParseError(format!(
                "input is not valid UTF-8 at byte {}",
                e.valid_up_to()
            ))
        });
    }

    tracing::debug!(charset = encoding.name(), "transcoding input to UTF-8");
    encoding
        .decode_without_bom_handling_and_without_replacement(html)
        .ok_or_else(|| {
            ConversionError::ParseError(format!(
                "input is not valid {} text",
                encoding.name()
            ))
        })
}
