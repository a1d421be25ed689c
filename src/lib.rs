//! HTML to plain text conversion for email bodies
//!
//! Email templates are authored and rendered as HTML, but a well-behaved
//! message also carries a `text/plain` alternative. This library derives that
//! alternative from the rendered HTML: block elements become line breaks,
//! list items become bullets, table rows are separated by horizontal strokes
//! and links turn into numbered footnotes.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `tokenizer`: balanced HTML event stream using the html5ever tokenizer
//! - `converter`: plain text formatting rules applied to the event stream
//! - `options`: tag classification and converter configuration
//! - `charset`: character encoding detection for byte input
//! - `mail`: `multipart/alternative` email composition
//!
//! # Example
//!
//! ```rust
//! use html_plaintext::PlainTextConverter;
//!
//! let converter = PlainTextConverter::new();
//! let text = converter
//!     .convert("<ul><li>A</li><li>B</li></ul>")
//!     .expect("conversion succeeds");
//! assert_eq!(text, "\n  * A\n  * B");
//! ```

pub mod charset;
pub mod converter;
pub mod error;
pub mod mail;
pub mod options;
pub mod tokenizer;

// Re-export main types for convenience
pub use converter::{ConversionContext, Link, PlainTextConverter};
pub use error::ConversionError;
pub use mail::AlternativeEmail;
pub use options::{ConverterOptions, TagClassification};
pub use tokenizer::{HtmlEvent, tokenize, tokenize_with_context};

/// Convert `html` with the default options
///
/// # Errors
///
/// See [`PlainTextConverter::convert`].
pub fn html_to_plain_text(html: &str) -> Result<String, ConversionError> {
    PlainTextConverter::new().convert(html)
}
