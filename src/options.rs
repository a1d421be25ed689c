//! Converter configuration
//!
//! The converter's behavior around each element is driven by a
//! [`TagClassification`]: five sets of lowercase tag names deciding whether
//! content is dropped, whether line breaks surround it, and where horizontal
//! strokes separate table rows.
//!
//! Options are plain data. They can be built in code or loaded from a JSON
//! document in which every field is optional:
//!
//! ```rust
//! use html_plaintext::options::ConverterOptions;
//!
//! let options = ConverterOptions::from_json_str(r#"{"stroke_text": "====\n"}"#)
//!     .expect("valid options");
//! assert_eq!(options.stroke_text, "====\n");
//! assert!(options.tags.ignored.contains("head"));
//! ```

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::error::ConversionError;

/// Elements whose direct text content is dropped
pub const DEFAULT_IGNORED: &[&str] = &["html", "head", "style", "meta", "title", "img"];

/// Elements preceded by a line break
pub const DEFAULT_NEWLINE_BEFORE: &[&str] = &[
    "br", "h1", "h2", "h3", "h4", "h5", "h6", "div", "p", "li",
];

/// Elements whose text is followed by a line break
pub const DEFAULT_NEWLINE_AFTER: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "div", "p", "td",
];

/// Elements preceded by a stroke
pub const DEFAULT_STROKE_BEFORE: &[&str] = &["tr"];

/// Elements followed by a stroke
pub const DEFAULT_STROKE_AFTER: &[&str] = &["tr"];

/// Horizontal rule used between table rows (30 dashes and a newline)
pub const DEFAULT_STROKE_TEXT: &str = "------------------------------\n";

fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|tag| tag.to_ascii_lowercase()).collect()
}

/// Assignment of element names to formatting behaviors
///
/// Names are matched against the lowercase names produced by the tokenizer.
/// An element may belong to several sets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagClassification {
    /// Text directly inside these elements never reaches the output
    pub ignored: BTreeSet<String>,
    /// A `\n` is emitted when one of these elements opens
    pub newline_before: BTreeSet<String>,
    /// A `\n` is emitted after each text run directly inside these elements
    pub newline_after: BTreeSet<String>,
    /// A stroke is emitted when one of these elements opens
    pub stroke_before: BTreeSet<String>,
    /// A stroke is emitted when one of these elements closes
    pub stroke_after: BTreeSet<String>,
}

impl Default for TagClassification {
    fn default() -> Self {
        Self {
            ignored: tag_set(DEFAULT_IGNORED),
            newline_before: tag_set(DEFAULT_NEWLINE_BEFORE),
            newline_after: tag_set(DEFAULT_NEWLINE_AFTER),
            stroke_before: tag_set(DEFAULT_STROKE_BEFORE),
            stroke_after: tag_set(DEFAULT_STROKE_AFTER),
        }
    }
}

impl TagClassification {
    /// Classification with every set empty
    pub fn empty() -> Self {
        Self {
            ignored: BTreeSet::new(),
            newline_before: BTreeSet::new(),
            newline_after: BTreeSet::new(),
            stroke_before: BTreeSet::new(),
            stroke_after: BTreeSet::new(),
        }
    }

    /// Lowercase every configured name so lookups match tokenizer output
    fn normalized(self) -> Self {
        let lower = |set: BTreeSet<String>| -> BTreeSet<String> {
            set.into_iter().map(|tag| tag.to_ascii_lowercase()).collect()
        };
        Self {
            ignored: lower(self.ignored),
            newline_before: lower(self.newline_before),
            newline_after: lower(self.newline_after),
            stroke_before: lower(self.stroke_before),
            stroke_after: lower(self.stroke_after),
        }
    }
}

/// Conversion options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterOptions {
    /// Formatting behavior per element
    pub tags: TagClassification,
    /// Literal emitted as the row separator
    pub stroke_text: String,
    /// Reject inputs larger than this many bytes (`None` means unlimited)
    pub max_input_bytes: Option<usize>,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            tags: TagClassification::default(),
            stroke_text: DEFAULT_STROKE_TEXT.to_string(),
            max_input_bytes: None,
        }
    }
}

impl ConverterOptions {
    /// Parse options from a JSON document
    ///
    /// Missing fields (at any level) keep their defaults. Unknown fields are
    /// rejected so that misspelled set names do not go unnoticed.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::Config` when the document is not valid JSON
    /// or does not match the options schema.
    pub fn from_json_str(json: &str) -> Result<Self, ConversionError> {
        let options: ConverterOptions = serde_json::from_str(json)
            .map_err(|e| ConversionError::Config(format!("invalid options document: {e}")))?;
        Ok(options.normalized())
    }

    /// Replace the tag classification
    pub fn with_tags(mut self, tags: TagClassification) -> Self {
        self.tags = tags.normalized();
        self
    }

    /// Replace the stroke literal
    pub fn with_stroke_text(mut self, stroke_text: impl Into<String>) -> Self {
        self.stroke_text = stroke_text.into();
        self
    }

    /// Limit the accepted input size
    pub fn with_max_input_bytes(mut self, limit: usize) -> Self {
        self.max_input_bytes = Some(limit);
        self
    }

    fn normalized(mut self) -> Self {
        self.tags = self.tags.normalized();
        self
    }
}
