//! Plain text converter - renders HTML as readable plain text
//!
//! This module holds the formatting policy that turns an HTML event stream
//! into the plain text alternative of an email. It is a single forward pass
//! over the events produced by [`crate::tokenizer`], with a small amount of
//! explicit state per conversion.
//!
//! # Formatting Rules
//!
//! Each element name is looked up in the configured
//! [`TagClassification`](crate::options::TagClassification):
//!
//! - **ignored** elements (`head`, `style`, `title`, ...) drop the text directly
//!   inside them
//! - **newline-before** elements (`p`, `div`, `li`, headings, `br`) emit `\n`
//!   when they open
//! - **newline-after** elements (`p`, `div`, `td`, headings) emit `\n` after
//!   each text run directly inside them
//! - **stroke** elements (`tr`) are framed by a horizontal rule; an empty row
//!   leaves no rule behind and two rows never produce two rules in a row
//!
//! Text runs lose their embedded newlines (templates are hard-wrapped), text
//! directly inside `<li>` is prefixed with `"  * "`, and every `<a href>`
//! records a footnote. Each `</a>` appends the marker `[n]` of the most
//! recently opened link, so an anchor without `href` that follows a link
//! repeats that link's marker. The footnotes are listed after the body.
//!
//! # The Current Tag
//!
//! Text is attributed to the most recently opened element that has not been
//! closed yet *by name*, tracked in a single field rather than a stack. Once
//! an element closes, text that follows is attributed to no element at all,
//! even when an outer element is still open:
//!
//! ```rust
//! use html_plaintext::PlainTextConverter;
//!
//! let converter = PlainTextConverter::new();
//! // "tail" follows </b>, so it is not treated as list item text
//! let text = converter.convert("<ul><li><b>Bold</b> tail</li></ul>").unwrap();
//! assert_eq!(text, "\nBold tail");
//! ```
//!
//! The same shallow attribution decides whether text is ignored: text inside
//! a `<span>` nested in an ignored element is kept.
//!
//! # Example
//!
//! ```rust
//! use html_plaintext::PlainTextConverter;
//!
//! let converter = PlainTextConverter::new();
//! let html = r#"<h1>Welcome</h1><p>Questions?</p><a href="https://example.com/faq">Read the FAQ</a>"#;
//! let text = converter.convert(html).expect("conversion succeeds");
//! assert_eq!(
//!     text,
//!     "\nWelcome\n\nQuestions?\nRead the FAQ[1]\n\n[1]: https://example.com/faq\n"
//! );
//! ```

use std::fmt::Write;
use std::io::Read;
use std::time::{Duration, Instant};

use crate::charset::decode_html;
use crate::error::ConversionError;
use crate::options::ConverterOptions;
use crate::tokenizer::{HtmlEvent, tokenize_with_context};

/// Element whose `href` becomes a footnote
const LINK_TAG: &str = "a";
/// Element whose text is rendered as a bullet
const LIST_ITEM_TAG: &str = "li";
/// Element that ends the current line
const BREAK_TAG: &str = "br";
/// Prefix for list item text
const BULLET: &str = "  * ";

/// Number of events between two deadline checks
const CHECKPOINT_INTERVAL: u32 = 100;

/// Conversion context for tracking a caller-imposed deadline
///
/// The deadline is cooperative: it is checked before conversion starts and
/// then every 100 events, so a conversion can run slightly past it before
/// stopping with [`ConversionError::Timeout`].
///
/// ```rust
/// use std::time::Duration;
/// use html_plaintext::converter::ConversionContext;
///
/// // No deadline
/// let ctx = ConversionContext::new(Duration::ZERO);
/// assert!(ctx.check_timeout().is_ok());
/// ```
#[derive(Debug)]
pub struct ConversionContext {
    /// Start time of conversion
    start_time: Instant,
    /// Timeout duration (zero means no timeout)
    timeout: Duration,
    /// Number of events processed
    event_count: u32,
}

impl ConversionContext {
    /// Create a context that expires `timeout` after now
    ///
    /// `Duration::ZERO` disables the deadline.
    pub fn new(timeout: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            timeout,
            event_count: 0,
        }
    }

    /// Fail with `ConversionError::Timeout` once the deadline has passed
    pub fn check_timeout(&self) -> Result<(), ConversionError> {
        if self.timeout.is_zero() {
            return Ok(());
        }

        if self.start_time.elapsed() > self.timeout {
            return Err(ConversionError::Timeout);
        }

        Ok(())
    }

    /// Count one event and check the deadline at every checkpoint
    pub fn increment_and_check(&mut self) -> Result<(), ConversionError> {
        self.event_count += 1;

        if self.event_count.is_multiple_of(CHECKPOINT_INTERVAL) {
            self.check_timeout()?;
        }

        Ok(())
    }

    /// Time elapsed since the context was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Number of events processed so far
    pub fn event_count(&self) -> u32 {
        self.event_count
    }
}

/// A hyperlink target collected during conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// 1-based footnote number, in document order
    pub index: usize,
    /// Raw `href` value
    pub href: String,
}

/// Mutable state of a single conversion
struct ConversionState<'a> {
    options: &'a ConverterOptions,
    text: String,
    links: Vec<Link>,
    current_tag: Option<String>,
}

impl<'a> ConversionState<'a> {
    fn new(options: &'a ConverterOptions) -> Self {
        Self {
            options,
            text: String::with_capacity(1024),
            links: Vec::new(),
            current_tag: None,
        }
    }

    fn ends_with_stroke(&self) -> bool {
        self.text.ends_with(&self.options.stroke_text)
    }

    fn handle_event(&mut self, event: &HtmlEvent) {
        match event {
            HtmlEvent::StartTag { name, .. } => self.start_tag(name, event.attr("href")),
            HtmlEvent::Text { content } => self.text_run(content),
            HtmlEvent::EndTag { name } => self.end_tag(name),
        }
    }

    fn start_tag(&mut self, name: &str, href: Option<&str>) {
        let tags = &self.options.tags;
        let stroke = self.options.stroke_text.as_str();
        if tags.newline_before.contains(name) {
            self.text.push('\n');
        }
        if tags.stroke_before.contains(name) && !self.text.ends_with(stroke) {
            self.text.push_str(stroke);
        }
        if let (LINK_TAG, Some(href)) = (name, href) {
            self.links.push(Link {
                index: self.links.len() + 1,
                href: href.to_string(),
            });
        }
        self.current_tag = Some(name.to_string());
    }

    fn text_run(&mut self, content: &str) {
        let current = self.current_tag.as_deref();
        if current.is_some_and(|tag| self.options.tags.ignored.contains(tag)) {
            return;
        }

        let text = content.replace('\n', "");
        if text.is_empty() {
            return;
        }
        if current == Some(LIST_ITEM_TAG) {
            self.text.push_str(BULLET);
        }
        self.text.push_str(&text);
        if current.is_some_and(|tag| self.options.tags.newline_after.contains(tag)) {
            self.text.push('\n');
        }
    }

    fn end_tag(&mut self, name: &str) {
        if self.options.tags.stroke_after.contains(name) {
            if self.ends_with_stroke() {
                // Nothing since the opening stroke: drop it
                let keep = self.text.len() - self.options.stroke_text.len();
                self.text.truncate(keep);
            } else {
                if !self.text.ends_with('\n') {
                    self.text.push('\n');
                }
                self.text.push_str(&self.options.stroke_text);
            }
        }

        if name == LINK_TAG {
            // Always the latest link, whichever anchor is closing
            if let Some(link) = self.links.last() {
                self.text.push_str(&format!("[{}]", link.index));
            }
        } else if name == BREAK_TAG && !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }

        if self.current_tag.as_deref() == Some(name) {
            self.current_tag = None;
        }
    }

    fn finish(mut self) -> String {
        let trimmed = self.text.trim_end().len();
        self.text.truncate(trimmed);

        if !self.links.is_empty() {
            self.text.push_str("\n\n");
            for link in &self.links {
                let _ = writeln!(self.text, "[{}]: {}", link.index, link.href);
            }
        }

        self.text
    }
}

/// HTML to plain text converter
///
/// Holds immutable options and no per-call state, so one converter can be
/// shared across threads and reused for any number of conversions.
///
/// ```rust
/// use html_plaintext::PlainTextConverter;
/// use html_plaintext::options::ConverterOptions;
///
/// let converter = PlainTextConverter::with_options(
///     ConverterOptions::default().with_stroke_text("=====\n"),
/// );
/// let text = converter.convert("<table><tr><td>Total</td></tr></table>").unwrap();
/// assert_eq!(text, "=====\nTotal\n=====");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlainTextConverter {
    options: ConverterOptions,
}

impl PlainTextConverter {
    /// Create a converter with the default tag classification
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a converter with custom options
    pub fn with_options(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// Options this converter was built with
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Convert an HTML document or fragment to plain text
    ///
    /// # Errors
    ///
    /// Only fails when the input exceeds the configured `max_input_bytes`.
    /// Malformed markup is never an error.
    pub fn convert(&self, html: &str) -> Result<String, ConversionError> {
        let mut ctx = ConversionContext::new(Duration::ZERO);
        self.convert_with_context(html, &mut ctx)
    }

    /// Convert with a caller-supplied deadline
    ///
    /// The deadline bounds both passes: tokenizing checks it between input
    /// chunks, formatting every 100 events.
    ///
    /// # Errors
    ///
    /// - `ConversionError::Timeout` once the context's deadline passes
    /// - `ConversionError::InvalidInput` if the input is over the size limit
    pub fn convert_with_context(
        &self,
        html: &str,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        self.check_size(html.len())?;
        self.convert_unchecked(html, ctx)
    }

    /// Tokenize and render without the size check
    fn convert_unchecked(
        &self,
        html: &str,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        ctx.check_timeout()?;
        let events = tokenize_with_context(html, ctx)?;
        self.render_events(&events, ctx)
    }

    /// Convert raw bytes, detecting their charset first
    ///
    /// `content_type` is an optional Content-Type header value whose `charset`
    /// parameter takes priority over meta tags in the document. The size
    /// limit applies to the raw bytes, before decoding.
    ///
    /// # Errors
    ///
    /// - `ConversionError::ParseError` if the bytes are not text in the
    ///   detected charset
    /// - `ConversionError::EncodingError` if the charset label is unknown
    /// - `ConversionError::InvalidInput` if the input is over the size limit
    pub fn convert_bytes(
        &self,
        html: &[u8],
        content_type: Option<&str>,
    ) -> Result<String, ConversionError> {
        self.check_size(html.len())?;
        let html = decode_html(html, content_type)?;
        self.convert_unchecked(&html, &mut ConversionContext::new(Duration::ZERO))
    }

    /// Read `reader` to the end and convert its contents
    ///
    /// # Errors
    ///
    /// Same as [`convert_bytes`](Self::convert_bytes), plus
    /// `ConversionError::Io` if reading fails.
    pub fn convert_reader<R: Read>(
        &self,
        mut reader: R,
        content_type: Option<&str>,
    ) -> Result<String, ConversionError> {
        let mut html = Vec::new();
        reader.read_to_end(&mut html)?;
        self.convert_bytes(&html, content_type)
    }

    /// Apply the formatting rules to an already tokenized event stream
    ///
    /// The events are expected to be balanced, as produced by
    /// [`tokenize`](crate::tokenizer::tokenize).
    ///
    /// # Errors
    ///
    /// `ConversionError::Timeout` once the context's deadline passes.
    pub fn render_events(
        &self,
        events: &[HtmlEvent],
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let mut state = ConversionState::new(&self.options);
        for event in events {
            ctx.increment_and_check()?;
            state.handle_event(event);
        }

        let links = state.links.len();
        let text = state.finish();
        tracing::debug!(
            events = events.len(),
            links,
            output_len = text.len(),
            "converted html to plain text"
        );
        Ok(text)
    }

    fn check_size(&self, len: usize) -> Result<(), ConversionError> {
        match self.options.max_input_bytes {
            Some(limit) if len > limit => Err(ConversionError::InvalidInput(format!(
                "input is {len} bytes, limit is {limit}"
            ))),
            _ => Ok(()),
        }
    }
}
