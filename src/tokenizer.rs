//! HTML event stream built on the html5ever tokenizer
//!
//! The converter does not need a DOM. It consumes a flat, document-ordered
//! stream of [`HtmlEvent`]s. This module drives html5ever's tokenizer (not its
//! tree builder, which would silently move or drop elements such as `<tr>`
//! outside a `<table>`) and turns its tokens into that stream.
//!
//! # Normalization
//!
//! The raw token stream is cleaned up on the fly so the converter always sees
//! balanced markup:
//!
//! - consecutive character tokens are merged into one `Text` event per text
//!   run; comments and doctypes emit nothing but still end a run
//! - void elements (`<br>`, `<img>`, ...) and self-closing tags (`<div/>`) emit
//!   a `StartTag` immediately followed by the matching `EndTag`
//! - an end tag with no open element of that name is dropped, and the text
//!   on either side of it stays one run
//! - an end tag for an element deeper in the open stack first closes every
//!   element opened after it
//! - elements still open at end of input are closed, innermost first
//!
//! Character references in text and attribute values are decoded by the
//! tokenizer. `script` and `style` bodies are read as raw text, `title` and
//! `textarea` as RCDATA.
//!
//! ```rust
//! use html_plaintext::tokenizer::{tokenize, HtmlEvent};
//!
//! let events = tokenize("<p>a &amp; b<br></p>");
//! assert_eq!(events.len(), 5);
//! assert_eq!(events[1], HtmlEvent::text("a & b"));
//! assert_eq!(events[3], HtmlEvent::end("br"));
//! ```

use std::cell::RefCell;
use std::time::Duration;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::converter::ConversionContext;
use crate::error::ConversionError;

/// Bytes of input fed to the tokenizer between two deadline checks
pub const TOKENIZE_CHUNK_BYTES: usize = 16 * 1024;

/// Elements that never have content or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// One step of the document in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlEvent {
    /// An element opened
    StartTag {
        /// Lowercase element name
        name: String,
        /// Attributes in source order, values already entity-decoded
        attrs: Vec<(String, String)>,
    },
    /// A run of character data between two tags
    Text {
        /// Decoded text, source newlines preserved
        content: String,
    },
    /// An element closed
    EndTag {
        /// Lowercase element name
        name: String,
    },
}

impl HtmlEvent {
    /// Start tag without attributes
    pub fn start(name: &str) -> Self {
        HtmlEvent::StartTag {
            name: name.to_string(),
            attrs: Vec::new(),
        }
    }

    /// Text run
    pub fn text(content: &str) -> Self {
        HtmlEvent::Text {
            content: content.to_string(),
        }
    }

    /// End tag
    pub fn end(name: &str) -> Self {
        HtmlEvent::EndTag {
            name: name.to_string(),
        }
    }

    /// Value of the first attribute called `name`, if this is a start tag
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            HtmlEvent::StartTag { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn raw_kind_for(name: &str) -> Option<RawKind> {
    match name {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Token sink collecting balanced events
///
/// html5ever hands tokens to the sink through `&self`, so the mutable parts
/// live in `RefCell`s. A sink is used by exactly one tokenizer.
#[derive(Default)]
struct EventSink {
    events: RefCell<Vec<HtmlEvent>>,
    pending_text: RefCell<String>,
    open: RefCell<Vec<String>>,
}

impl EventSink {
    fn push(&self, event: HtmlEvent) {
        self.events.borrow_mut().push(event);
    }

    fn flush_text(&self) {
        let content = std::mem::take(&mut *self.pending_text.borrow_mut());
        if !content.is_empty() {
            self.push(HtmlEvent::Text { content });
        }
    }

    fn start_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        self.flush_text();
        let name = tag.name.to_string();
        let attrs = tag
            .attrs
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        self.push(HtmlEvent::StartTag {
            name: name.clone(),
            attrs,
        });

        if tag.self_closing || is_void(&name) {
            self.push(HtmlEvent::EndTag { name });
            return TokenSinkResult::Continue;
        }

        let raw = raw_kind_for(&name);
        self.open.borrow_mut().push(name);
        match raw {
            Some(kind) => TokenSinkResult::RawData(kind),
            None => TokenSinkResult::Continue,
        }
    }

    fn end_tag(&self, tag: Tag) {
        let name = &*tag.name;
        if is_void(name) {
            // Already closed when it opened
            return;
        }

        let mut open = self.open.borrow_mut();
        match open.iter().rposition(|candidate| candidate == name) {
            Some(position) => {
                let closed: Vec<String> = open.drain(position..).rev().collect();
                drop(open);
                self.flush_text();
                if closed.len() > 1 {
                    tracing::trace!(
                        tag = name,
                        implicit = closed.len() - 1,
                        "closing nested elements"
                    );
                }
                for name in closed {
                    self.push(HtmlEvent::EndTag { name });
                }
            }
            None => {
                tracing::debug!(tag = name, "dropping end tag without open element");
            }
        }
    }

    fn finish(&self) {
        self.flush_text();
        let remaining: Vec<String> = self.open.borrow_mut().drain(..).rev().collect();
        for name in remaining {
            self.push(HtmlEvent::EndTag { name });
        }
    }
}

impl TokenSink for EventSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => {
                self.pending_text.borrow_mut().push_str(&text);
            }
            Token::TagToken(tag) => {
                return match tag.kind {
                    TagKind::StartTag => self.start_tag(tag),
                    TagKind::EndTag => {
                        self.end_tag(tag);
                        TokenSinkResult::Continue
                    }
                };
            }
            Token::CommentToken(_) | Token::DoctypeToken(_) => self.flush_text(),
            Token::EOFToken => self.finish(),
            Token::ParseError(message) => {
                tracing::trace!(%message, "tolerated tokenizer error");
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Tokenize `html` into a balanced event stream
///
/// Never fails: any string is accepted and malformed markup is normalized as
/// described in the module documentation.
pub fn tokenize(html: &str) -> Vec<HtmlEvent> {
    // A context without deadline never expires
    tokenize_with_context(html, &ConversionContext::new(Duration::ZERO)).unwrap_or_default()
}

/// Tokenize `html`, checking `ctx`'s deadline between input chunks
///
/// The input is fed to the tokenizer in chunks of
/// [`TOKENIZE_CHUNK_BYTES`], so a long document stops shortly after the
/// deadline instead of being tokenized to the end first.
///
/// # Errors
///
/// `ConversionError::Timeout` once the context's deadline passes.
pub fn tokenize_with_context(
    html: &str,
    ctx: &ConversionContext,
) -> Result<Vec<HtmlEvent>, ConversionError> {
    let tokenizer = Tokenizer::new(EventSink::default(), TokenizerOpts::default());
    let queue = BufferQueue::default();

    let mut rest = html;
    while !rest.is_empty() {
        let mut end = rest.len().min(TOKENIZE_CHUNK_BYTES);
        while !rest.is_char_boundary(end) {
            end += 1;
        }
        let (chunk, tail) = rest.split_at(end);
        queue.push_back(StrTendril::from_slice(chunk));
        let _ = tokenizer.feed(&queue);
        ctx.check_timeout()?;
        rest = tail;
    }
    tokenizer.end();

    Ok(tokenizer.sink.events.take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn start_with(name: &str, attrs: &[(&str, &str)]) -> HtmlEvent {
        HtmlEvent::StartTag {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            tokenize("<p>Hello</p>"),
            vec![HtmlEvent::start("p"), HtmlEvent::text("Hello"), HtmlEvent::end("p")]
        );
    }

    #[test]
    fn test_tag_names_lowercased() {
        assert_eq!(
            tokenize("<DIV>x</Div>"),
            vec![HtmlEvent::start("div"), HtmlEvent::text("x"), HtmlEvent::end("div")]
        );
    }

    #[test]
    fn test_void_element_closed_immediately() {
        assert_eq!(
            tokenize("a<br>b"),
            vec![
                HtmlEvent::text("a"),
                HtmlEvent::start("br"),
                HtmlEvent::end("br"),
                HtmlEvent::text("b"),
            ]
        );
    }

    #[test]
    fn test_stray_void_end_tag_dropped() {
        assert_eq!(
            tokenize("a<br></br>b"),
            vec![
                HtmlEvent::text("a"),
                HtmlEvent::start("br"),
                HtmlEvent::end("br"),
                HtmlEvent::text("b"),
            ]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        assert_eq!(
            tokenize("<div/>x"),
            vec![HtmlEvent::start("div"), HtmlEvent::end("div"), HtmlEvent::text("x")]
        );
    }

    #[test]
    fn test_attributes_decoded() {
        let events = tokenize(r#"<a href="/x?a=1&amp;b=2" title=t>l</a>"#);
        assert_eq!(events[0], start_with("a", &[("href", "/x?a=1&b=2"), ("title", "t")]));
        assert_eq!(events[0].attr("href"), Some("/x?a=1&b=2"));
        assert_eq!(events[0].attr("rel"), None);
        assert_eq!(events[1].attr("href"), None);
    }

    #[test]
    fn test_entities_merged_into_one_text_run() {
        assert_eq!(
            tokenize("<li>Fish &amp; Chips &lt;3</li>"),
            vec![
                HtmlEvent::start("li"),
                HtmlEvent::text("Fish & Chips <3"),
                HtmlEvent::end("li"),
            ]
        );
    }

    #[test]
    fn test_comment_splits_text() {
        assert_eq!(
            tokenize("a<!-- note -->b"),
            vec![HtmlEvent::text("a"), HtmlEvent::text("b")]
        );
    }

    #[test]
    fn test_unmatched_end_tag_dropped() {
        assert_eq!(
            tokenize("x</p>y"),
            vec![HtmlEvent::text("xy")]
        );
    }

    #[test]
    fn test_end_tag_closes_nested_elements() {
        assert_eq!(
            tokenize("<div><span>x</div>"),
            vec![
                HtmlEvent::start("div"),
                HtmlEvent::start("span"),
                HtmlEvent::text("x"),
                HtmlEvent::end("span"),
                HtmlEvent::end("div"),
            ]
        );
    }

    #[test]
    fn test_open_elements_closed_at_eof() {
        assert_eq!(
            tokenize("<ul><li>x"),
            vec![
                HtmlEvent::start("ul"),
                HtmlEvent::start("li"),
                HtmlEvent::text("x"),
                HtmlEvent::end("li"),
                HtmlEvent::end("ul"),
            ]
        );
    }

    #[test]
    fn test_table_rows_outside_table_kept() {
        assert_eq!(
            tokenize("<tr></tr><tr>X</tr>"),
            vec![
                HtmlEvent::start("tr"),
                HtmlEvent::end("tr"),
                HtmlEvent::start("tr"),
                HtmlEvent::text("X"),
                HtmlEvent::end("tr"),
            ]
        );
    }

    #[test]
    fn test_style_body_is_raw_text() {
        assert_eq!(
            tokenize("<style>p > a { color: red }</style>"),
            vec![
                HtmlEvent::start("style"),
                HtmlEvent::text("p > a { color: red }"),
                HtmlEvent::end("style"),
            ]
        );
    }

    #[test]
    fn test_title_is_rcdata() {
        assert_eq!(
            tokenize("<title>A <b>&amp; B</title>"),
            vec![
                HtmlEvent::start("title"),
                HtmlEvent::text("A <b>& B"),
                HtmlEvent::end("title"),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_chunk_boundary_inside_character_reference() {
        let filler = "x".repeat(TOKENIZE_CHUNK_BYTES - "<b>a &a".len());
        let html = format!("{filler}<b>a &amp; b</b>");
        assert_eq!(
            tokenize(&html),
            vec![
                HtmlEvent::text(&filler),
                HtmlEvent::start("b"),
                HtmlEvent::text("a & b"),
                HtmlEvent::end("b"),
            ]
        );
    }

    #[test]
    fn test_chunk_boundary_inside_multibyte_char() {
        let filler = "x".repeat(TOKENIZE_CHUNK_BYTES - 1);
        let html = format!("{filler}\u{e9}<br>");
        assert_eq!(
            tokenize(&html),
            vec![
                HtmlEvent::text(&format!("{filler}\u{e9}")),
                HtmlEvent::start("br"),
                HtmlEvent::end("br"),
            ]
        );
    }

    #[test]
    fn test_expired_deadline_stops_tokenizing() {
        let ctx = ConversionContext::new(Duration::from_micros(1));
        std::thread::sleep(Duration::from_millis(1));

        let html = "<p>row</p>".repeat(TOKENIZE_CHUNK_BYTES);
        assert!(matches!(
            tokenize_with_context(&html, &ctx),
            Err(ConversionError::Timeout)
        ));
    }

    #[test]
    fn test_context_without_deadline_matches_tokenize() {
        let html = "<table><tr><td>a</td></tr></table>".repeat(1000);
        let ctx = ConversionContext::new(Duration::ZERO);
        assert_eq!(
            tokenize_with_context(&html, &ctx).expect("no deadline"),
            tokenize(&html)
        );
    }

    proptest! {
        #[test]
        fn prop_events_are_balanced(
            tags in prop::collection::vec(
                prop::sample::select(vec!["<p>", "</p>", "<li>", "</li>", "<tr>", "</tr>", "<br>", "</a>", "<a href=x>", "text"]),
                0..40,
            ),
        ) {
            let html: String = tags.concat();
            let mut depth: Vec<String> = Vec::new();
            for event in tokenize(&html) {
                match event {
                    HtmlEvent::StartTag { name, .. } => depth.push(name),
                    HtmlEvent::EndTag { name } => {
                        prop_assert_eq!(depth.pop(), Some(name));
                    }
                    HtmlEvent::Text { content } => prop_assert!(!content.is_empty()),
                }
            }
            prop_assert!(depth.is_empty());
        }
    }
}
