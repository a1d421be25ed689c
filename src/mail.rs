//! Multipart alternative email composition
//!
//! Email templates are rendered to HTML once. The plain text part is derived
//! from that HTML with [`PlainTextConverter`], and both parts travel together
//! as a `multipart/alternative` message. This module builds that message and
//! renders it to RFC 5322 text. Sending it is up to the caller's transport.
//!
//! ```rust
//! use html_plaintext::PlainTextConverter;
//! use html_plaintext::mail::AlternativeEmail;
//!
//! let email = AlternativeEmail::builder("shop@example.com")
//!     .to("customer@example.com")
//!     .subject("Your order\nhas shipped")
//!     .html_body("<p>Track it <a href=\"https://example.com/t/1\">here</a></p>")
//!     .build(&PlainTextConverter::new())
//!     .expect("valid email");
//!
//! assert_eq!(email.subject, "Your orderhas shipped");
//! assert_eq!(email.reply_to, "shop@example.com");
//! assert!(email.text_body.ends_with("[1]: https://example.com/t/1\n"));
//! assert!(email.to_mime().contains("Content-Type: multipart/alternative"));
//! ```
//!
//! # Boundary
//!
//! The MIME boundary is derived from a BLAKE3 hash of both bodies (first 128
//! bits, hex encoded), so rendering the same email twice yields identical
//! bytes and a body cannot realistically contain its own boundary.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::converter::PlainTextConverter;
use crate::error::ConversionError;

/// Prefix of every generated boundary
const BOUNDARY_PREFIX: &str = "=_alt_";

/// Number of hash bytes used in the boundary
const BOUNDARY_HASH_BYTES: usize = 16;

/// A composed email with plain text and HTML alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternativeEmail {
    /// Subject on a single line
    pub subject: String,
    /// Sender address
    pub from: String,
    /// Primary recipients
    pub to: Vec<String>,
    /// Carbon copy recipients
    pub cc: Vec<String>,
    /// Blind carbon copy recipients, never rendered into headers
    pub bcc: Vec<String>,
    /// Reply address, the sender unless set explicitly
    pub reply_to: String,
    /// Additional headers in insertion order
    pub headers: Vec<(String, String)>,
    /// Plain text part, converted from `html_body`
    pub text_body: String,
    /// HTML part, as rendered by the template
    pub html_body: String,
}

/// Builder for [`AlternativeEmail`]
#[derive(Debug, Clone, Default)]
pub struct EmailBuilder {
    from: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    reply_to: Option<String>,
    headers: Vec<(String, String)>,
    subject: String,
    html_body: String,
}

impl EmailBuilder {
    /// Add a primary recipient
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Add a carbon copy recipient
    pub fn cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Add a blind carbon copy recipient
    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Set the reply address
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Add a custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the rendered subject; line breaks are removed on build
    pub fn subject(mut self, rendered: impl Into<String>) -> Self {
        self.subject = rendered.into();
        self
    }

    /// Set the rendered HTML body
    pub fn html_body(mut self, rendered: impl Into<String>) -> Self {
        self.html_body = rendered.into();
        self
    }

    /// Validate headers and derive the plain text body
    ///
    /// # Errors
    ///
    /// - `ConversionError::InvalidInput` if an address or header contains a
    ///   line break, or a header name is not a valid field name
    /// - any error returned by [`PlainTextConverter::convert`]
    pub fn build(
        self,
        converter: &PlainTextConverter,
    ) -> Result<AlternativeEmail, ConversionError> {
        let subject = flatten_subject(&self.subject);
        let reply_to = self.reply_to.unwrap_or_else(|| self.from.clone());

        check_header_value("From", &self.from)?;
        check_header_value("Reply-To", &reply_to)?;
        for address in self.to.iter().chain(&self.cc).chain(&self.bcc) {
            check_header_value("recipient", address)?;
        }
        for (name, value) in &self.headers {
            check_header_name(name)?;
            check_header_value(name, value)?;
        }

        let text_body = converter.convert(&self.html_body)?;
        tracing::debug!(
            recipients = self.to.len() + self.cc.len() + self.bcc.len(),
            text_len = text_body.len(),
            html_len = self.html_body.len(),
            "composed alternative email"
        );

        Ok(AlternativeEmail {
            subject,
            from: self.from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            reply_to,
            headers: self.headers,
            text_body,
            html_body: self.html_body,
        })
    }
}

impl AlternativeEmail {
    /// Start building an email sent by `from`
    pub fn builder(from: impl Into<String>) -> EmailBuilder {
        EmailBuilder {
            from: from.into(),
            ..EmailBuilder::default()
        }
    }

    /// Boundary separating the two parts
    pub fn boundary(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.text_body.as_bytes());
        // Separator so that moving bytes between parts changes the hash
        hasher.update(&[0]);
        hasher.update(self.html_body.as_bytes());
        let hash = hasher.finalize();
        format!(
            "{BOUNDARY_PREFIX}{}",
            hex::encode(&hash.as_bytes()[..BOUNDARY_HASH_BYTES])
        )
    }

    /// Render headers and both parts as a MIME message with CRLF line endings
    pub fn to_mime(&self) -> String {
        let boundary = self.boundary();
        let mut out = String::with_capacity(self.text_body.len() + self.html_body.len() + 512);

        push_header(&mut out, "From", &self.from);
        if !self.to.is_empty() {
            push_header(&mut out, "To", &self.to.join(", "));
        }
        if !self.cc.is_empty() {
            push_header(&mut out, "Cc", &self.cc.join(", "));
        }
        push_header(&mut out, "Reply-To", &self.reply_to);
        push_header(&mut out, "Subject", &encode_header_text(&self.subject));
        for (name, value) in &self.headers {
            push_header(&mut out, name, &encode_header_text(value));
        }
        push_header(&mut out, "MIME-Version", "1.0");
        push_header(
            &mut out,
            "Content-Type",
            &format!("multipart/alternative; boundary=\"{boundary}\""),
        );
        out.push_str("\r\n");

        for (subtype, body) in [("plain", &self.text_body), ("html", &self.html_body)] {
            out.push_str(&format!("--{boundary}\r\n"));
            push_header(&mut out, "Content-Type", &format!("text/{subtype}; charset=utf-8"));
            push_header(&mut out, "Content-Transfer-Encoding", "8bit");
            out.push_str("\r\n");
            out.push_str(&crlf(body));
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{boundary}--\r\n"));
        out
    }
}

/// Join all lines of a rendered subject without a separator
pub fn flatten_subject(rendered: &str) -> String {
    rendered.split(['\r', '\n']).collect()
}

fn check_header_value(field: &str, value: &str) -> Result<(), ConversionError> {
    if value.contains(['\r', '\n']) {
        return Err(ConversionError::InvalidInput(format!(
            "{field} header value contains a line break"
        )));
    }
    Ok(())
}

fn check_header_name(name: &str) -> Result<(), ConversionError> {
    let valid = !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':');
    if valid {
        Ok(())
    } else {
        Err(ConversionError::InvalidInput(format!(
            "invalid header name {name:?}"
        )))
    }
}

/// RFC 2047 encoded-word for non-ASCII header text
fn encode_header_text(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(value))
    }
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

fn crlf(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\n', "\r\n")
}
