//! Error types for conversion operations

use thiserror::Error;

/// Errors that can occur during HTML to plain text conversion
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Input could not be read as text in its detected charset
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Charset label is not supported
    #[error("Encoding error: {0}")]
    EncodingError(String),
    /// Conversion timeout exceeded
    #[error("Conversion timeout exceeded")]
    Timeout,
    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Options document could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
    /// Reading the input stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Get numeric error code, used as the CLI exit status
    pub fn code(&self) -> u8 {
        match self {
            ConversionError::ParseError(_) => 1,
            ConversionError::EncodingError(_) => 2,
            ConversionError::Timeout => 3,
            ConversionError::InvalidInput(_) => 5,
            ConversionError::Config(_) => 6,
            ConversionError::Io(_) => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            ConversionError::ParseError(String::new()),
            ConversionError::EncodingError(String::new()),
            ConversionError::Timeout,
            ConversionError::InvalidInput(String::new()),
            ConversionError::Config(String::new()),
            ConversionError::Io(std::io::Error::other("boom")),
        ];
        let mut codes: Vec<u8> = errors.iter().map(ConversionError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ConversionError::Timeout.to_string(),
            "Conversion timeout exceeded"
        );
        assert_eq!(
            ConversionError::ParseError("bad bytes".into()).to_string(),
            "Parse error: bad bytes"
        );
    }
}
