#![no_main]

use html_plaintext::{ConversionError, PlainTextConverter};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match PlainTextConverter::new().convert_bytes(data, None) {
        Ok(_)
        | Err(ConversionError::ParseError(_))
        | Err(ConversionError::EncodingError(_)) => {}
        Err(e) => panic!("unexpected error: {e:?}"),
    }
});
