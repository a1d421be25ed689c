#![no_main]

use html_plaintext::PlainTextConverter;
use html_plaintext::options::DEFAULT_STROKE_TEXT;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|html: &str| {
    let text = PlainTextConverter::new()
        .convert(html)
        .expect("string input never fails without a size limit");

    let doubled = format!("{DEFAULT_STROKE_TEXT}{DEFAULT_STROKE_TEXT}");
    if !html.contains("---") {
        assert!(!text.contains(&doubled));
    }
});
