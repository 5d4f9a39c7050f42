#![no_main]

use canvas_sync::{MarkupParser, canonical_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    if let Ok(doc) = MarkupParser::parse(&input) {
        let _ = canonical_text(&doc);
    }
});
