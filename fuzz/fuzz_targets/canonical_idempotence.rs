#![no_main]

use canvas_sync::{StructuredDocument, canonical_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let canonical = canonical_text(&StructuredDocument::from_canonical(&input));
    let again = canonical_text(&StructuredDocument::from_canonical(&canonical));
    assert_eq!(canonical, again);
});
