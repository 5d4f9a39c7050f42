#![no_main]

use canvas_sync::Diff;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (String, String)| {
    let (from, to) = data;
    let diff = Diff::between("from", "to", &from, &to);
    assert_eq!(diff.is_empty(), from.lines().eq(to.lines()));
    let _ = diff.to_string();
});
