//! Form POST document fuzzer
//!
//! Field names and values come straight from the fuzzer. Every hidden input
//! must stay a single well-formed tag, so no raw `<`, `>` or `"` from the
//! input may reach the document.

#![no_main]

use courier_core::IndirectEncoder;
use courier_proto::MessageFields;
use libfuzzer_sys::fuzz_target;
use url::Url;

fuzz_target!(|pairs: Vec<(String, String)>| {
    // Newlines are legal but would split an input across lines below.
    if pairs.iter().any(|(k, v)| k.contains('\n') || v.contains('\n')) {
        return;
    }
    let Ok(fields) = MessageFields::from_pairs(pairs) else {
        return;
    };

    let action = Url::parse("https://op.example/server").expect("static URL");
    let html = IndirectEncoder::default().render_form(&action, &fields);

    assert_eq!(html.matches("type=\"hidden\"").count(), fields.len());
    for line in html.lines().filter(|line| line.contains("type=\"hidden\"")) {
        assert_eq!(line.matches('<').count(), 1);
        assert_eq!(line.matches('>').count(), 1);
        assert_eq!(line.matches('"').count(), 6);
    }
});
