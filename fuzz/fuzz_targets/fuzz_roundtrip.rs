#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlsplice::parser::parse_str;
use xmlsplice::serial::serialize;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parsed input always serializes to something that parses again,
        // and a second pass is a fixed point.
        if let Ok(doc) = parse_str(s) {
            let output = serialize(&doc);
            let reparsed = parse_str(&output).expect("serializer produced malformed XML");
            assert_eq!(serialize(&reparsed), output);
        }
    }
});
