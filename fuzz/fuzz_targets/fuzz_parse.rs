#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlsplice::encoding::decode_to_utf8;
use xmlsplice::parser::{parse_fragment, parse_str_with_options, ParseOptions};

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes should never panic
    if let Ok(s) = decode_to_utf8(data) {
        let _ = parse_str_with_options(&s, &ParseOptions::default());
        let _ = parse_str_with_options(&s, &ParseOptions::default().no_blanks(true));
        let _ = parse_fragment(&s);
    }
});
