#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlsplice::xpath::Selector;
use xmlsplice::Document;

const DOC: &str = "<root a=\"1\"><child attr=\"val\">text</child><!--c--><child><?pi x?><![CDATA[d]]></child></root>";

fuzz_target!(|data: &[u8]| {
    if let Ok(expr) = std::str::from_utf8(data) {
        if let Ok(doc) = Document::parse_str(DOC) {
            // Compiling and selecting should never panic on any expression
            if let Ok(selector) = Selector::parse(expr) {
                let _ = selector.select(&doc);
            }
        }
    }
});
