#![no_main]

use libfuzzer_sys::fuzz_target;

// Any input must either parse or fail with a lex or parse error
fuzz_target!(|source: &str| {
    if let Err(error) = modl::parse_source(source) {
        assert!(matches!(error.kind_name(), "LexError" | "ParseError"), "{:?}", error);
    }
});
