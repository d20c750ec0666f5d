#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rowsync_core::sanitize_id;

#[derive(Arbitrary, Debug)]
struct Input {
    raw: String,
    strip_parentheticals: bool,
    max_len: u8,
}

fuzz_target!(|input: Input| {
    let max_len = usize::from(input.max_len).max(1);
    let token = sanitize_id(&input.raw, input.strip_parentheticals, max_len);

    assert!(!token.is_empty());
    assert!(token
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
    assert_eq!(
        token,
        sanitize_id(&input.raw, input.strip_parentheticals, max_len)
    );
});
