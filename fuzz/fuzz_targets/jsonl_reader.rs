#![no_main]

use libfuzzer_sys::fuzz_target;
use rowsync_feed::{EntryReader, JsonLinesSource, TagEntryReader};

// Arbitrary bytes must either yield entries or a clean error, never a panic,
// and the reader must stop at the first error.
fuzz_target!(|data: &[u8]| {
    let mut reader = TagEntryReader::new(JsonLinesSource::new(data));
    loop {
        match reader.advance() {
            Ok(Some(entry)) => assert!(!entry.contains("updated")),
            Ok(None) | Err(_) => break,
        }
    }
});
