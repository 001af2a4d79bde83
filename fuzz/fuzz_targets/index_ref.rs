#![no_main]

use devpi_testresult_index::{IndexRef, IndexRefError};
use libfuzzer_sys::fuzz_target;
use url::Url;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let parsed = IndexRef::parse(Some(raw));
    if let Err(IndexRefError::Malformed(_)) = &parsed {
        assert!(raw.contains('/'));
    }

    if let Ok(index) = parsed {
        let root = Url::parse("http://localhost:3141/").ok();
        let current = Url::parse("http://localhost:3141/alice/dev").ok();
        let _ = index.to_index_url(root.as_ref(), current.as_ref(), Some("alice"));
        let _ = index.to_index_url(root.as_ref(), None, None);
        let _ = index.to_string();
    }
});
