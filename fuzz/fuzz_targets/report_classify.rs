#![no_main]

use std::fs;

use devpi_testresult::report::{Verdict, classify_document, inspect_report};
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

fuzz_target!(|data: &[u8]| {
    if let Ok(doc) = serde_json::from_slice::<serde_json::Value>(data) {
        let verdict = classify_document(&doc);
        let has_marker = doc.as_object().is_some_and(|m| m.contains_key("toxversion"));
        assert_eq!(verdict == Verdict::Valid, has_marker);
    }

    let Ok(td) = tempdir() else {
        return;
    };
    let path = td.path().join("report.json");
    if fs::write(&path, data).is_err() {
        return;
    }
    let _ = inspect_report(&path);
});
