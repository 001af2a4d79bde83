#![no_main]

use devpi_testresult_index::{Requirement, Version};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (spec, versions) = input.split_once('\n').unwrap_or((input, "1.0\n2.0rc1"));

    if let Ok(req) = Requirement::parse(spec) {
        let candidates: Vec<&str> = versions.lines().collect();
        if let Some(best) = req.best_match(candidates.iter().copied()) {
            assert!(candidates.contains(&best));
            assert!(req.contains(best));
        }
        let _ = Requirement::parse(&req.to_string());
    }

    for line in versions.lines() {
        let _ = Version::parse(line).map(|v| v.is_prerelease());
    }
});
