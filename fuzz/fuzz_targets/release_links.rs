#![no_main]

use devpi_testresult_index::links::REL_RELEASEFILE;
use devpi_testresult_index::{Link, find_sdist_and_wheels, url_nofrag};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let links: Vec<Link> = input
        .lines()
        .map(|href| Link {
            rel: REL_RELEASEFILE.to_string(),
            href: href.to_string(),
            hash_spec: None,
        })
        .collect();
    let refs: Vec<&Link> = links.iter().collect();

    let files = find_sdist_and_wheels(&refs, true);
    assert!(files.sdists.len() + files.wheels.len() + files.skipped_wheels.len() <= links.len());
    assert!(files.wheels.iter().all(|w| w.is_universal_wheel()));

    for link in &links {
        if let Ok(url) = url_nofrag(&link.href) {
            assert!(url.fragment().is_none());
        }
    }
});
