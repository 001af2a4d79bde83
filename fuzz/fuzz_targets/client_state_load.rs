#![no_main]

use std::fs;

use devpi_testresult_index::{ClientState, DevpiSession};
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

fuzz_target!(|data: &[u8]| {
    let Ok(td) = tempdir() else {
        return;
    };
    if fs::write(td.path().join("current.json"), data).is_err() {
        return;
    }

    temp_env::with_var_unset("DEVPI_CLIENTDIR", || {
        if let Ok(state) = ClientState::load_default(Some(td.path())) {
            let _ = state.root_url();
            let _ = DevpiSession::open(state);
        }
    });
});
