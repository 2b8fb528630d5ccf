#![allow(dead_code)] // Shared across integration test binaries; each uses a subset.

use core_edit::EditBuffer;
use std::sync::Once;

static LOGGING: Once = Once::new();

/// Install a test subscriber once per binary; `RUST_LOG` filters apply.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn plain(edit: &EditBuffer) -> String {
    let mut out = Vec::new();
    edit.buffer().get_plain_text_into(&mut out);
    String::from_utf8(out).expect("buffer text is UTF-8")
}

pub fn edit_with(text: &str) -> EditBuffer {
    init_logging();
    let mut edit = EditBuffer::with_defaults().expect("buffer construction");
    edit.insert_text(text).expect("initial insert");
    edit
}
