#![allow(dead_code)] // Shared across integration test binaries; each uses a subset.

use core_edit::EditBuffer;
use core_view::{View, WrapMode};
use std::sync::Once;

static LOGGING: Once = Once::new();

pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn edit_with(text: &str) -> EditBuffer {
    init_logging();
    let mut edit = EditBuffer::with_defaults().expect("buffer construction");
    edit.insert_text(text).expect("initial insert");
    edit
}

/// Build and project a view in one go.
pub fn projected(edit: &mut EditBuffer, wrap_width: Option<usize>, mode: WrapMode) -> View {
    let buf = edit.buffer_mut();
    let mut view = View::new(buf);
    view.set_wrap_width(wrap_width);
    view.set_wrap_mode(mode);
    view.update_virtual_lines(buf);
    view
}

pub fn line_texts(view: &View, edit: &EditBuffer) -> Vec<String> {
    (0..view.get_virtual_line_count())
        .map(|i| view.line_text(edit.buffer(), i).expect("line text"))
        .collect()
}

pub fn line_widths(view: &View) -> Vec<usize> {
    view.get_virtual_lines().iter().map(|l| l.width).collect()
}
