//! End-to-end editing scenarios over a fresh buffer.

mod common;

use anyhow::Result;
use common::{edit_with, plain};
use core_edit::EditBuffer;

#[test]
fn basic_insert_and_line_count() -> Result<()> {
    let mut edit = EditBuffer::with_defaults()?;
    edit.insert_text("hello\nworld")?;
    let buf = edit.buffer_mut();
    assert_eq!(buf.get_line_count(), 2);
    assert_eq!(buf.line_width(0), Some(5));
    assert_eq!(buf.line_width(1), Some(5));
    let c = edit.get_primary_cursor();
    assert_eq!((c.row, c.col), (1, 5));
    assert_eq!(plain(&edit), "hello\nworld");
    Ok(())
}

#[test]
fn crlf_normalization() -> Result<()> {
    let mut edit = EditBuffer::with_defaults()?;
    edit.insert_text("a\r\nb\rc\nd")?;
    assert_eq!(edit.buffer().get_line_count(), 4);
    assert_eq!(plain(&edit), "a\nb\nc\nd");
    let c = edit.get_primary_cursor();
    assert_eq!((c.row, c.col), (3, 1));
    Ok(())
}

#[test]
fn backspace_across_line() -> Result<()> {
    let mut edit = edit_with("hello\nworld");
    edit.set_cursor(1, 0)?;
    edit.backspace()?;
    assert_eq!(edit.buffer().get_line_count(), 1);
    let c = edit.get_primary_cursor();
    assert_eq!((c.row, c.col), (0, 5));
    assert_eq!(plain(&edit), "helloworld");
    Ok(())
}

#[test]
fn cursor_vertical_stickiness() -> Result<()> {
    let mut edit = edit_with("short\nlonger line\nx");
    edit.set_cursor(1, 8)?;
    edit.move_down();
    let c = edit.get_primary_cursor();
    assert_eq!((c.row, c.col), (2, 1));
    assert_eq!(c.desired_col, 8);
    edit.move_up();
    edit.move_up();
    let c = edit.get_primary_cursor();
    assert_eq!((c.row, c.col), (0, 5));
    assert_eq!(c.desired_col, 8, "stickiness survives until horizontal motion");
    edit.move_up();
    let c = edit.get_primary_cursor();
    assert_eq!((c.row, c.col), (0, 5), "clamped at the top");
    edit.move_left();
    let c = edit.get_primary_cursor();
    assert_eq!((c.col, c.desired_col), (4, 4));
    Ok(())
}

#[test]
fn plain_text_roundtrip_samples() -> Result<()> {
    for text in [
        "",
        "x",
        "hello\nworld",
        "trailing\n",
        "\nleading",
        "a\n\nb",
        "tabs\tstay\ttabs",
        "mixed 漢字 and text",
        "emoji 😀 and flags 🇺🇸",
    ] {
        let edit = edit_with(text);
        assert_eq!(plain(&edit), text, "round-trip of {text:?}");
    }
    // CR flavors normalize to LF.
    let edit = edit_with("a\rb\r\nc");
    assert_eq!(plain(&edit), "a\nb\nc");
    Ok(())
}

#[test]
fn metrics_invariants_after_edit_sequence() -> Result<()> {
    let mut edit = edit_with("one\ntwo three\nfour");
    edit.set_cursor(1, 3)?;
    edit.insert_text("INS\nERT")?;
    edit.backspace()?;
    edit.delete_range((0, 1), (1, 2))?;
    edit.delete_forward()?;

    let buf = edit.buffer_mut();
    let rope = buf.rope();
    let breaks = {
        let mut n = 0;
        rope.walk(|_, seg| {
            if seg.is_break() {
                n += 1;
            }
            true
        });
        n
    };
    assert_eq!(buf.get_line_count(), breaks + 1);

    let text_width = {
        let mut w = 0;
        buf.rope().walk(|_, seg| {
            if let Some(chunk) = seg.as_chunk() {
                w += chunk.width();
            }
            true
        });
        w
    };
    assert_eq!(buf.get_total_width(), text_width + breaks);

    // Line starts and coordinate conversion agree.
    for row in 0..buf.get_line_count() {
        let offset = buf.coords_to_offset(row, 0).expect("row exists");
        let marker = buf.rope().locate_marker(row).expect("marker exists");
        assert_eq!(offset, marker.weight);
    }
    Ok(())
}

#[test]
fn coords_roundtrip_over_every_position() -> Result<()> {
    let mut edit = edit_with("ab\n\n漢字 x\nend");
    let buf = edit.buffer_mut();
    for row in 0..buf.get_line_count() {
        let width = buf.line_width(row).expect("row exists");
        for col in 0..=width {
            let Some(offset) = buf.coords_to_offset(row, col) else {
                panic!("({row},{col}) must be addressable");
            };
            assert_eq!(buf.offset_to_coords(offset), Some((row, col)));
        }
    }
    Ok(())
}

#[test]
fn every_mutation_dirties_views() -> Result<()> {
    let mut edit = edit_with("abc\ndef");
    let id = edit.buffer_mut().register_view();
    edit.buffer_mut().clear_view_dirty(id);
    edit.insert_text("x")?;
    assert!(edit.buffer().is_view_dirty(id));
    edit.buffer_mut().clear_view_dirty(id);
    edit.backspace()?;
    assert!(edit.buffer().is_view_dirty(id));
    edit.buffer_mut().clear_view_dirty(id);
    edit.delete_range((0, 0), (0, 1))?;
    assert!(edit.buffer().is_view_dirty(id));
    Ok(())
}

#[test]
fn line_text_extraction() -> Result<()> {
    let mut edit = edit_with("first\nsecond 漢\nthird");
    let buf = edit.buffer_mut();
    assert_eq!(buf.line_text(0).as_deref(), Some("first"));
    assert_eq!(buf.line_text(1).as_deref(), Some("second 漢"));
    assert_eq!(buf.line_text(2).as_deref(), Some("third"));
    assert_eq!(buf.line_text(3), None);
    Ok(())
}
