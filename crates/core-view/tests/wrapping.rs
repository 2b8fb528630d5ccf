//! End-to-end wrapping scenarios.

mod common;

use anyhow::Result;
use common::{edit_with, line_texts, line_widths, projected};
use core_view::{View, WrapMode};

#[test]
fn character_wrap_splits_at_width() -> Result<()> {
    let mut edit = edit_with("abcdefghij");
    let view = projected(&mut edit, Some(4), WrapMode::Char);
    assert_eq!(view.get_virtual_line_count(), 3);
    assert_eq!(line_widths(&view), vec![4, 4, 2]);
    let cols: Vec<_> = view
        .get_virtual_lines()
        .iter()
        .map(|l| l.source_col_offset)
        .collect();
    assert_eq!(cols, vec![0, 4, 8]);
    assert_eq!(line_texts(&view, &edit), vec!["abcd", "efgh", "ij"]);
    Ok(())
}

#[test]
fn word_wrap_with_long_token_force_breaks() -> Result<()> {
    let mut edit = edit_with("hello worldlongword");
    let view = projected(&mut edit, Some(6), WrapMode::Word);
    assert_eq!(
        line_texts(&view, &edit),
        vec!["hello ", "worldl", "ongwor", "d"]
    );
    assert_eq!(line_widths(&view), vec![6, 6, 6, 1]);
    Ok(())
}

#[test]
fn word_wrap_packs_words_greedily() -> Result<()> {
    let mut edit = edit_with("aa bb cc dd");
    let view = projected(&mut edit, Some(6), WrapMode::Word);
    assert_eq!(line_texts(&view, &edit), vec!["aa bb ", "cc dd"]);
    Ok(())
}

#[test]
fn char_wrap_respects_wide_clusters() -> Result<()> {
    // Each CJK cluster is 2 cells; width 3 fits one cluster plus one
    // narrow cell.
    let mut edit = edit_with("漢字漢");
    let view = projected(&mut edit, Some(3), WrapMode::Char);
    assert_eq!(line_widths(&view), vec![2, 2, 2]);
    assert_eq!(line_texts(&view, &edit), vec!["漢", "字", "漢"]);
    Ok(())
}

#[test]
fn cluster_wider_than_line_still_lands() -> Result<()> {
    let mut edit = edit_with("漢");
    let view = projected(&mut edit, Some(1), WrapMode::Char);
    assert_eq!(view.get_virtual_line_count(), 1);
    assert_eq!(line_widths(&view), vec![2], "forced overflow cluster");
    Ok(())
}

#[test]
fn logical_lines_reset_wrapping() -> Result<()> {
    let mut edit = edit_with("abcdef\n\nxy");
    let view = projected(&mut edit, Some(4), WrapMode::Char);
    assert_eq!(line_texts(&view, &edit), vec!["abcd", "ef", "", "xy"]);
    let sources: Vec<_> = view
        .get_virtual_lines()
        .iter()
        .map(|l| l.source_line)
        .collect();
    assert_eq!(sources, vec![0, 0, 1, 2]);
    Ok(())
}

#[test]
fn empty_buffer_projects_one_empty_line() -> Result<()> {
    let mut edit = common::edit_with("");
    let view = projected(&mut edit, Some(8), WrapMode::Word);
    assert_eq!(view.get_virtual_line_count(), 1);
    assert_eq!(line_widths(&view), vec![0]);
    Ok(())
}

#[test]
fn fragments_address_source_chunks() -> Result<()> {
    let mut edit = edit_with("abcdefghij");
    let view = projected(&mut edit, Some(4), WrapMode::Char);
    let lines = view.get_virtual_lines();
    let frags: Vec<_> = lines.iter().flat_map(|l| view.chunks_of(l)).collect();
    assert_eq!(frags.len(), 3);
    assert_eq!(frags[0].grapheme_start, 0);
    assert_eq!(frags[0].grapheme_count, 4);
    assert_eq!(frags[1].grapheme_start, 4);
    assert_eq!(frags[2].grapheme_count, 2);
    // All fragments come from the line's single chunk.
    assert!(frags.iter().all(|f| f.chunk_index == 0));
    Ok(())
}

#[test]
fn rewrap_after_edit_without_explicit_invalidation() -> Result<()> {
    let mut edit = edit_with("aaaa");
    let mut view = projected(&mut edit, Some(4), WrapMode::Char);
    assert_eq!(view.get_virtual_line_count(), 1);
    edit.insert_text("bbbb")?;
    view.update_virtual_lines(edit.buffer_mut());
    assert_eq!(view.get_virtual_line_count(), 2);
    assert_eq!(line_texts(&view, &edit), vec!["aaaa", "bbbb"]);
    Ok(())
}

#[test]
fn projection_idempotent_for_same_settings() -> Result<()> {
    let mut edit = edit_with("hello worldlongword");
    let mut view = projected(&mut edit, Some(6), WrapMode::Word);
    let first = view.get_virtual_lines().to_vec();
    view.set_wrap_width(Some(6));
    view.set_wrap_mode(WrapMode::Word);
    view.update_virtual_lines(edit.buffer_mut());
    assert_eq!(view.get_virtual_lines(), &first[..]);
    Ok(())
}

#[test]
fn two_views_wrap_independently() -> Result<()> {
    let mut edit = edit_with("hello world");
    let buf = edit.buffer_mut();
    let mut narrow = View::new(buf);
    narrow.set_wrap_width(Some(4));
    let mut wide = View::new(buf);
    narrow.update_virtual_lines(buf);
    wide.update_virtual_lines(buf);
    assert_eq!(narrow.get_virtual_line_count(), 3);
    assert_eq!(wide.get_virtual_line_count(), 1);
    narrow.close(buf);
    wide.close(buf);
    Ok(())
}

#[test]
fn unwrapped_max_width_matches_buffer() -> Result<()> {
    let mut edit = edit_with("a\nlonger\nmid");
    let view = projected(&mut edit, None, WrapMode::Char);
    let info = view.get_cached_line_info();
    assert_eq!(info.max_width, edit.buffer().get_max_line_width());
    assert_eq!(info.line_widths, &[1, 6, 3]);
    Ok(())
}
