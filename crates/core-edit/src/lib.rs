//! Text buffer and edit primitives.
//!
//! [`TextBuffer`] owns the storage stack: the memory registry, the
//! segmented rope over it, the injected width oracle, and the per-view
//! dirty bits. [`EditBuffer`] layers editing on top: an append-only
//! add-buffer receiving every inserted byte, a cursor list, and the
//! insert/delete/motion primitives. One `EditBuffer` is one mutation
//! domain; nothing in here is shared between threads.

pub mod buffer;
pub mod cursor;
pub mod edit;

pub use buffer::{BufferOptions, TextBuffer, ViewId};
pub use cursor::Cursor;
pub use edit::EditBuffer;

use core_mem::MemError;
use core_rope::RopeError;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    /// The cursor does not address a valid buffer position.
    #[error("invalid cursor position")]
    InvalidCursor,
    #[error(transparent)]
    Rope(#[from] RopeError),
    #[error(transparent)]
    Mem(#[from] MemError),
}
