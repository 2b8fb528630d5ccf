//! Byte-buffer ownership and link-id pooling.
//!
//! Two small allocators live here. [`MemRegistry`] owns every immutable
//! byte buffer that text chunks reference; chunks carry a one-byte
//! [`MemId`] instead of a pointer, so the registry must outlive all chunks
//! minted over it (the text buffer owns both, which enforces this).
//! [`LinkPool`] is a paged generational slot store for URL strings shared
//! across buffers; ids embed a generation so stale references are detected
//! instead of dereferenced.

pub mod link;
pub mod registry;

pub use link::{LinkError, LinkId, LinkPool, LinkTracker, URL_MAX_LEN};
pub use registry::{MemBytes, MemError, MemId, MemRegistry};
