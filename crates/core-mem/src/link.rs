//! Generational link pool and per-buffer link tracking.
//!
//! Hyperlink URLs are stored once in a paged slot array and referenced
//! from cell attributes by a packed 24-bit id: high 8 bits generation,
//! low 16 bits slot index. Id 0 is reserved for "no link". The generation
//! is re-stamped on every allocation in a slot, so an id captured before
//! the slot was recycled fails with `WrongGeneration` instead of reading
//! someone else's URL.
//!
//! The pool is shared state: handles are cheap clones and every public
//! operation takes the internal lock. There is deliberately no global
//! singleton; subsystems that consume ids receive a pool handle.

use ahash::AHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Slots per allocation page.
const PAGE_SLOTS: usize = 64;
/// Maximum URL length in bytes.
pub const URL_MAX_LEN: usize = 512;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("link id out of range")]
    InvalidId,
    #[error("link id generation does not match slot")]
    WrongGeneration,
    #[error("url exceeds {URL_MAX_LEN} bytes")]
    UrlTooLong,
}

/// Packed link id: `generation << 16 | slot_index`, 0 = no link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u32);

impl LinkId {
    pub const NONE: LinkId = LinkId(0);

    fn new(generation: u8, slot: u16) -> Self {
        LinkId(u32::from(generation) << 16 | u32::from(slot))
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn generation(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn slot_index(self) -> u16 {
        self.0 as u16
    }

    /// Raw packed value, e.g. for storage in cell attributes.
    pub fn raw(self) -> u32 {
        self.0
    }
}

struct LinkSlot {
    generation: u8,
    refcount: u16,
    len: u16,
    bytes: [u8; URL_MAX_LEN],
}

impl LinkSlot {
    const fn empty() -> Self {
        Self {
            generation: 0,
            refcount: 0,
            len: 0,
            bytes: [0; URL_MAX_LEN],
        }
    }
}

#[derive(Default)]
struct PoolInner {
    pages: Vec<Box<[LinkSlot; PAGE_SLOTS]>>,
    free: Vec<u16>,
}

impl PoolInner {
    fn slot(&self, index: u16) -> Option<&LinkSlot> {
        let (page, slot) = (index as usize / PAGE_SLOTS, index as usize % PAGE_SLOTS);
        self.pages.get(page).map(|p| &p[slot])
    }

    fn slot_mut(&mut self, index: u16) -> Option<&mut LinkSlot> {
        let (page, slot) = (index as usize / PAGE_SLOTS, index as usize % PAGE_SLOTS);
        self.pages.get_mut(page).map(|p| &mut p[slot])
    }

    fn checked_slot_mut(&mut self, id: LinkId) -> Result<&mut LinkSlot, LinkError> {
        let slot = self.slot_mut(id.slot_index()).ok_or(LinkError::InvalidId)?;
        if slot.generation != id.generation() {
            return Err(LinkError::WrongGeneration);
        }
        Ok(slot)
    }
}

/// Shared handle to the link pool. Clones refer to the same store.
#[derive(Clone, Default)]
pub struct LinkPool {
    inner: Arc<Mutex<PoolInner>>,
}

impl LinkPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a URL and return its id. The new slot starts at refcount 0;
    /// callers that retain the id must `incref` it (or use a
    /// [`LinkTracker`], which does).
    pub fn alloc(&self, url: &[u8]) -> Result<LinkId, LinkError> {
        if url.len() > URL_MAX_LEN {
            return Err(LinkError::UrlTooLong);
        }
        let mut inner = self.lock();
        let index = match inner.free.pop() {
            Some(index) => index,
            None => {
                let index = (inner.pages.len() * PAGE_SLOTS) as u16;
                inner
                    .pages
                    .push(Box::new([const { LinkSlot::empty() }; PAGE_SLOTS]));
                // Newly minted page: slots index+1 .. index+PAGE_SLOTS join
                // the free list, slot `index` is handed out now.
                for i in (1..PAGE_SLOTS as u16).rev() {
                    inner.free.push(index + i);
                }
                index
            }
        };
        let slot = inner.slot_mut(index).ok_or(LinkError::InvalidId)?;
        // Generations cycle 1..=255 so a live id never packs to 0.
        slot.generation = if slot.generation >= 255 {
            1
        } else {
            slot.generation + 1
        };
        slot.refcount = 0;
        slot.len = url.len() as u16;
        slot.bytes[..url.len()].copy_from_slice(url);
        Ok(LinkId::new(slot.generation, index))
    }

    pub fn incref(&self, id: LinkId) -> Result<(), LinkError> {
        let mut inner = self.lock();
        let slot = inner.checked_slot_mut(id)?;
        slot.refcount = slot.refcount.saturating_add(1);
        Ok(())
    }

    /// Drop one reference. When the count reaches zero the slot is pushed
    /// onto the free list; its bytes are kept until the next alloc there.
    pub fn decref(&self, id: LinkId) -> Result<(), LinkError> {
        let mut inner = self.lock();
        let slot = inner.checked_slot_mut(id)?;
        debug_assert!(slot.refcount > 0, "decref below zero");
        let mut freed = false;
        if slot.refcount > 0 {
            slot.refcount -= 1;
            freed = slot.refcount == 0;
        }
        if freed {
            inner.free.push(id.slot_index());
        }
        Ok(())
    }

    /// Copy out the URL bytes for a live id.
    pub fn get(&self, id: LinkId) -> Result<Vec<u8>, LinkError> {
        self.with_bytes(id, |b| b.to_vec())
    }

    /// Borrow the URL bytes under the lock without copying.
    pub fn with_bytes<R>(&self, id: LinkId, f: impl FnOnce(&[u8]) -> R) -> Result<R, LinkError> {
        let inner = self.lock();
        let slot = inner.slot(id.slot_index()).ok_or(LinkError::InvalidId)?;
        if slot.generation != id.generation() {
            return Err(LinkError::WrongGeneration);
        }
        Ok(f(&slot.bytes[..slot.len as usize]))
    }
}

/// Per-buffer map of link id to the number of cells carrying it.
///
/// Holds exactly one pool refcount per distinct id observed, releasing all
/// of them on [`clear`](Self::clear) or drop. This keeps live URLs pinned
/// without a per-cell refcount storm.
pub struct LinkTracker {
    pool: LinkPool,
    counts: AHashMap<LinkId, usize>,
}

impl LinkTracker {
    pub fn new(pool: LinkPool) -> Self {
        Self {
            pool,
            counts: AHashMap::new(),
        }
    }

    /// Record `n` more cells referencing `id`.
    pub fn add_cells(&mut self, id: LinkId, n: usize) -> Result<(), LinkError> {
        if id.is_none() || n == 0 {
            return Ok(());
        }
        match self.counts.get_mut(&id) {
            Some(count) => *count += n,
            None => {
                self.pool.incref(id)?;
                self.counts.insert(id, n);
            }
        }
        Ok(())
    }

    /// Record `n` fewer cells referencing `id`; releases the pool ref when
    /// the last cell goes.
    pub fn remove_cells(&mut self, id: LinkId, n: usize) -> Result<(), LinkError> {
        if id.is_none() || n == 0 {
            return Ok(());
        }
        let Some(count) = self.counts.get_mut(&id) else {
            return Ok(());
        };
        *count = count.saturating_sub(n);
        if *count == 0 {
            self.counts.remove(&id);
            self.pool.decref(id)?;
        }
        Ok(())
    }

    pub fn cell_count(&self, id: LinkId) -> usize {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Release every held pool reference.
    pub fn clear(&mut self) {
        for (id, _) in self.counts.drain() {
            // A failed decref means the pool already recycled the slot;
            // nothing left to release.
            let _ = self.pool.decref(id);
        }
    }
}

impl Drop for LinkTracker {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_get_roundtrip() {
        let pool = LinkPool::new();
        let id = pool.alloc(b"https://example.com").unwrap();
        assert!(!id.is_none());
        assert_eq!(pool.get(id).unwrap(), b"https://example.com");
    }

    #[test]
    fn url_too_long_rejected() {
        let pool = LinkPool::new();
        let long = vec![b'a'; URL_MAX_LEN + 1];
        assert_eq!(pool.alloc(&long), Err(LinkError::UrlTooLong));
        let max = vec![b'a'; URL_MAX_LEN];
        assert!(pool.alloc(&max).is_ok());
    }

    #[test]
    fn stale_generation_detected() {
        let pool = LinkPool::new();
        let id = pool.alloc(b"first").unwrap();
        pool.incref(id).unwrap();
        pool.decref(id).unwrap(); // refcount 0 -> slot freed
        let reused = pool.alloc(b"second").unwrap();
        assert_eq!(reused.slot_index(), id.slot_index());
        assert_ne!(reused.generation(), id.generation());
        assert_eq!(pool.get(id), Err(LinkError::WrongGeneration));
        assert_eq!(pool.get(reused).unwrap(), b"second");
    }

    #[test]
    fn out_of_range_is_invalid() {
        let pool = LinkPool::new();
        let bogus = LinkId::new(1, 9999);
        assert_eq!(pool.get(bogus), Err(LinkError::InvalidId));
    }

    #[test]
    fn id_zero_never_minted() {
        let pool = LinkPool::new();
        // Slot 0 cycles through all generations without ever packing to 0.
        let mut id = pool.alloc(b"x").unwrap();
        for _ in 0..300 {
            assert_ne!(id.raw(), 0);
            assert_eq!(id.slot_index(), 0);
            pool.incref(id).unwrap();
            pool.decref(id).unwrap();
            id = pool.alloc(b"x").unwrap();
        }
    }

    #[test]
    fn tracker_holds_single_ref_per_id() {
        let pool = LinkPool::new();
        let id = pool.alloc(b"url").unwrap();
        let mut tracker = LinkTracker::new(pool.clone());
        tracker.add_cells(id, 3).unwrap();
        tracker.add_cells(id, 2).unwrap();
        assert_eq!(tracker.cell_count(id), 5);
        tracker.remove_cells(id, 4).unwrap();
        assert_eq!(tracker.cell_count(id), 1);
        assert!(pool.get(id).is_ok());
        tracker.remove_cells(id, 1).unwrap();
        // Last cell gone: tracker released its ref, slot got recycled.
        let reused = pool.alloc(b"other").unwrap();
        assert_eq!(reused.slot_index(), id.slot_index());
    }

    #[test]
    fn tracker_drop_releases_refs() {
        let pool = LinkPool::new();
        let id = pool.alloc(b"url").unwrap();
        {
            let mut tracker = LinkTracker::new(pool.clone());
            tracker.add_cells(id, 1).unwrap();
        }
        let reused = pool.alloc(b"next").unwrap();
        assert_eq!(reused.slot_index(), id.slot_index());
    }

    #[test]
    fn none_id_is_ignored_by_tracker() {
        let pool = LinkPool::new();
        let mut tracker = LinkTracker::new(pool);
        tracker.add_cells(LinkId::NONE, 10).unwrap();
        assert_eq!(tracker.cell_count(LinkId::NONE), 0);
    }
}
