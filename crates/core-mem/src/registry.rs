//! Bounded registry of immutable byte buffers.
//!
//! Slots are addressed by a one-byte id; freed ids are recycled through a
//! free list. Registered bytes never move: arena slots append within a
//! fixed capacity and everything else is immutable after registration, so
//! `(id, start, end)` triples held by text chunks stay valid until the
//! slot is unregistered.

use thiserror::Error;

/// Registry capacity: ids fit in one byte, id 255 is never minted.
pub const MAX_SLOTS: usize = 255;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    #[error("memory registry is full")]
    OutOfMemory,
    #[error("invalid or inactive memory id")]
    InvalidMemId,
}

/// Small integer handle to a registered buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemId(u8);

impl MemId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registered bytes with their ownership mode.
///
/// `Owned` transfers the allocation to the registry (released on
/// unregister/clear/drop); `Static` borrows program-lifetime data.
#[derive(Debug)]
pub enum MemBytes {
    Owned(Vec<u8>),
    Static(&'static [u8]),
}

impl MemBytes {
    fn as_slice(&self) -> &[u8] {
        match self {
            MemBytes::Owned(v) => v,
            MemBytes::Static(s) => s,
        }
    }
}

#[derive(Debug)]
struct Slot {
    bytes: MemBytes,
    /// Append slot: owned, fixed capacity, grows only at the tail.
    arena: bool,
}

/// The sole owner of text bytes referenced by chunks.
#[derive(Debug, Default)]
pub struct MemRegistry {
    slots: Vec<Option<Slot>>,
    free: Vec<u8>,
}

impl MemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn install(&mut self, slot: Slot) -> Result<MemId, MemError> {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(slot);
            return Ok(MemId(idx));
        }
        if self.slots.len() >= MAX_SLOTS {
            return Err(MemError::OutOfMemory);
        }
        let idx = self.slots.len() as u8;
        self.slots.push(Some(slot));
        Ok(MemId(idx))
    }

    /// Register a buffer and receive its id. Fails with `OutOfMemory` when
    /// all slots are live.
    pub fn register(&mut self, bytes: MemBytes) -> Result<MemId, MemError> {
        self.install(Slot {
            bytes,
            arena: false,
        })
    }

    /// Register an empty owned slot with a fixed append capacity.
    ///
    /// Bytes appended through [`arena_append`](Self::arena_append) never
    /// move, so ranges returned from it remain stable for the life of the
    /// slot.
    pub fn register_arena(&mut self, capacity: usize) -> Result<MemId, MemError> {
        self.install(Slot {
            bytes: MemBytes::Owned(Vec::with_capacity(capacity)),
            arena: true,
        })
    }

    /// Append into an arena slot, returning the written byte range.
    ///
    /// Fails with `OutOfMemory` if the slot's fixed capacity cannot take
    /// `bytes`; the caller is expected to have checked
    /// [`arena_remaining`](Self::arena_remaining) and grown into a fresh
    /// slot first.
    pub fn arena_append(&mut self, id: MemId, bytes: &[u8]) -> Result<(usize, usize), MemError> {
        let slot = self
            .slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(MemError::InvalidMemId)?;
        if !slot.arena {
            return Err(MemError::InvalidMemId);
        }
        let MemBytes::Owned(vec) = &mut slot.bytes else {
            return Err(MemError::InvalidMemId);
        };
        if vec.capacity() - vec.len() < bytes.len() {
            return Err(MemError::OutOfMemory);
        }
        let start = vec.len();
        vec.extend_from_slice(bytes);
        Ok((start, vec.len()))
    }

    /// Spare append capacity of an arena slot.
    pub fn arena_remaining(&self, id: MemId) -> Result<usize, MemError> {
        let slot = self
            .slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(MemError::InvalidMemId)?;
        match (&slot.bytes, slot.arena) {
            (MemBytes::Owned(vec), true) => Ok(vec.capacity() - vec.len()),
            _ => Err(MemError::InvalidMemId),
        }
    }

    /// Bytes of a live slot; `None` for unknown or inactive ids.
    pub fn get(&self, id: MemId) -> Option<&[u8]> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .map(|s| s.bytes.as_slice())
    }

    /// Swap the bytes of a live slot, releasing any owned allocation it
    /// previously held.
    pub fn replace(&mut self, id: MemId, bytes: MemBytes) -> Result<(), MemError> {
        let slot = self
            .slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(MemError::InvalidMemId)?;
        slot.bytes = bytes;
        slot.arena = false;
        Ok(())
    }

    /// Mark a slot inactive and recycle its id.
    pub fn unregister(&mut self, id: MemId) -> Result<(), MemError> {
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(MemError::InvalidMemId)?;
        if slot.take().is_none() {
            return Err(MemError::InvalidMemId);
        }
        self.free.push(id.index() as u8);
        Ok(())
    }

    /// Release every slot and reset the free list.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Number of live slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
