//! The handle table: a bounded map from a small integer handle to
//! an index into the [`FileRegistry`](crate::registry::FileRegistry). Handle
//! `0` is never issued — it is the sentinel `open` returns on failure — so
//! valid handles run `0 < fd < MAX_FD` and bit `i` of the occupancy bitmap
//! tracks handle `i + 1`. Slot `MAX_FD - 1` (which would map to the
//! out-of-range handle `MAX_FD`) is permanently marked occupied in
//! [`HandleTable::new`], the mirror image of the spec's own "bit 0 is
//! permanently set so `0` is never issued" — here the reserved bit sits at
//! the top of the range instead of the bottom because slots are indexed
//! `fd - 1` rather than `fd`.

use crate::bitmap::{clear_bit, first_zero_bit_in_range, set_bit};
use crate::error::FsError;

pub const MAX_FD: usize = 64;

// The occupancy bitmap is packed one bit per handle, so the
// handle space must be a whole number of bytes.
const _: () = assert!(MAX_FD % 8 == 0);

/// Maps an open handle to the registry index of the [`FileEntry`] it was
/// opened against. `MAX_FD` fits in one `u64` occupancy bitmap, one bit per
/// slot.
pub struct HandleTable {
    occupancy: [u8; MAX_FD / 8],
    slots: [usize; MAX_FD],
}

impl HandleTable {
    pub fn new() -> Self {
        let mut occupancy = [0u8; MAX_FD / 8];
        // Reserve the slot that would map to handle MAX_FD, which §3/§4.5
        // place outside the valid range `0 < fd < MAX_FD`.
        set_bit(&mut occupancy, MAX_FD - 1);
        Self {
            occupancy,
            slots: [0usize; MAX_FD],
        }
    }

    /// Claims the lowest free slot and binds it to `registry_idx`, returning
    /// the 1-based handle. Fails when every slot is occupied.
    pub fn allocate(&mut self, registry_idx: usize) -> Result<u32, FsError> {
        let slot = first_zero_bit_in_range(&self.occupancy, 0, MAX_FD)
            .ok_or(FsError::HandleTableFull)?;
        set_bit(&mut self.occupancy, slot);
        self.slots[slot] = registry_idx;
        Ok(slot as u32 + 1)
    }

    /// Resolves a handle to its registry index without releasing it.
    pub fn lookup(&self, fd: u32) -> Result<usize, FsError> {
        let slot = self.slot_of(fd)?;
        if !self.is_set(slot) {
            return Err(FsError::NotOpen);
        }
        Ok(self.slots[slot])
    }

    /// Releases a handle, freeing its slot for reuse.
    pub fn release(&mut self, fd: u32) -> Result<usize, FsError> {
        let slot = self.slot_of(fd)?;
        if !self.is_set(slot) {
            return Err(FsError::NotOpen);
        }
        clear_bit(&mut self.occupancy, slot);
        Ok(self.slots[slot])
    }

    /// True if `registry_idx` already has an open handle pointing at it.
    /// Slot `MAX_FD - 1` is excluded: it's permanently reserved, not a
    /// real open handle, and never carries a meaningful `registry_idx`.
    pub fn is_open(&self, registry_idx: usize) -> bool {
        (0..MAX_FD - 1).any(|slot| self.is_set(slot) && self.slots[slot] == registry_idx)
    }

    fn slot_of(&self, fd: u32) -> Result<usize, FsError> {
        if fd == 0 || fd as usize >= MAX_FD {
            return Err(FsError::InvalidHandle);
        }
        Ok(fd as usize - 1)
    }

    fn is_set(&self, slot: usize) -> bool {
        self.occupancy[slot / 8] & (1 << (slot % 8)) != 0
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
