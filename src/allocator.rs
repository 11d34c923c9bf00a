//! The block-range allocator: append-only, no reuse. Every file's
//! blocks are a single contiguous run; a file either starts at the current
//! high-water mark or grows forward into whatever is free immediately past
//! its own last block. There is no free list and no reclamation —
//! [`release_file_blocks`] is a deliberate no-op, matching a design where
//! closing or "deleting" a file never frees its blocks. Both expansion
//! operations are all-or-nothing: a request that doesn't fully fit fails
//! rather than granting a partial range.

use crate::directory::BLOCK_SIZE;
use crate::error::FsError;

/// A freshly claimed contiguous block run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub start_block: u32,
    pub blocks: u32,
}

/// Claims `needed_blocks` at `high_water_mark`, which the caller must
/// already have floored at `DIR_BLOCKS` (`max(DIR_BLOCKS, ...)`) so
/// that a still-empty partition can't hand out a block the directory page
/// occupies. Fails with [`FsError::NoSpace`] when the run would reach or
/// exceed `partition_num_blocks` — preserved exactly as written (`>=`, not
/// `>`), which leaves the partition's very last block permanently unusable
/// by a fresh allocation.
pub fn expand_empty_file(
    high_water_mark: u32,
    partition_num_blocks: u32,
    needed_blocks: u32,
) -> Result<Allocation, FsError> {
    if high_water_mark + needed_blocks >= partition_num_blocks {
        return Err(FsError::NoSpace);
    }
    Ok(Allocation {
        start_block: high_water_mark,
        blocks: needed_blocks,
    })
}

/// Attempts to extend a file's existing run forward by `additional_blocks`.
/// The only obstruction considered is `next_file_start` — the start block of
/// the nearest other file whose `start_block` is `>=` this file's current
/// end. Only that one neighbor is checked, not every other file's range;
/// sound because the allocator never reuses space, so no other file can
/// have landed between this one and its nearest successor. All-or-nothing:
/// either the whole request is granted or the call fails with
/// [`FsError::NoSpace`] and the file is left exactly as it was.
pub fn expand_existing_file(
    start_block: u32,
    num_blocks: u32,
    additional_blocks: u32,
    next_file_start: Option<u32>,
    partition_num_blocks: u32,
) -> Result<u32, FsError> {
    let region_start = start_block + num_blocks;
    let region_end = region_start + additional_blocks;

    if region_end >= partition_num_blocks {
        return Err(FsError::NoSpace);
    }
    if let Some(next_start) = next_file_start {
        if next_start < region_end {
            return Err(FsError::NoSpace);
        }
    }

    Ok(region_start)
}

/// Bytes of the file's last allocated block not yet occupied by `size`. Zero
/// for an empty file, and zero rather than a full block when `size` lands
/// exactly on a block boundary.
pub fn trailing_slack(size: u32, num_blocks: u32) -> u32 {
    if num_blocks == 0 {
        return 0;
    }
    let rem = size % BLOCK_SIZE as u32;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE as u32 - rem
    }
}

/// Number of whole blocks needed to cover `extra` bytes once `slack` bytes
/// of existing room are used up first.
pub fn blocks_needed_for(extra: u32, slack: u32) -> u32 {
    let remaining = extra.saturating_sub(slack);
    if remaining == 0 {
        0
    } else {
        remaining.div_ceil(BLOCK_SIZE as u32)
    }
}

/// No-op by design: blocks are never returned to a free pool, so closing or
/// replacing a file cannot reclaim its space. Kept as an explicit function so
/// callers document the intent at the call site rather than simply omitting
/// the call.
pub fn release_file_blocks(_start_block: u32, _num_blocks: u32) {}
