//! The partial-block I/O helper: converts a byte-granular
//! `(block, offset, len)` request into whole-block reads and writes against
//! a [`BlockDevice`]. Every write that doesn't cover a full block pays for a
//! read-modify-write; every operation is confined to exactly one block, so
//! the file I/O path (`fs.rs`) is the one that loops across a multi-block
//! transfer.

use crate::block_device::BlockDevice;
use crate::directory::BLOCK_SIZE;

/// Copies `len` bytes starting at `block_off` within block `block` into
/// `dst`. Requires `block_off + len <= BLOCK_SIZE`; returns `0` on any
/// validation failure or short read from the device, `len` on success.
pub fn read_from_block(
    device: &mut impl BlockDevice,
    dst: &mut [u8],
    block: u32,
    block_off: usize,
    len: usize,
) -> usize {
    if block_off + len > BLOCK_SIZE || dst.len() < len {
        return 0;
    }

    let mut buf = [0u8; BLOCK_SIZE];
    if device.read_blocks(&mut buf, block, 1) != BLOCK_SIZE {
        return 0;
    }

    dst[..len].copy_from_slice(&buf[block_off..block_off + len]);
    len
}

/// Splices `len` bytes of `src` into block `block` at `block_off`. A write
/// covering the whole block skips the read; anything smaller reads the
/// block first, splices the new bytes in, then writes the block back.
/// Requires `block_off + len <= BLOCK_SIZE`; returns `0` on any validation
/// failure or short device I/O, `len` on success.
pub fn write_to_block(
    device: &mut impl BlockDevice,
    src: &[u8],
    block: u32,
    block_off: usize,
    len: usize,
) -> usize {
    if block_off + len > BLOCK_SIZE || src.len() < len {
        return 0;
    }

    let mut buf = [0u8; BLOCK_SIZE];
    if (block_off, len) != (0, BLOCK_SIZE) {
        if device.read_blocks(&mut buf, block, 1) != BLOCK_SIZE {
            return 0;
        }
    }
    buf[block_off..block_off + len].copy_from_slice(&src[..len]);

    if device.write_blocks(&buf, block, 1) != BLOCK_SIZE {
        return 0;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::MemoryBlockDevice;

    #[test]
    fn full_block_write_skips_read_modify_write() {
        let mut dev = MemoryBlockDevice::new(4);
        let data = [7u8; BLOCK_SIZE];
        assert_eq!(write_to_block(&mut dev, &data, 1, 0, BLOCK_SIZE), BLOCK_SIZE);
        let mut out = [0u8; BLOCK_SIZE];
        assert_eq!(read_from_block(&mut dev, &mut out, 1, 0, BLOCK_SIZE), BLOCK_SIZE);
        assert_eq!(out, data);
    }

    #[test]
    fn partial_write_preserves_untouched_bytes() {
        let mut dev = MemoryBlockDevice::new(4);
        let full = [9u8; BLOCK_SIZE];
        write_to_block(&mut dev, &full, 0, 0, BLOCK_SIZE);

        write_to_block(&mut dev, &[1, 2, 3], 0, 10, 3);

        let mut out = [0u8; BLOCK_SIZE];
        read_from_block(&mut dev, &mut out, 0, 0, BLOCK_SIZE);
        assert_eq!(&out[10..13], &[1, 2, 3]);
        assert_eq!(out[9], 9);
        assert_eq!(out[13], 9);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let mut dev = MemoryBlockDevice::new(4);
        let mut out = [0u8; BLOCK_SIZE];
        assert_eq!(read_from_block(&mut dev, &mut out, 0, 500, 100), 0);
    }

    #[test]
    fn unwritten_block_reads_as_zero() {
        let mut dev = MemoryBlockDevice::new(4);
        let mut out = [0xffu8; 16];
        assert_eq!(read_from_block(&mut dev, &mut out, 2, 0, 16), 16);
        assert_eq!(out, [0u8; 16]);
    }
}
