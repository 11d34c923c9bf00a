//! The block device interface (BDI): a fixed-size block array external
//! to the core. Whole-block granularity only; failures are reported as a
//! short byte count rather than a typed error, mirroring how the rest of
//! this crate treats I/O.

use crate::directory::BLOCK_SIZE;

/// An abstract, fixed-size array of `num_blocks` blocks, each `BLOCK_SIZE`
/// bytes. Reads of a block that was never written must return zeroes.
pub trait BlockDevice {
    /// Total number of addressable blocks on this device.
    fn num_blocks(&self) -> u32;

    /// Reads `n` consecutive blocks starting at `start` into `buf`, which
    /// must be at least `n * BLOCK_SIZE` bytes. Returns the number of bytes
    /// actually read; a short return is treated as terminal by callers.
    fn read_blocks(&mut self, buf: &mut [u8], start: u32, n: u32) -> usize;

    /// Writes `n` consecutive blocks starting at `start` from `buf`, which
    /// must hold at least `n * BLOCK_SIZE` bytes. Returns the number of
    /// bytes actually written.
    fn write_blocks(&mut self, buf: &[u8], start: u32, n: u32) -> usize;
}

/// An in-memory block device backed by a single zero-initialized buffer.
/// Used by the unit tests in this crate and suitable for any host process
/// that doesn't need the partition to outlive it.
pub struct MemoryBlockDevice {
    blocks: alloc::vec::Vec<u8>,
    num_blocks: u32,
}

impl MemoryBlockDevice {
    pub fn new(num_blocks: u32) -> Self {
        Self {
            blocks: alloc::vec![0u8; num_blocks as usize * BLOCK_SIZE],
            num_blocks,
        }
    }
}

impl BlockDevice for MemoryBlockDevice {
    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn read_blocks(&mut self, buf: &mut [u8], start: u32, n: u32) -> usize {
        let want = n as usize * BLOCK_SIZE;
        if start + n > self.num_blocks || buf.len() < want {
            return 0;
        }
        let off = start as usize * BLOCK_SIZE;
        buf[..want].copy_from_slice(&self.blocks[off..off + want]);
        want
    }

    fn write_blocks(&mut self, buf: &[u8], start: u32, n: u32) -> usize {
        let want = n as usize * BLOCK_SIZE;
        if start + n > self.num_blocks || buf.len() < want {
            return 0;
        }
        let off = start as usize * BLOCK_SIZE;
        self.blocks[off..off + want].copy_from_slice(&buf[..want]);
        want
    }
}

#[cfg(feature = "std")]
pub use host::FileBlockDevice;

#[cfg(feature = "std")]
mod host {
    use super::BlockDevice;
    use crate::directory::BLOCK_SIZE;
    use std::fs::{File, OpenOptions};
    use std::io::{Read, Write};
    use std::path::{Path, PathBuf};

    /// Backs each block with its own small file, named `block<N>.txt`, inside
    /// a host directory. A block that was never written simply has no file
    /// yet and reads back as zeroes — lazy zero-initialization without a
    /// separate format pass.
    pub struct FileBlockDevice {
        dir: PathBuf,
        num_blocks: u32,
    }

    impl FileBlockDevice {
        pub fn new(dir: impl Into<PathBuf>, num_blocks: u32) -> std::io::Result<Self> {
            let dir = dir.into();
            std::fs::create_dir_all(&dir)?;
            Ok(Self { dir, num_blocks })
        }

        fn block_path(&self, idx: u32) -> PathBuf {
            self.dir.join(alloc::format!("block{idx}.txt"))
        }
    }

    impl BlockDevice for FileBlockDevice {
        fn num_blocks(&self) -> u32 {
            self.num_blocks
        }

        fn read_blocks(&mut self, buf: &mut [u8], start: u32, n: u32) -> usize {
            let want = n as usize * BLOCK_SIZE;
            if start + n > self.num_blocks || buf.len() < want {
                return 0;
            }

            for i in 0..n {
                let dst = &mut buf[i as usize * BLOCK_SIZE..(i as usize + 1) * BLOCK_SIZE];
                match File::open(self.block_path(start + i)) {
                    Ok(mut f) => {
                        dst.fill(0);
                        if f.read_exact(dst).is_err() {
                            log::warn!("short read on block {}", start + i);
                            return i as usize * BLOCK_SIZE;
                        }
                    }
                    Err(_) => dst.fill(0),
                }
            }
            want
        }

        fn write_blocks(&mut self, buf: &[u8], start: u32, n: u32) -> usize {
            let want = n as usize * BLOCK_SIZE;
            if start + n > self.num_blocks || buf.len() < want {
                return 0;
            }

            for i in 0..n {
                let src = &buf[i as usize * BLOCK_SIZE..(i as usize + 1) * BLOCK_SIZE];
                let path: &Path = &self.block_path(start + i);
                let file = OpenOptions::new().write(true).create(true).truncate(true).open(path);
                match file.and_then(|mut f| f.write_all(src)) {
                    Ok(()) => {}
                    Err(_) => {
                        log::warn!("short write on block {}", start + i);
                        return i as usize * BLOCK_SIZE;
                    }
                }
            }
            want
        }
    }
}
