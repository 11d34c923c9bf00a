//! The file I/O path and lifecycle: the top-level
//! [`FileSystem`] that wires the directory page, the registry, the handle
//! table and the allocator together behind the five operations the rest of
//! the OS actually calls.

use crate::allocator::{self, Allocation};
use crate::block_device::BlockDevice;
use crate::directory::{BLOCK_SIZE, DirectoryPage, FileEntry, MAX_FILENAME_SIZE};
use crate::error::{FsError, INVALID};
use crate::handle::HandleTable;
use crate::partial_io;
use crate::registry::FileRegistry;

/// The two modes `open` accepts. There is no third, unrecognized mode to
/// reject here — the enum itself is the validation a runtime mode check
/// would otherwise need to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Open,
    OpenOrCreate,
}

/// Owns every piece of resident state the core needs: the directory page,
/// the file registry, the handle table, and the block device the partition
/// lives on. Constructed by [`FileSystem::init`], which recovers from
/// whatever the device already holds; there is no separate "mount" step.
pub struct FileSystem<D: BlockDevice> {
    device: D,
    dir: DirectoryPage,
    registry: FileRegistry,
    handles: HandleTable,
    partition_num_blocks: u32,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Recovers the directory page from `device` (or formats a fresh one if
    /// the signature is absent) and rebuilds the registry from whatever
    /// records survive. Safe to call again on the same device after
    /// [`close_fs`](Self::close_fs) — nothing about recovery depends on
    /// process lifetime.
    pub fn init(mut device: D, partition_num_blocks: u32) -> Self {
        let (dir, entries) = DirectoryPage::recover(&mut device);
        Self {
            device,
            dir,
            registry: FileRegistry::from_entries(entries),
            handles: HandleTable::new(),
            partition_num_blocks,
        }
    }

    /// Flushes the directory page. In-memory state (registry, handle table)
    /// is left intact; re-running [`init`](Self::init) on the same device
    /// without a process restart is supported and recovers identically.
    pub fn close_fs(&mut self) -> Result<(), FsError> {
        self.dir.flush(&mut self.device)
    }

    /// Lists every known file as `(filename, size)`, in registry order.
    /// Read-only: does not require a handle and never touches `opened`.
    /// Not part of the original handle-based surface — an installer needs to see
    /// what's already on the partition before deciding what to write next.
    pub fn files(&self) -> impl Iterator<Item = (&[u8], u32)> {
        self.registry.iter().map(|e| (e.filename.as_slice(), e.size))
    }

    /// Total number of known files, including ones with no open handle.
    pub fn file_count(&self) -> usize {
        self.registry.len()
    }

    /// Opens `filename`, creating it when `mode` is
    /// [`OpenMode::OpenOrCreate`] and no entry exists yet. Returns a handle
    /// in `[1, MAX_FD)` on success, `0` on any failure — unknown filename
    /// under `OpenMode::Open`, the file already has a live handle, the
    /// directory page is full, or the handle table is full.
    pub fn open(&mut self, filename: &[u8], mode: OpenMode) -> u32 {
        self.open_inner(filename, mode).unwrap_or(0)
    }

    /// Typed core of [`open`](Self::open). Every rejection named in §4.7
    /// step 1-5 is a distinct [`FsError`] variant here; `open` collapses
    /// all of them to the single sentinel `0` at the boundary.
    fn open_inner(&mut self, filename: &[u8], mode: OpenMode) -> Result<u32, FsError> {
        if filename.is_empty() || filename.len() > MAX_FILENAME_SIZE {
            return Err(FsError::BadFilename);
        }

        let idx = match self.registry.find_by_name(filename) {
            Some(idx) => idx,
            None => {
                if mode != OpenMode::OpenOrCreate {
                    return Err(FsError::NotFound);
                }
                let mut entry = FileEntry::new(filename)?;
                // A directory-full failure here leaks nothing visible —
                // the entry simply never joins the registry, so the
                // caller only ever observes `open` returning 0.
                if self.dir.add_file(&mut entry, &mut self.device).is_err() {
                    log::warn!("directory page full, can't create a new file");
                    return Err(FsError::DirectoryFull);
                }
                log::debug!("created new file entry");
                self.registry.push(entry)
            }
        };

        if self.handles.is_open(idx) {
            return Err(FsError::AlreadyOpen);
        }

        let fd = self.handles.allocate(idx)?;

        if let Some(entry) = self.registry.get_mut(idx) {
            entry.opened = true;
        }
        Ok(fd)
    }

    /// Writes up to `size` bytes of `data` to the open file `fd` at
    /// `offset`, growing the file first if the write extends past its
    /// current size. No sparse writes: a write starting past the current
    /// end is rejected outright rather than zero-filling the gap. Returns
    /// the number of bytes actually written, which may be `0` or short of
    /// `size`.
    pub fn write(&mut self, fd: u32, data: &[u8], size: usize, offset: u32) -> usize {
        self.write_inner(fd, data, size, offset).unwrap_or(0)
    }

    /// Typed core of [`write`](Self::write). §4.7's two "no sparse writes"
    /// rejections (offset past end before expansion, and past end again
    /// after a swallowed expansion failure) both collapse to
    /// [`FsError::OffsetPastEnd`]; `write` collapses everything to `0`.
    fn write_inner(
        &mut self,
        fd: u32,
        data: &[u8],
        size: usize,
        offset: u32,
    ) -> Result<usize, FsError> {
        let idx = self.handles.lookup(fd)?;
        let size = size.min(data.len());

        let cur_size = self
            .registry
            .get(idx)
            .ok_or(FsError::InvalidHandle)?
            .size;

        if offset as u64 + size as u64 > cur_size as u64 {
            if offset > cur_size {
                return Err(FsError::OffsetPastEnd);
            }
            let target = (offset as u64 + size as u64).min(u32::MAX as u64) as u32;
            // Expansion failures are swallowed: the write proceeds against
            // whatever `size` the file ends up with.
            let _ = self.expand_file_size(idx, target);
        }

        let entry = self.registry.get(idx).ok_or(FsError::InvalidHandle)?;
        if offset >= entry.size {
            return Err(FsError::OffsetPastEnd);
        }
        let size = if (entry.size as u64) < offset as u64 + size as u64 {
            (entry.size - offset) as usize
        } else {
            size
        };
        let start_block = entry.start_block;

        let mut remaining = size;
        let mut cur_offset = offset;
        let mut written = 0usize;

        while remaining > 0 {
            let block_num = start_block + cur_offset / BLOCK_SIZE as u32;
            let block_off = (cur_offset % BLOCK_SIZE as u32) as usize;
            let chunk = remaining.min(BLOCK_SIZE - block_off);

            let n = partial_io::write_to_block(
                &mut self.device,
                &data[written..written + chunk],
                block_num,
                block_off,
                chunk,
            );
            written += n;
            if n != chunk {
                break;
            }
            remaining -= chunk;
            cur_offset += chunk as u32;
        }

        Ok(written)
    }

    /// Reads up to `size` bytes from the open file `fd` at `offset` into
    /// `out`, clipped to the file's current logical size. A short device
    /// read aborts the loop early; a request at or past the end of the
    /// file returns `0` without touching `out`.
    pub fn read(&mut self, fd: u32, out: &mut [u8], size: usize, offset: u32) -> usize {
        let idx = match self.handles.lookup(fd) {
            Ok(idx) => idx,
            Err(_) => return 0,
        };
        let size = size.min(out.len());

        let entry = match self.registry.get(idx) {
            Some(e) => e,
            None => return 0,
        };
        if offset >= entry.size {
            return 0;
        }
        let size = if (entry.size as u64) < offset as u64 + size as u64 {
            (entry.size - offset) as usize
        } else {
            size
        };
        let start_block = entry.start_block;

        let mut remaining = size;
        let mut cur_offset = offset;
        let mut total = 0usize;

        while remaining > 0 {
            let block_num = start_block + cur_offset / BLOCK_SIZE as u32;
            let block_off = (cur_offset % BLOCK_SIZE as u32) as usize;
            let chunk = remaining.min(BLOCK_SIZE - block_off);

            let n = partial_io::read_from_block(
                &mut self.device,
                &mut out[total..total + chunk],
                block_num,
                block_off,
                chunk,
            );
            total += n;
            if n != chunk {
                break;
            }
            remaining -= chunk;
            cur_offset += chunk as u32;
        }

        total
    }

    /// Closes `fd`, clearing the file's `opened` flag and freeing the
    /// handle slot for reuse. `0` on success, [`INVALID`] on a bad or
    /// already-closed handle.
    pub fn close(&mut self, fd: u32) -> i32 {
        match self.handles.release(fd) {
            Ok(idx) => {
                if let Some(entry) = self.registry.get_mut(idx) {
                    entry.opened = false;
                }
                0
            }
            Err(e) => e.close_sentinel(),
        }
    }

    /// Grows `entry`'s logical size to `new_size`, allocating blocks only
    /// when the current trailing slack can't absorb the growth. A
    /// no-op when `new_size` doesn't exceed the current size.
    fn expand_file_size(&mut self, idx: usize, new_size: u32) -> Result<(), FsError> {
        let mut entry = self
            .registry
            .get(idx)
            .cloned()
            .ok_or(FsError::InvalidHandle)?;

        if new_size <= entry.size {
            return Ok(());
        }

        let extra = if entry.num_blocks > 0 {
            new_size - entry.size
        } else {
            new_size
        };
        let slack = allocator::trailing_slack(entry.size, entry.num_blocks);
        let needed_blocks = allocator::blocks_needed_for(extra, slack);

        if needed_blocks > 0 {
            let allocation = if entry.num_blocks == 0 {
                let hwm = self.registry.high_water_mark();
                let allocation =
                    allocator::expand_empty_file(hwm, self.partition_num_blocks, needed_blocks)
                        .inspect_err(|_| {
                            log::warn!("no space for a {needed_blocks}-block file at {hwm}")
                        })?;
                log::debug!(
                    "placed new file at block {} ({} block(s))",
                    allocation.start_block,
                    allocation.blocks
                );
                allocation
            } else {
                let next_start = self
                    .registry
                    .next_file_after(entry.start_block + entry.num_blocks)
                    .map(|e| e.start_block);
                let start = allocator::expand_existing_file(
                    entry.start_block,
                    entry.num_blocks,
                    needed_blocks,
                    next_start,
                    self.partition_num_blocks,
                )
                .inspect_err(|_| {
                    log::debug!(
                        "in-place growth of file at block {} blocked by neighbor at {:?}",
                        entry.start_block,
                        next_start
                    )
                })?;
                Allocation {
                    start_block: start,
                    blocks: needed_blocks,
                }
            };

            let zero = [0u8; BLOCK_SIZE];
            for i in 0..allocation.blocks {
                if self.device.write_blocks(&zero, allocation.start_block + i, 1) != BLOCK_SIZE {
                    return Err(FsError::ShortIo);
                }
            }

            if entry.num_blocks == 0 {
                entry.start_block = allocation.start_block;
            }
            entry.num_blocks += allocation.blocks;
        }

        entry.size = new_size;
        self.dir.update_file(&entry, &mut self.device)?;
        *self.registry.get_mut(idx).ok_or(FsError::InvalidHandle)? = entry;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::MemoryBlockDevice;

    fn fs(num_blocks: u32) -> FileSystem<MemoryBlockDevice> {
        FileSystem::init(MemoryBlockDevice::new(num_blocks), num_blocks)
    }

    fn assert_file_eq(fs: &mut FileSystem<MemoryBlockDevice>, name: &[u8], want: &[u8]) {
        let fd = fs.open(name, OpenMode::Open);
        assert_ne!(fd, 0, "expected {name:?} to already exist");
        let mut buf = alloc::vec![0u8; want.len()];
        assert_eq!(fs.read(fd, &mut buf, want.len(), 0), want.len());
        assert_eq!(buf, want);
        assert_eq!(fs.close(fd), 0);
    }

    #[test]
    fn create_write_close_reopen_read() {
        let mut f = fs(200_000);
        let fd = f.open(b"hello", OpenMode::OpenOrCreate);
        assert!((1..crate::handle::MAX_FD as u32).contains(&fd));

        let text = b"This is text in hello";
        assert_eq!(f.write(fd, text, 21, 0), 21);
        assert_eq!(f.close(fd), 0);

        assert_file_eq(&mut f, b"hello", &text[..21]);
    }

    #[test]
    fn four_files_survive_close_fs_and_reinit() {
        let files: [(&[u8], &[u8]); 4] = [
            (b"hello", b"This is text in hello"),
            (b"random", b"aljksdjfalskdfja;slkdfja;s"),
            (b"testing", b"TESTING TESTING"),
            (b"not_testing", b"No testing"),
        ];

        let mut f = fs(200_000);
        for (name, text) in files {
            let fd = f.open(name, OpenMode::OpenOrCreate);
            assert_ne!(fd, 0);
            assert_eq!(f.write(fd, text, text.len(), 0), text.len());
            assert_eq!(f.close(fd), 0);
        }
        for (name, text) in files {
            assert_file_eq(&mut f, name, text);
        }

        f.close_fs().unwrap();
        let mut f = FileSystem::init(f.device, 200_000);
        for (name, text) in files {
            assert_file_eq(&mut f, name, text);
        }
    }

    #[test]
    fn open_missing_file_fails_without_creating_it() {
        let mut f = fs(200_000);
        assert_eq!(f.open(b"missing", OpenMode::Open), 0);
        assert_eq!(f.registry.len(), 0);
    }

    #[test]
    fn double_open_without_close_fails() {
        let mut f = fs(200_000);
        let fd1 = f.open(b"a", OpenMode::OpenOrCreate);
        assert_ne!(fd1, 0);
        assert_eq!(f.open(b"a", OpenMode::OpenOrCreate), 0);
    }

    #[test]
    fn multi_block_write_spans_blocks_and_zero_pads_tail() {
        let mut f = fs(200_000);
        let fd = f.open(b"a", OpenMode::OpenOrCreate);
        let data = alloc::vec![0xABu8; 600];
        assert_eq!(f.write(fd, &data, 600, 0), 600);

        let entry = f.registry.get(0).unwrap();
        assert_eq!(entry.start_block, crate::directory::DIR_BLOCKS as u32);
        assert_eq!(entry.num_blocks, 2);
        assert_eq!(entry.size, 600);

        let mut tail = [0u8; BLOCK_SIZE];
        f.device.read_blocks(&mut tail, entry.start_block + 1, 1);
        assert!(tail[600 - 512..].iter().all(|&b| b == 0));
    }

    #[test]
    fn growth_blocked_by_next_file_yields_short_write() {
        let mut f = fs(200_000);
        let fa = f.open(b"a", OpenMode::OpenOrCreate);
        assert_eq!(f.write(fa, &[1u8; 100], 100, 0), 100);
        assert_eq!(f.close(fa), 0);

        let fb = f.open(b"b", OpenMode::OpenOrCreate);
        assert_eq!(f.write(fb, &[2u8; 100], 100, 0), 100);
        assert_eq!(f.close(fb), 0);

        let fa = f.open(b"a", OpenMode::Open);
        let extra = alloc::vec![3u8; 700];
        let written = f.write(fa, &extra, extra.len(), 0);
        assert_eq!(written, 100);
    }

    #[test]
    fn write_past_end_is_rejected() {
        let mut f = fs(200_000);
        let fd = f.open(b"a", OpenMode::OpenOrCreate);
        assert_eq!(f.write(fd, b"hi", 2, 10), 0);
    }

    #[test]
    fn read_at_or_past_end_returns_zero_without_touching_out() {
        let mut f = fs(200_000);
        let fd = f.open(b"a", OpenMode::OpenOrCreate);
        f.write(fd, b"hi", 2, 0);
        let mut out = [0xffu8; 4];
        assert_eq!(f.read(fd, &mut out, 4, 2), 0);
        assert_eq!(out, [0xff; 4]);
    }

    #[test]
    fn directory_overflow_yields_zero_from_open() {
        let mut f = fs(200_000);
        let mut last = 0;
        for i in 0..10_000usize {
            let name = alloc::format!("f{i}");
            let fd = f.open(name.as_bytes(), OpenMode::OpenOrCreate);
            if fd == 0 {
                break;
            }
            last = i;
            f.close(fd);
        }
        assert!(last > 0);
        assert_eq!(f.open(b"one-too-many", OpenMode::OpenOrCreate), 0);
    }

    #[test]
    fn close_bad_handle_returns_invalid() {
        let mut f = fs(200_000);
        assert_eq!(f.close(5), INVALID);
    }

    #[test]
    fn files_lists_known_entries_regardless_of_open_state() {
        let mut f = fs(200_000);
        assert_eq!(f.file_count(), 0);

        let fd = f.open(b"a", OpenMode::OpenOrCreate);
        f.write(fd, b"xyz", 3, 0);
        f.close(fd);

        assert_eq!(f.file_count(), 1);
        let listed: alloc::vec::Vec<_> = f.files().collect();
        assert_eq!(listed, alloc::vec![(b"a".as_slice(), 3)]);
    }
}
