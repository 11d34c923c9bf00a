//! The directory page: a resident, byte-exact copy of the first
//! [`DIR_BLOCKS`] blocks of the partition, holding a signature, a file
//! count, and a packed sequence of [`FileEntry`] records. Flushed back to
//! storage after every mutation; deletions and renames are unsupported so
//! records never move once written.

use dvida_serialize::{DvDeErr, DvDeserialize, DvSerErr, DvSerialize, Endianness};
use heapless::Vec as HVec;

use crate::block_device::BlockDevice;
use crate::error::FsError;

pub const BLOCK_SIZE: usize = 512;
pub const DIR_BLOCKS: usize = 2;
pub const DIR_DATA_SIZE: usize = DIR_BLOCKS * BLOCK_SIZE;
pub const MAX_FILENAME_SIZE: usize = 256;

const SIGNATURE: [u8; 4] = *b"$%^&";
const HEADER_SIZE: usize = 6;

/// One record per known file. `dir_offset` is the exact byte position
/// in the directory page where this record lives; it never changes once
/// assigned because filename length is immutable after creation.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub filename: HVec<u8, MAX_FILENAME_SIZE>,
    pub start_block: u32,
    pub num_blocks: u32,
    pub size: u32,
    pub dir_offset: u16,
    pub opened: bool,
}

impl FileEntry {
    pub fn new(filename: &[u8]) -> Result<Self, FsError> {
        if filename.is_empty() || filename.len() > MAX_FILENAME_SIZE {
            return Err(FsError::BadFilename);
        }
        let mut buf = HVec::new();
        buf.extend_from_slice(filename)
            .map_err(|_| FsError::BadFilename)?;
        Ok(Self {
            filename: buf,
            start_block: 0,
            num_blocks: 0,
            size: 0,
            dir_offset: 0,
            opened: false,
        })
    }

    /// Byte length of this record as serialized on disk:
    /// `filename_len + 15` (2 + filename_len + 1 + 4 + 4 + 4).
    pub fn record_len(&self) -> usize {
        self.filename.len() + 15
    }
}

impl DvSerialize for FileEntry {
    fn serialize(&self, endianness: Endianness, target: &mut [u8]) -> Result<usize, DvSerErr> {
        let mut acc = 0;

        acc += (self.filename.len() as u16).serialize(endianness, &mut target[acc..])?;
        let name_end = acc + self.filename.len();
        if target.len() < name_end + 1 {
            return Err(DvSerErr::BufferTooSmall);
        }
        target[acc..name_end].copy_from_slice(&self.filename);
        target[name_end] = 0;
        acc = name_end + 1;

        acc += self.start_block.serialize(endianness, &mut target[acc..])?;
        acc += self.num_blocks.serialize(endianness, &mut target[acc..])?;
        acc += self.size.serialize(endianness, &mut target[acc..])?;

        Ok(acc)
    }
}

impl DvDeserialize for FileEntry {
    fn deserialize(endianness: Endianness, input: &[u8]) -> Result<(Self, usize), DvDeErr> {
        let mut acc = 0;

        let (filename_len, size) = u16::deserialize(endianness, &input[acc..])?;
        acc += size;
        let filename_len = filename_len as usize;

        if filename_len == 0 || filename_len > MAX_FILENAME_SIZE {
            return Err(DvDeErr::WrongBufferSize);
        }
        if input.len() < acc + filename_len + 1 {
            return Err(DvDeErr::WrongBufferSize);
        }

        let mut filename = HVec::new();
        filename
            .extend_from_slice(&input[acc..acc + filename_len])
            .map_err(|_| DvDeErr::WrongBufferSize)?;
        acc += filename_len + 1; // skip the NUL terminator

        let (start_block, size) = u32::deserialize(endianness, &input[acc..])?;
        acc += size;
        let (num_blocks, size) = u32::deserialize(endianness, &input[acc..])?;
        acc += size;
        let (file_size, size) = u32::deserialize(endianness, &input[acc..])?;
        acc += size;

        Ok((
            FileEntry {
                filename,
                start_block,
                num_blocks,
                size: file_size,
                dir_offset: 0,
                opened: false,
            },
            acc,
        ))
    }
}

/// Resident copy of blocks `[0, DIR_BLOCKS)`.
pub struct DirectoryPage {
    buf: [u8; DIR_DATA_SIZE],
    /// append cursor: next free byte after the last record
    dir_ptr: usize,
}

impl DirectoryPage {
    /// Initializes a fresh, empty page.
    pub fn format() -> Self {
        let mut buf = [0u8; DIR_DATA_SIZE];
        buf[0..4].copy_from_slice(&SIGNATURE);
        0u16.serialize(Endianness::Little, &mut buf[4..6]).ok();
        Self {
            buf,
            dir_ptr: HEADER_SIZE,
        }
    }

    fn file_count(&self) -> u16 {
        u16::deserialize(Endianness::Little, &self.buf[4..6])
            .map(|(v, _)| v)
            .unwrap_or(0)
    }

    fn set_file_count(&mut self, count: u16) {
        count.serialize(Endianness::Little, &mut self.buf[4..6]).ok();
    }

    /// Reads blocks `[0, DIR_BLOCKS)` from `device` and attempts recovery.
    /// Returns the page plus whatever entries were successfully decoded
    /// before the first bounds failure or malformed record silently
    /// truncated the scan.
    pub fn recover(device: &mut impl BlockDevice) -> (Self, alloc::vec::Vec<FileEntry>) {
        let mut buf = [0u8; DIR_DATA_SIZE];
        device.read_blocks(&mut buf, 0, DIR_BLOCKS as u32);

        if buf[0..4] != SIGNATURE {
            return (Self::format(), alloc::vec::Vec::new());
        }

        let mut page = Self {
            buf,
            dir_ptr: HEADER_SIZE,
        };
        let target = page.file_count();
        let mut entries = alloc::vec::Vec::new();
        let mut offset = HEADER_SIZE;

        while (entries.len() as u16) < target {
            if offset >= DIR_DATA_SIZE {
                log::warn!(
                    "directory recovery stopped at {} of {} records: ran off the end of the page",
                    entries.len(),
                    target
                );
                break;
            }
            match FileEntry::deserialize(Endianness::Little, &page.buf[offset..]) {
                Ok((mut entry, consumed)) => {
                    entry.dir_offset = offset as u16;
                    offset += consumed;
                    entries.push(entry);
                }
                Err(_) => {
                    log::warn!(
                        "directory recovery stopped at {} of {} records: malformed record at offset {offset}",
                        entries.len(),
                        target
                    );
                    break;
                }
            }
        }

        log::debug!("recovered {} file record(s) from the directory page", entries.len());
        page.dir_ptr = offset;
        (page, entries)
    }

    /// Appends a new record, stamping `entry.dir_offset`, and flushes.
    /// Fails with [`FsError::DirectoryFull`] when the record would overflow
    /// the page.
    pub fn add_file(
        &mut self,
        entry: &mut FileEntry,
        device: &mut impl BlockDevice,
    ) -> Result<(), FsError> {
        let len = entry.record_len();
        if self.dir_ptr + len > DIR_DATA_SIZE {
            return Err(FsError::DirectoryFull);
        }

        entry.dir_offset = self.dir_ptr as u16;
        entry
            .serialize(Endianness::Little, &mut self.buf[self.dir_ptr..self.dir_ptr + len])
            .map_err(|_| FsError::DirectoryFull)?;
        self.dir_ptr += len;

        let count = self.file_count();
        self.set_file_count(count + 1);

        self.flush(device)
    }

    /// Rewrites a record in place. The record length never changes because
    /// filenames are immutable after creation.
    pub fn update_file(
        &mut self,
        entry: &FileEntry,
        device: &mut impl BlockDevice,
    ) -> Result<(), FsError> {
        let off = entry.dir_offset as usize;
        let len = entry.record_len();
        entry
            .serialize(Endianness::Little, &mut self.buf[off..off + len])
            .map_err(|_| FsError::DirectoryFull)?;
        self.flush(device)
    }

    pub fn flush(&self, device: &mut impl BlockDevice) -> Result<(), FsError> {
        let written = device.write_blocks(&self.buf, 0, DIR_BLOCKS as u32);
        if written != DIR_DATA_SIZE {
            return Err(FsError::ShortIo);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::MemoryBlockDevice;

    #[test]
    fn fresh_page_has_the_exact_header_bytes() {
        let page = DirectoryPage::format();
        assert_eq!(&page.buf[0..4], &SIGNATURE);
        assert_eq!(&page.buf[4..6], &[0, 0]); // file_count = 0, little-endian
        assert_eq!(page.dir_ptr, HEADER_SIZE);
    }

    #[test]
    fn record_len_matches_filename_len_plus_15() {
        let entry = FileEntry::new(b"hello").unwrap();
        // 2 (u16 len) + 5 (name) + 1 (NUL) + 4 + 4 + 4 = filename_len + 15
        assert_eq!(entry.record_len(), 5 + 15);
    }

    #[test]
    fn serialize_writes_the_exact_byte_layout() {
        let mut entry = FileEntry::new(b"ab").unwrap();
        entry.start_block = 0x0201_0000;
        entry.num_blocks = 7;
        entry.size = 0x0000_0100;

        let mut buf = [0xffu8; 17];
        let n = entry.serialize(Endianness::Little, &mut buf).unwrap();

        assert_eq!(n, 2 + 15);
        assert_eq!(&buf[0..2], &2u16.to_le_bytes()); // filename_len
        assert_eq!(&buf[2..4], b"ab"); // filename bytes
        assert_eq!(buf[4], 0); // NUL terminator
        assert_eq!(&buf[5..9], &entry.start_block.to_le_bytes());
        assert_eq!(&buf[9..13], &entry.num_blocks.to_le_bytes());
        assert_eq!(&buf[13..17], &entry.size.to_le_bytes());
    }

    #[test]
    fn add_file_stamps_dir_offset_and_bumps_file_count() {
        let mut dev = MemoryBlockDevice::new(4);
        let mut page = DirectoryPage::format();

        let mut a = FileEntry::new(b"a").unwrap();
        page.add_file(&mut a, &mut dev).unwrap();
        assert_eq!(a.dir_offset, HEADER_SIZE as u16);
        assert_eq!(page.file_count(), 1);
        assert_eq!(page.dir_ptr, HEADER_SIZE + a.record_len());

        let mut b = FileEntry::new(b"bb").unwrap();
        page.add_file(&mut b, &mut dev).unwrap();
        assert_eq!(b.dir_offset, (HEADER_SIZE + a.record_len()) as u16);
        assert_eq!(page.file_count(), 2);
    }

    #[test]
    fn add_file_past_capacity_fails_with_directory_full() {
        let mut dev = MemoryBlockDevice::new(4);
        let mut page = DirectoryPage::format();
        page.dir_ptr = DIR_DATA_SIZE - 5;

        let mut entry = FileEntry::new(b"toolong").unwrap();
        assert!(matches!(
            page.add_file(&mut entry, &mut dev),
            Err(FsError::DirectoryFull)
        ));
    }

    #[test]
    fn recover_round_trips_every_field_through_the_block_device() {
        let mut dev = MemoryBlockDevice::new(4);
        let mut page = DirectoryPage::format();

        let mut a = FileEntry::new(b"hello").unwrap();
        a.start_block = 2;
        a.num_blocks = 1;
        a.size = 21;
        page.add_file(&mut a, &mut dev).unwrap();

        let mut b = FileEntry::new(b"random").unwrap();
        b.start_block = 3;
        b.num_blocks = 1;
        b.size = 26;
        page.add_file(&mut b, &mut dev).unwrap();

        let (recovered_page, entries) = DirectoryPage::recover(&mut dev);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].filename.as_slice(), b"hello");
        assert_eq!(entries[0].start_block, 2);
        assert_eq!(entries[0].num_blocks, 1);
        assert_eq!(entries[0].size, 21);
        assert_eq!(entries[0].dir_offset, HEADER_SIZE as u16);
        assert_eq!(entries[1].filename.as_slice(), b"random");
        assert_eq!(entries[1].size, 26);
        assert_eq!(recovered_page.dir_ptr, page.dir_ptr);
        assert_eq!(recovered_page.file_count(), 2);
    }

    #[test]
    fn recover_with_no_signature_formats_a_fresh_page() {
        let mut dev = MemoryBlockDevice::new(4);
        let (page, entries) = DirectoryPage::recover(&mut dev);
        assert!(entries.is_empty());
        assert_eq!(&page.buf[0..4], &SIGNATURE);
        assert_eq!(page.dir_ptr, HEADER_SIZE);
    }
}
