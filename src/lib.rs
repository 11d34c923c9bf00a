#![cfg_attr(not(any(test, feature = "std")), no_std)]
//! Flat-namespace file system core.
//!
//! Lays a minimal, persistent, flat-namespace file system over a fixed-size
//! block-addressed partition. The partition is abstracted behind
//! [`BlockDevice`]; everything above that line — the directory page, the
//! file registry, the handle table and the append-only allocator — is
//! implemented here and is free of any host or hardware dependency.

extern crate alloc;

pub mod allocator;
pub mod bitmap;
pub mod block_device;
pub mod directory;
pub mod error;
pub mod fs;
pub mod handle;
pub mod partial_io;
pub mod registry;

pub use block_device::BlockDevice;
pub use directory::{BLOCK_SIZE, DIR_BLOCKS, DIR_DATA_SIZE, MAX_FILENAME_SIZE};
pub use error::{EXIST, FOUND, INVALID, MEMORY};
pub use fs::{FileSystem, OpenMode};
pub use handle::MAX_FD;
