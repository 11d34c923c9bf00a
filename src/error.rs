//! Internal error taxonomy and the magic-value sentinels the public API
//! collapses it into. The public API never raises: every failure degenerates
//! to `0`, a negative sentinel, or a short transfer, but internally a typed
//! error still propagates with `?` the way the rest of the core does.

use thiserror::Error;

/// Handle / close failure: bad handle, or `close` on a handle that was
/// never open.
pub const INVALID: i32 = -2;
/// Handle table is full.
pub const EXIST: i32 = -5;
/// Directory page has no room for another record.
pub const MEMORY: i32 = -6;
/// No contiguous block range satisfies the request.
pub const FOUND: i32 = -7;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// §4.7 step 1 ("reject unknown modes"). Never actually constructed:
    /// [`OpenMode`](crate::fs::OpenMode) is a closed two-variant enum, so
    /// the type system already rejects anything that isn't `Open` or
    /// `OpenOrCreate` before `open` ever runs — kept to document the
    /// spec step it stands in for, the same role the enum's own doc
    /// comment already spells out.
    #[error("unrecognized open mode")]
    InvalidMode,
    #[error("handle out of range")]
    InvalidHandle,
    /// §4.7 step 5: `OPEN` of a name with no matching registry entry.
    #[error("no file with this name exists")]
    NotFound,
    #[error("file already open")]
    AlreadyOpen,
    #[error("handle does not refer to an open file")]
    NotOpen,
    #[error("offset lies past the end of the file")]
    OffsetPastEnd,
    #[error("filename is empty or exceeds the maximum length")]
    BadFilename,
    #[error("directory page is full")]
    DirectoryFull,
    #[error("handle table is full")]
    HandleTableFull,
    #[error("no contiguous free block range available")]
    NoSpace,
    #[error("block device reported a short read or write")]
    ShortIo,
}

impl FsError {
    /// Maps an error onto the sentinel `close` is allowed to return.
    /// Every other operation collapses errors to `0` at the call site.
    pub fn close_sentinel(self) -> i32 {
        INVALID
    }
}
