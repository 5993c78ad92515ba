use std::io::SeekFrom;
use std::sync::Arc;

use crate::return_code::{PalResult, ReturnCode};

use super::file_path::FilePath;

/// Host identifier of an open file.
pub type RawFile = i32;
/// Host identifier of an open directory listing.
pub type RawDir = i32;
/// Host identifier of a transport channel.
pub type RawSocket = i32;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, reading only.
    ReadOnly,
    /// Read-write; created if missing, truncated if present.
    CreateTruncate,
    /// Read-write; created if missing, contents kept if present.
    OpenOrCreate,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }
}

/// What a directory entry refers to, as far as the listing knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Directory,
    File,
    /// The listing carries no type information; callers must `stat` the entry.
    Unknown,
}

/// One entry of a directory listing. `name` is the bare entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The self and parent pseudo-entries.
    pub fn is_dot_entry(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Result of `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,
    pub len: u64,
}

/* 📖 # Why does read_dir return Result<Option<DirEntry>>?

POSIX readdir signals "end of listing" with a null entry and leaves errno untouched, so callers
have to zero errno before every call and inspect it afterwards to tell the end of a listing from
a failure. Folding the three outcomes into one return value removes that discipline:
`Ok(Some(_))` is an entry, `Ok(None)` is the end, `Err(_)` is a read error.
*/

/// POSIX-like filesystem of the host environment. Errors are the host's native codes.
pub trait HostFilesystem {
    fn open_file(&self, path: &FilePath, mode: OpenMode) -> PalResult<RawFile>;

    /// Reads up to `buf.len()` bytes at the current position.
    fn read_file(&self, file: RawFile, buf: &mut [u8]) -> PalResult<usize>;

    /// Writes up to `data.len()` bytes at the current position.
    fn write_file(&self, file: RawFile, data: &[u8]) -> PalResult<usize>;

    /// Moves the position and returns the new absolute position.
    fn seek_file(&self, file: RawFile, pos: SeekFrom) -> PalResult<u64>;

    fn file_length(&self, file: RawFile) -> PalResult<u64>;

    fn close_file(&self, file: RawFile) -> PalResult<()>;

    fn stat(&self, path: &FilePath) -> PalResult<Metadata>;

    fn create_dir(&self, path: &FilePath) -> PalResult<()>;

    fn open_dir(&self, path: &FilePath) -> PalResult<RawDir>;

    /// Next entry of the listing; `.` and `..` may be included.
    fn read_dir(&self, dir: RawDir) -> PalResult<Option<DirEntry>>;

    fn close_dir(&self, dir: RawDir);

    fn change_dir(&self, path: &FilePath) -> PalResult<()>;
}

/// Frame-oriented socket shim of the host environment.
///
/// Every status-bearing call returns the shim's raw integer: non-negative is the success
/// payload, negative is the negated transport error code. Decoding happens in the backend,
/// once per call.
pub trait HostTransport {
    fn socket_create(&self) -> RawSocket;

    fn socket_connect(&self, socket: RawSocket, address: &str, port: u16) -> i32;

    fn socket_close(&self, socket: RawSocket) -> i32;

    /// Bytes accepted.
    fn socket_send(&self, socket: RawSocket, data: &[u8]) -> i32;

    /// Bytes of at most one frame copied into `buf`.
    fn socket_recv(&self, socket: RawSocket, buf: &mut [u8]) -> i32;

    /// Bytes buffered and ready to receive.
    fn socket_pending(&self, socket: RawSocket) -> i32;

    /// Latched socket error, zero when healthy.
    fn socket_error(&self, socket: RawSocket) -> i32;

    /// Readiness bitmask: bit 0 readable, bit 1 writable.
    fn socket_poll(&self, socket: RawSocket) -> i32;
}

/// Single-call services of the host environment.
pub trait HostServices {
    /// Host logging sink.
    fn log(&self, message: &str);

    /// Flush write-behind persistence to durable storage. Fire and forget.
    fn sync_fs(&self);

    /// Open `url` in a new browser tab (or the host's equivalent).
    fn open_url(&self, url: &str) -> PalResult<()>;

    /// Monotonic clock in milliseconds.
    fn now_ms(&self) -> f64;

    fn init_module(&self);

    fn init_sockets(&self);

    /// Error reported while preloading persistent storage, if any.
    fn storage_error(&self) -> Option<String>;
}

/// The complete host environment.
pub trait Host:
    HostFilesystem + HostTransport + HostServices + std::fmt::Debug + Send + Sync + 'static
{
}

impl<T> Host for T where
    T: HostFilesystem + HostTransport + HostServices + std::fmt::Debug + Send + Sync + 'static
{
}

/* 📖 # Why use Arc<dyn Host> with HostHandle?

Owned file and socket handles keep a HostHandle so they can release themselves on drop.
Arc makes that clone cheap and avoids threading a lifetime through every handle type.
*/

/// Shared handle to a host implementation.
#[derive(Debug, Clone)]
pub struct HostHandle(Arc<dyn Host>);

impl HostHandle {
    pub fn new(host: impl Host) -> Self {
        Self(Arc::new(host))
    }
}

impl std::ops::Deref for HostHandle {
    type Target = dyn Host;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Native error code for a failed std I/O call.
///
/// "Not found" and "already exists" always map to the PAL's own codes, whatever number the
/// OS used. Otherwise the OS error number is kept when there is one, and the error kind is
/// mapped onto the closest native code when there is not.
pub fn native_code(err: &std::io::Error) -> ReturnCode {
    use crate::errno::native;
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::NotFound => return ReturnCode::FILE_NOT_FOUND,
        ErrorKind::AlreadyExists => return ReturnCode::DIRECTORY_EXISTS,
        _ => {}
    }
    if let Some(code) = err
        .raw_os_error()
        .and_then(|raw| u32::try_from(raw).ok())
        .and_then(ReturnCode::new)
    {
        return code;
    }
    let raw = match err.kind() {
        ErrorKind::PermissionDenied => native::EACCES,
        ErrorKind::InvalidInput => native::EINVAL,
        _ => native::EIO,
    };
    ReturnCode::new(raw).unwrap_or(ReturnCode::INVALID_ARGUMENT)
}
