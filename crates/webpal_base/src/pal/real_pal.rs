use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::errno::native;
use crate::return_code::{PalResult, ReturnCode};

use super::FilePath;
use super::tcp_transport::TcpTransport;
use super::traits::{
    DirEntry, EntryKind, HostFilesystem, HostServices, HostTransport, Metadata, OpenMode, RawDir,
    RawFile, RawSocket, native_code,
};

/* 📖 # Why hand out integer handles from a std::fs backed host?

The collaborator contract is the one the browser shim offers: open returns a number, later calls
pass that number back. Keeping StdFilesystem on the same contract means the backend has exactly
one code path, and the owned File/Socket wrappers in the backend are what give callers RAII.
*/

/// Owner read/write, group and others read.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;
/// Owner and group read/write/search, others read/search.
#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o775;

/// Host filesystem backed by `std::fs`, rooted at a base directory.
///
/// Namespace paths never leave the base directory: `/classicube` resolves to
/// `<base>/classicube`. Relative paths resolve against the current directory set with
/// `change_dir`, which starts at the root.
#[derive(Debug)]
pub struct StdFilesystem {
    base_dir: PathBuf,
    state: Mutex<FsState>,
}

#[derive(Debug, Default)]
struct FsState {
    cwd: String,
    next_handle: i32,
    files: HashMap<RawFile, fs::File>,
    dirs: HashMap<RawDir, fs::ReadDir>,
}

impl FsState {
    fn allocate_handle(&mut self) -> i32 {
        self.next_handle += 1;
        self.next_handle
    }
}

fn bad_handle() -> ReturnCode {
    ReturnCode::new(native::EBADF).unwrap_or(ReturnCode::INVALID_ARGUMENT)
}

fn kind_of(file_type: fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Unknown
    }
}

impl StdFilesystem {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            state: Mutex::new(FsState::default()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Normalised namespace key of `path`, taken relative to the current directory.
    ///
    /// A key that climbs above the root names nothing in the namespace.
    fn namespace_key(&self, path: &FilePath) -> PalResult<String> {
        let cwd = self.state.lock().cwd.clone();
        let key = if path.is_absolute() || cwd.is_empty() {
            path.normalized()
        } else {
            FilePath::from(format!("{}/{}", cwd, path)).normalized()
        };
        if key == ".." || key.starts_with("../") {
            debug!(path = %path, "path climbs above the root");
            return Err(ReturnCode::FILE_NOT_FOUND);
        }
        Ok(key)
    }

    fn resolve_path(&self, path: &FilePath) -> PalResult<PathBuf> {
        let key = self.namespace_key(path)?;
        Ok(FilePath::from(key.as_str()).to_path(&self.base_dir))
    }

    fn open_options(mode: OpenMode) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        match mode {
            OpenMode::ReadOnly => options.read(true),
            OpenMode::CreateTruncate => options.read(true).write(true).create(true).truncate(true),
            OpenMode::OpenOrCreate => options.read(true).write(true).create(true),
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        options
    }
}

impl HostFilesystem for StdFilesystem {
    #[instrument(skip(self), fields(path = %path))]
    fn open_file(&self, path: &FilePath, mode: OpenMode) -> PalResult<RawFile> {
        let resolved = self.resolve_path(path)?;
        let file = Self::open_options(mode).open(&resolved).map_err(|e| {
            debug!(resolved = %resolved.display(), error = %e, "failed to open file");
            native_code(&e)
        })?;
        let mut state = self.state.lock();
        let handle = state.allocate_handle();
        state.files.insert(handle, file);
        debug!(handle, "file opened");
        Ok(handle)
    }

    fn read_file(&self, file: RawFile, buf: &mut [u8]) -> PalResult<usize> {
        let mut state = self.state.lock();
        let handle = state.files.get_mut(&file).ok_or_else(bad_handle)?;
        handle.read(buf).map_err(|e| native_code(&e))
    }

    fn write_file(&self, file: RawFile, data: &[u8]) -> PalResult<usize> {
        let mut state = self.state.lock();
        let handle = state.files.get_mut(&file).ok_or_else(bad_handle)?;
        handle.write(data).map_err(|e| native_code(&e))
    }

    fn seek_file(&self, file: RawFile, pos: SeekFrom) -> PalResult<u64> {
        let mut state = self.state.lock();
        let handle = state.files.get_mut(&file).ok_or_else(bad_handle)?;
        handle.seek(pos).map_err(|e| native_code(&e))
    }

    fn file_length(&self, file: RawFile) -> PalResult<u64> {
        let state = self.state.lock();
        let handle = state.files.get(&file).ok_or_else(bad_handle)?;
        handle
            .metadata()
            .map(|meta| meta.len())
            .map_err(|e| native_code(&e))
    }

    #[instrument(skip(self))]
    fn close_file(&self, file: RawFile) -> PalResult<()> {
        // Dropping the std handle closes the descriptor.
        self.state.lock().files.remove(&file).ok_or_else(bad_handle)?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    fn stat(&self, path: &FilePath) -> PalResult<Metadata> {
        let meta = fs::metadata(self.resolve_path(path)?).map_err(|e| native_code(&e))?;
        Ok(Metadata {
            kind: kind_of(meta.file_type()),
            len: meta.len(),
        })
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_dir(&self, path: &FilePath) -> PalResult<()> {
        let resolved = self.resolve_path(path)?;
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIRECTORY_MODE);
        }
        builder.create(&resolved).map_err(|e| {
            debug!(resolved = %resolved.display(), error = %e, "failed to create directory");
            native_code(&e)
        })
    }

    #[instrument(skip(self), fields(path = %path))]
    fn open_dir(&self, path: &FilePath) -> PalResult<RawDir> {
        let listing = fs::read_dir(self.resolve_path(path)?).map_err(|e| native_code(&e))?;
        let mut state = self.state.lock();
        let handle = state.allocate_handle();
        state.dirs.insert(handle, listing);
        Ok(handle)
    }

    fn read_dir(&self, dir: RawDir) -> PalResult<Option<DirEntry>> {
        let mut state = self.state.lock();
        let listing = state.dirs.get_mut(&dir).ok_or_else(bad_handle)?;
        match listing.next() {
            None => Ok(None),
            Some(Err(e)) => Err(native_code(&e)),
            Some(Ok(entry)) => {
                let kind = entry.file_type().map_or(EntryKind::Unknown, kind_of);
                let name = entry.file_name().to_string_lossy().into_owned();
                Ok(Some(DirEntry::new(name, kind)))
            }
        }
    }

    fn close_dir(&self, dir: RawDir) {
        self.state.lock().dirs.remove(&dir);
    }

    #[instrument(skip(self), fields(path = %path))]
    fn change_dir(&self, path: &FilePath) -> PalResult<()> {
        let key = self.namespace_key(path)?;
        let resolved = FilePath::from(key.as_str()).to_path(&self.base_dir);
        let meta = fs::metadata(&resolved).map_err(|e| native_code(&e))?;
        if !meta.is_dir() {
            return Err(ReturnCode::new(native::ENOTDIR).unwrap_or(ReturnCode::INVALID_ARGUMENT));
        }
        let mut state = self.state.lock();
        state.cwd = key;
        debug!(cwd = %state.cwd, "changed current directory");
        Ok(())
    }
}

/// Concrete host for running the backend natively.
///
/// Files come from [`StdFilesystem`], sockets from [`TcpTransport`]; log messages go to
/// `tracing`. There is no write-behind layer to flush and no browser to open URLs in.
#[derive(Debug)]
pub struct StdHost {
    fs: StdFilesystem,
    transport: TcpTransport,
    started: Instant,
}

impl StdHost {
    /// Create a host whose filesystem root is `base_dir`.
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            fs: StdFilesystem::new(base_dir),
            transport: TcpTransport::new(),
            started: Instant::now(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        self.fs.base_dir()
    }
}

impl HostFilesystem for StdHost {
    fn open_file(&self, path: &FilePath, mode: OpenMode) -> PalResult<RawFile> {
        self.fs.open_file(path, mode)
    }

    fn read_file(&self, file: RawFile, buf: &mut [u8]) -> PalResult<usize> {
        self.fs.read_file(file, buf)
    }

    fn write_file(&self, file: RawFile, data: &[u8]) -> PalResult<usize> {
        self.fs.write_file(file, data)
    }

    fn seek_file(&self, file: RawFile, pos: SeekFrom) -> PalResult<u64> {
        self.fs.seek_file(file, pos)
    }

    fn file_length(&self, file: RawFile) -> PalResult<u64> {
        self.fs.file_length(file)
    }

    fn close_file(&self, file: RawFile) -> PalResult<()> {
        self.fs.close_file(file)
    }

    fn stat(&self, path: &FilePath) -> PalResult<Metadata> {
        self.fs.stat(path)
    }

    fn create_dir(&self, path: &FilePath) -> PalResult<()> {
        self.fs.create_dir(path)
    }

    fn open_dir(&self, path: &FilePath) -> PalResult<RawDir> {
        self.fs.open_dir(path)
    }

    fn read_dir(&self, dir: RawDir) -> PalResult<Option<DirEntry>> {
        self.fs.read_dir(dir)
    }

    fn close_dir(&self, dir: RawDir) {
        self.fs.close_dir(dir)
    }

    fn change_dir(&self, path: &FilePath) -> PalResult<()> {
        self.fs.change_dir(path)
    }
}

impl HostTransport for StdHost {
    fn socket_create(&self) -> RawSocket {
        self.transport.socket_create()
    }

    fn socket_connect(&self, socket: RawSocket, address: &str, port: u16) -> i32 {
        self.transport.socket_connect(socket, address, port)
    }

    fn socket_close(&self, socket: RawSocket) -> i32 {
        self.transport.socket_close(socket)
    }

    fn socket_send(&self, socket: RawSocket, data: &[u8]) -> i32 {
        self.transport.socket_send(socket, data)
    }

    fn socket_recv(&self, socket: RawSocket, buf: &mut [u8]) -> i32 {
        self.transport.socket_recv(socket, buf)
    }

    fn socket_pending(&self, socket: RawSocket) -> i32 {
        self.transport.socket_pending(socket)
    }

    fn socket_error(&self, socket: RawSocket) -> i32 {
        self.transport.socket_error(socket)
    }

    fn socket_poll(&self, socket: RawSocket) -> i32 {
        self.transport.socket_poll(socket)
    }
}

impl HostServices for StdHost {
    fn log(&self, message: &str) {
        info!(target: "webpal::host", "{}", message);
    }

    fn sync_fs(&self) {
        debug!("sync requested; std::fs has no write-behind layer");
    }

    fn open_url(&self, url: &str) -> PalResult<()> {
        debug!(url, "opening URLs is not available natively");
        Err(ReturnCode::NOT_SUPPORTED)
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn init_module(&self) {
        debug!(base_dir = %self.fs.base_dir().display(), "native host ready");
    }

    fn init_sockets(&self) {}

    fn storage_error(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> (tempfile::TempDir, StdHost) {
        let dir = tempfile::tempdir().unwrap();
        let host = StdHost::new(dir.path().to_path_buf());
        (dir, host)
    }

    #[test]
    fn test_write_then_read_back() {
        let (_dir, host) = host();
        let file = host
            .open_file(&FilePath::from("out.txt"), OpenMode::CreateTruncate)
            .unwrap();
        assert_eq!(host.write_file(file, b"hello").unwrap(), 5);
        host.close_file(file).unwrap();

        let file = host
            .open_file(&FilePath::from("out.txt"), OpenMode::ReadOnly)
            .unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(host.read_file(file, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(host.file_length(file).unwrap(), 5);
        host.close_file(file).unwrap();
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let (_dir, host) = host();
        let result = host.open_file(&FilePath::from("nope.txt"), OpenMode::ReadOnly);
        assert_eq!(result, Err(ReturnCode::FILE_NOT_FOUND));
    }

    #[test]
    fn test_create_dir_twice_reports_exists() {
        let (_dir, host) = host();
        host.create_dir(&FilePath::from("maps")).unwrap();
        assert_eq!(
            host.create_dir(&FilePath::from("maps")),
            Err(ReturnCode::DIRECTORY_EXISTS)
        );
    }

    #[test]
    fn test_absolute_paths_stay_below_base() {
        let (dir, host) = host();
        host.create_dir(&FilePath::from("/classicube")).unwrap();
        assert!(dir.path().join("classicube").is_dir());
    }

    #[test]
    fn test_parent_paths_do_not_leave_base() {
        let outer = tempfile::tempdir().unwrap();
        let base = outer.path().join("root");
        fs::create_dir(&base).unwrap();
        fs::write(outer.path().join("secret.txt"), b"outside").unwrap();
        let host = StdHost::new(base);

        for path in ["../secret.txt", "/../secret.txt", "maps/../../secret.txt"] {
            let result = host.open_file(&FilePath::from(path), OpenMode::ReadOnly);
            assert_eq!(result, Err(ReturnCode::FILE_NOT_FOUND), "{path}");
        }
        assert_eq!(
            host.stat(&FilePath::from("../secret.txt")),
            Err(ReturnCode::FILE_NOT_FOUND)
        );
        assert_eq!(
            host.change_dir(&FilePath::from("..")),
            Err(ReturnCode::FILE_NOT_FOUND)
        );
        assert_eq!(
            host.open_file(&FilePath::from("../planted.txt"), OpenMode::CreateTruncate),
            Err(ReturnCode::FILE_NOT_FOUND)
        );
        assert!(!outer.path().join("planted.txt").exists());
    }

    #[test]
    fn test_change_dir_resolves_relative_paths() {
        let (dir, host) = host();
        fs::create_dir(dir.path().join("classicube")).unwrap();
        fs::write(dir.path().join("classicube/options.txt"), b"opts").unwrap();

        host.change_dir(&FilePath::from("/classicube")).unwrap();
        let meta = host.stat(&FilePath::from("options.txt")).unwrap();
        assert_eq!(meta.kind, EntryKind::File);
        assert_eq!(meta.len, 4);
    }

    #[test]
    fn test_read_dir_lists_entries_then_ends() {
        let (dir, host) = host();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();

        let listing = host.open_dir(&FilePath::from(".")).unwrap();
        let mut entries = Vec::new();
        while let Some(entry) = host.read_dir(listing).unwrap() {
            entries.push(entry);
        }
        host.close_dir(listing);
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                DirEntry::new("a.txt", EntryKind::File),
                DirEntry::new("sub", EntryKind::Directory),
            ]
        );
    }

    #[test]
    fn test_closed_handle_is_rejected() {
        let (_dir, host) = host();
        let file = host
            .open_file(&FilePath::from("x.bin"), OpenMode::CreateTruncate)
            .unwrap();
        host.close_file(file).unwrap();
        assert_eq!(host.close_file(file), Err(bad_handle()));
    }

    #[test]
    fn test_open_url_not_supported() {
        let (_dir, host) = host();
        assert_eq!(
            host.open_url("https://example.com"),
            Err(ReturnCode::NOT_SUPPORTED)
        );
    }
}
