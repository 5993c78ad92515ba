use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io::SeekFrom;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errno::{native, transport};
use crate::return_code::{PalResult, ReturnCode};

use super::FilePath;
use super::traits::{
    DirEntry, EntryKind, HostFilesystem, HostServices, HostTransport, Metadata, OpenMode, RawDir,
    RawFile, RawSocket,
};

/* 📖 # Why one Mutex around the whole mock state?

The PAL is single-threaded, so contention is not a concern; what matters is that a clone of the
MockHost handed to the code under test and the clone kept by the test observe the same state.
A single Arc<Mutex<MockState>> gives that with no lock-ordering questions, and parking_lot's
Mutex does not poison, so a failed assertion in one test cannot cascade into `unwrap` panics.
*/

/// In-memory host for testing.
///
/// Provides a tree-shaped filesystem, a scripted frame transport and recording host services.
/// Faults can be injected per path or per socket.
///
/// # Examples
///
/// ```
/// use webpal_base::pal::{HostFilesystem, MockHost, OpenMode};
/// use webpal_base::FilePath;
///
/// let mock = MockHost::new();
/// mock.add_file("maps/level.cw", b"data".to_vec());
/// let file = mock.open_file(&FilePath::from("maps/level.cw"), OpenMode::ReadOnly).unwrap();
/// assert_eq!(mock.file_length(file).unwrap(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
enum Node {
    Directory,
    File(Vec<u8>),
}

#[derive(Debug)]
struct OpenFile {
    key: String,
    position: u64,
    writable: bool,
}

#[derive(Debug)]
enum Incoming {
    Frame(Vec<u8>),
    Fail(i32),
}

#[derive(Debug)]
struct MockSocket {
    incoming: VecDeque<Incoming>,
    connect_result: i32,
    connected_to: Option<(String, u16)>,
    latched_error: i32,
    readiness: Option<i32>,
    pending_failure: Option<i32>,
    send_capacity: Option<usize>,
    sent: Vec<u8>,
    close_result: i32,
    closed: bool,
}

impl Default for MockSocket {
    fn default() -> Self {
        Self {
            incoming: VecDeque::new(),
            connect_result: transport::failure(transport::EINPROGRESS),
            connected_to: None,
            latched_error: 0,
            readiness: None,
            pending_failure: None,
            send_capacity: None,
            sent: Vec::new(),
            close_result: 0,
            closed: false,
        }
    }
}

impl MockSocket {
    fn pending_bytes(&self) -> usize {
        self.incoming
            .iter()
            .map(|item| match item {
                Incoming::Frame(data) => data.len(),
                Incoming::Fail(_) => 0,
            })
            .sum()
    }
}

#[derive(Debug)]
struct MockState {
    nodes: BTreeMap<String, Node>,
    cwd: String,
    next_handle: i32,
    open_files: HashMap<RawFile, OpenFile>,
    open_dirs: HashMap<RawDir, VecDeque<PalResult<DirEntry>>>,
    open_failures: HashMap<String, ReturnCode>,
    stat_failures: HashMap<String, ReturnCode>,
    read_dir_failures: HashMap<String, (usize, ReturnCode)>,
    untyped_entries: HashSet<String>,
    sockets: HashMap<RawSocket, MockSocket>,
    log: Vec<String>,
    sync_count: usize,
    opened_urls: Vec<String>,
    clock_ms: f64,
    storage_error: Option<String>,
    module_initialised: bool,
    sockets_initialised: bool,
}

impl Default for MockState {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node::Directory);
        Self {
            nodes,
            cwd: String::new(),
            next_handle: 3,
            open_files: HashMap::new(),
            open_dirs: HashMap::new(),
            open_failures: HashMap::new(),
            stat_failures: HashMap::new(),
            read_dir_failures: HashMap::new(),
            untyped_entries: HashSet::new(),
            sockets: HashMap::new(),
            log: Vec::new(),
            sync_count: 0,
            opened_urls: Vec::new(),
            clock_ms: 0.0,
            storage_error: None,
            module_initialised: false,
            sockets_initialised: false,
        }
    }
}

fn errno(raw: u32) -> ReturnCode {
    ReturnCode::new(raw).unwrap_or(ReturnCode::INVALID_ARGUMENT)
}

fn parent_key(key: &str) -> Option<&str> {
    if key.is_empty() {
        return None;
    }
    Some(key.rsplit_once('/').map_or("", |(parent, _)| parent))
}

fn entry_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

impl MockState {
    fn allocate_handle(&mut self) -> i32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn resolve(&self, path: &FilePath) -> String {
        if path.is_absolute() || self.cwd.is_empty() {
            path.normalized()
        } else {
            FilePath::from(format!("{}/{}", self.cwd, path)).normalized()
        }
    }

    fn ensure_directories(&mut self, key: &str) {
        let mut current = String::new();
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            self.nodes.entry(current.clone()).or_insert(Node::Directory);
        }
    }

    fn require_parent_directory(&self, key: &str) -> PalResult<()> {
        match parent_key(key).and_then(|parent| self.nodes.get(parent)) {
            Some(Node::Directory) => Ok(()),
            Some(Node::File(_)) => Err(errno(native::ENOTDIR)),
            None => Err(errno(native::ENOENT)),
        }
    }

    fn children(&self, key: &str) -> Vec<DirEntry> {
        self.nodes
            .iter()
            .filter(|(child, _)| !child.is_empty() && parent_key(child) == Some(key))
            .map(|(child, node)| {
                let kind = if self.untyped_entries.contains(child) {
                    EntryKind::Unknown
                } else {
                    match node {
                        Node::Directory => EntryKind::Directory,
                        Node::File(_) => EntryKind::File,
                    }
                };
                DirEntry::new(entry_name(child), kind)
            })
            .collect()
    }

    fn open_file(&mut self, path: &FilePath, mode: OpenMode) -> PalResult<RawFile> {
        let key = self.resolve(path);
        if let Some(code) = self.open_failures.get(&key) {
            return Err(*code);
        }
        match self.nodes.get_mut(&key) {
            Some(Node::Directory) => return Err(errno(native::EISDIR)),
            Some(Node::File(data)) => {
                if mode == OpenMode::CreateTruncate {
                    data.clear();
                }
            }
            None if mode == OpenMode::ReadOnly => return Err(errno(native::ENOENT)),
            None => {
                self.require_parent_directory(&key)?;
                self.nodes.insert(key.clone(), Node::File(Vec::new()));
            }
        }
        let handle = self.allocate_handle();
        self.open_files.insert(
            handle,
            OpenFile {
                key,
                position: 0,
                writable: mode.is_writable(),
            },
        );
        Ok(handle)
    }

    fn file_data(&mut self, file: RawFile) -> PalResult<(&mut OpenFile, &mut Vec<u8>)> {
        let open = self
            .open_files
            .get_mut(&file)
            .ok_or_else(|| errno(native::EBADF))?;
        match self.nodes.get_mut(&open.key) {
            Some(Node::File(data)) => Ok((open, data)),
            _ => Err(errno(native::EBADF)),
        }
    }

    fn read_file(&mut self, file: RawFile, buf: &mut [u8]) -> PalResult<usize> {
        let (open, data) = self.file_data(file)?;
        let start = usize::try_from(open.position)
            .unwrap_or(usize::MAX)
            .min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        open.position += count as u64;
        Ok(count)
    }

    fn write_file(&mut self, file: RawFile, bytes: &[u8]) -> PalResult<usize> {
        let (open, data) = self.file_data(file)?;
        if !open.writable {
            return Err(errno(native::EBADF));
        }
        let start = usize::try_from(open.position).map_err(|_| errno(native::EINVAL))?;
        if data.len() < start + bytes.len() {
            data.resize(start + bytes.len(), 0);
        }
        data[start..start + bytes.len()].copy_from_slice(bytes);
        open.position += bytes.len() as u64;
        Ok(bytes.len())
    }

    fn seek_file(&mut self, file: RawFile, pos: SeekFrom) -> PalResult<u64> {
        let (open, data) = self.file_data(file)?;
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => open.position.checked_add_signed(delta),
            SeekFrom::End(delta) => (data.len() as u64).checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| errno(native::EINVAL))?;
        open.position = target;
        Ok(target)
    }

    fn open_dir(&mut self, path: &FilePath) -> PalResult<RawDir> {
        let key = self.resolve(path);
        if let Some(code) = self.open_failures.get(&key) {
            return Err(*code);
        }
        match self.nodes.get(&key) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => return Err(errno(native::ENOTDIR)),
            None => return Err(errno(native::ENOENT)),
        }
        let mut listing: VecDeque<PalResult<DirEntry>> = VecDeque::new();
        listing.push_back(Ok(DirEntry::new(".", EntryKind::Directory)));
        listing.push_back(Ok(DirEntry::new("..", EntryKind::Directory)));
        let children = self.children(&key);
        match self.read_dir_failures.get(&key) {
            Some((after, code)) => {
                listing.extend(children.into_iter().take(*after).map(Ok));
                listing.push_back(Err(*code));
            }
            None => listing.extend(children.into_iter().map(Ok)),
        }
        let handle = self.allocate_handle();
        self.open_dirs.insert(handle, listing);
        Ok(handle)
    }

    fn socket(&mut self, socket: RawSocket) -> Result<&mut MockSocket, i32> {
        match self.sockets.get_mut(&socket) {
            Some(sock) if !sock.closed => Ok(sock),
            _ => Err(transport::failure(transport::EBADF)),
        }
    }
}

impl MockHost {
    /// Create a new host with an empty root directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, path: impl Into<FilePath>, content: Vec<u8>) {
        let mut state = self.state.lock();
        let key = state.resolve(&path.into());
        if let Some(parent) = parent_key(&key) {
            state.ensure_directories(parent);
        }
        state.nodes.insert(key, Node::File(content));
    }

    /// Add a directory and all of its parents.
    pub fn add_directory(&self, path: impl Into<FilePath>) {
        let mut state = self.state.lock();
        let key = state.resolve(&path.into());
        state.ensure_directories(&key);
    }

    /// Current contents of a file, if it exists.
    pub fn file_contents(&self, path: impl Into<FilePath>) -> Option<Vec<u8>> {
        let state = self.state.lock();
        match state.nodes.get(&state.resolve(&path.into())) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn is_directory(&self, path: impl Into<FilePath>) -> bool {
        let state = self.state.lock();
        matches!(
            state.nodes.get(&state.resolve(&path.into())),
            Some(Node::Directory)
        )
    }

    /// Make opening `path` (as file or directory) fail with `code`.
    pub fn fail_open(&self, path: impl Into<FilePath>, code: ReturnCode) {
        let mut state = self.state.lock();
        let key = state.resolve(&path.into());
        state.open_failures.insert(key, code);
    }

    /// Make `stat` of `path` fail with `code`.
    pub fn fail_stat(&self, path: impl Into<FilePath>, code: ReturnCode) {
        let mut state = self.state.lock();
        let key = state.resolve(&path.into());
        state.stat_failures.insert(key, code);
    }

    /// Make listing `path` fail with `code` after `after` real entries.
    pub fn fail_read_dir(&self, path: impl Into<FilePath>, after: usize, code: ReturnCode) {
        let mut state = self.state.lock();
        let key = state.resolve(&path.into());
        state.read_dir_failures.insert(key, (after, code));
    }

    /// Report `path` without type information in its parent's listing.
    pub fn hide_entry_kind(&self, path: impl Into<FilePath>) {
        let mut state = self.state.lock();
        let key = state.resolve(&path.into());
        state.untyped_entries.insert(key);
    }

    pub fn open_file_count(&self) -> usize {
        self.state.lock().open_files.len()
    }

    pub fn open_dir_count(&self) -> usize {
        self.state.lock().open_dirs.len()
    }

    pub fn current_dir(&self) -> String {
        self.state.lock().cwd.clone()
    }

    /// Queue one frame for delivery on `socket`.
    pub fn push_frame(&self, socket: RawSocket, frame: impl Into<Vec<u8>>) {
        self.with_socket(socket, |sock| {
            sock.incoming.push_back(Incoming::Frame(frame.into()))
        });
    }

    /// Queue a raw receive result (normally a negated transport code) between frames.
    pub fn push_recv_result(&self, socket: RawSocket, raw: i32) {
        self.with_socket(socket, |sock| sock.incoming.push_back(Incoming::Fail(raw)));
    }

    /// Raw value the next connect on `socket` returns.
    pub fn set_connect_result(&self, socket: RawSocket, raw: i32) {
        self.with_socket(socket, |sock| sock.connect_result = raw);
    }

    pub fn set_close_result(&self, socket: RawSocket, raw: i32) {
        self.with_socket(socket, |sock| sock.close_result = raw);
    }

    /// Latch an error on `socket` (raw transport value, zero clears it).
    pub fn set_latched_error(&self, socket: RawSocket, raw: i32) {
        self.with_socket(socket, |sock| sock.latched_error = raw);
    }

    /// Override the readiness bitmask; by default it is derived from the socket state.
    pub fn set_readiness(&self, socket: RawSocket, raw: i32) {
        self.with_socket(socket, |sock| sock.readiness = Some(raw));
    }

    /// Make the pending-bytes query on `socket` return `raw`.
    pub fn fail_pending(&self, socket: RawSocket, raw: i32) {
        self.with_socket(socket, |sock| sock.pending_failure = Some(raw));
    }

    /// Accept at most `capacity` bytes per send.
    pub fn set_send_capacity(&self, socket: RawSocket, capacity: usize) {
        self.with_socket(socket, |sock| sock.send_capacity = Some(capacity));
    }

    pub fn sent_bytes(&self, socket: RawSocket) -> Vec<u8> {
        self.state
            .lock()
            .sockets
            .get(&socket)
            .map(|sock| sock.sent.clone())
            .unwrap_or_default()
    }

    pub fn connected_to(&self, socket: RawSocket) -> Option<(String, u16)> {
        self.state
            .lock()
            .sockets
            .get(&socket)
            .and_then(|sock| sock.connected_to.clone())
    }

    pub fn is_socket_closed(&self, socket: RawSocket) -> bool {
        self.state
            .lock()
            .sockets
            .get(&socket)
            .is_some_and(|sock| sock.closed)
    }

    pub fn logged_messages(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    pub fn sync_count(&self) -> usize {
        self.state.lock().sync_count
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.state.lock().opened_urls.clone()
    }

    pub fn advance_clock(&self, ms: f64) {
        self.state.lock().clock_ms += ms;
    }

    pub fn set_storage_error(&self, message: impl Into<String>) {
        self.state.lock().storage_error = Some(message.into());
    }

    pub fn is_initialised(&self) -> bool {
        let state = self.state.lock();
        state.module_initialised && state.sockets_initialised
    }

    fn with_socket(&self, socket: RawSocket, f: impl FnOnce(&mut MockSocket)) {
        let mut state = self.state.lock();
        f(state.sockets.entry(socket).or_default());
    }
}

impl HostFilesystem for MockHost {
    fn open_file(&self, path: &FilePath, mode: OpenMode) -> PalResult<RawFile> {
        self.state.lock().open_file(path, mode)
    }

    fn read_file(&self, file: RawFile, buf: &mut [u8]) -> PalResult<usize> {
        self.state.lock().read_file(file, buf)
    }

    fn write_file(&self, file: RawFile, data: &[u8]) -> PalResult<usize> {
        self.state.lock().write_file(file, data)
    }

    fn seek_file(&self, file: RawFile, pos: SeekFrom) -> PalResult<u64> {
        self.state.lock().seek_file(file, pos)
    }

    fn file_length(&self, file: RawFile) -> PalResult<u64> {
        let mut state = self.state.lock();
        let (_, data) = state.file_data(file)?;
        Ok(data.len() as u64)
    }

    fn close_file(&self, file: RawFile) -> PalResult<()> {
        match self.state.lock().open_files.remove(&file) {
            Some(_) => Ok(()),
            None => Err(errno(native::EBADF)),
        }
    }

    fn stat(&self, path: &FilePath) -> PalResult<Metadata> {
        let state = self.state.lock();
        let key = state.resolve(path);
        if let Some(code) = state.stat_failures.get(&key) {
            return Err(*code);
        }
        match state.nodes.get(&key) {
            Some(Node::Directory) => Ok(Metadata {
                kind: EntryKind::Directory,
                len: 0,
            }),
            Some(Node::File(data)) => Ok(Metadata {
                kind: EntryKind::File,
                len: data.len() as u64,
            }),
            None => Err(errno(native::ENOENT)),
        }
    }

    fn create_dir(&self, path: &FilePath) -> PalResult<()> {
        let mut state = self.state.lock();
        let key = state.resolve(path);
        if state.nodes.contains_key(&key) {
            return Err(errno(native::EEXIST));
        }
        state.require_parent_directory(&key)?;
        state.nodes.insert(key, Node::Directory);
        Ok(())
    }

    fn open_dir(&self, path: &FilePath) -> PalResult<RawDir> {
        self.state.lock().open_dir(path)
    }

    fn read_dir(&self, dir: RawDir) -> PalResult<Option<DirEntry>> {
        let mut state = self.state.lock();
        let listing = state
            .open_dirs
            .get_mut(&dir)
            .ok_or_else(|| errno(native::EBADF))?;
        listing.pop_front().transpose()
    }

    fn close_dir(&self, dir: RawDir) {
        self.state.lock().open_dirs.remove(&dir);
    }

    fn change_dir(&self, path: &FilePath) -> PalResult<()> {
        let mut state = self.state.lock();
        let key = state.resolve(path);
        match state.nodes.get(&key) {
            Some(Node::Directory) => {
                state.cwd = key;
                Ok(())
            }
            Some(Node::File(_)) => Err(errno(native::ENOTDIR)),
            None => Err(errno(native::ENOENT)),
        }
    }
}

impl HostTransport for MockHost {
    fn socket_create(&self) -> RawSocket {
        let mut state = self.state.lock();
        let handle = state.allocate_handle();
        state.sockets.insert(handle, MockSocket::default());
        handle
    }

    fn socket_connect(&self, socket: RawSocket, address: &str, port: u16) -> i32 {
        let mut state = self.state.lock();
        let sock = match state.socket(socket) {
            Ok(sock) => sock,
            Err(raw) => return raw,
        };
        let result = sock.connect_result;
        if result == 0 || result == transport::failure(transport::EINPROGRESS) {
            sock.connected_to = Some((address.to_string(), port));
        }
        result
    }

    fn socket_close(&self, socket: RawSocket) -> i32 {
        let mut state = self.state.lock();
        match state.socket(socket) {
            Ok(sock) => {
                sock.closed = true;
                sock.close_result
            }
            Err(raw) => raw,
        }
    }

    fn socket_send(&self, socket: RawSocket, data: &[u8]) -> i32 {
        let mut state = self.state.lock();
        let sock = match state.socket(socket) {
            Ok(sock) => sock,
            Err(raw) => return raw,
        };
        if sock.connected_to.is_none() {
            return transport::failure(transport::ENOTCONN);
        }
        let accepted = sock.send_capacity.map_or(data.len(), |cap| cap.min(data.len()));
        sock.sent.extend_from_slice(&data[..accepted]);
        i32::try_from(accepted).unwrap_or(i32::MAX)
    }

    fn socket_recv(&self, socket: RawSocket, buf: &mut [u8]) -> i32 {
        let mut state = self.state.lock();
        let sock = match state.socket(socket) {
            Ok(sock) => sock,
            Err(raw) => return raw,
        };
        match sock.incoming.pop_front() {
            None => transport::failure(transport::EAGAIN),
            Some(Incoming::Fail(raw)) => raw,
            Some(Incoming::Frame(mut frame)) => {
                let count = buf.len().min(frame.len());
                buf[..count].copy_from_slice(&frame[..count]);
                if count < frame.len() {
                    // The unread tail stays queued as the next frame.
                    sock.incoming.push_front(Incoming::Frame(frame.split_off(count)));
                }
                i32::try_from(count).unwrap_or(i32::MAX)
            }
        }
    }

    fn socket_pending(&self, socket: RawSocket) -> i32 {
        let mut state = self.state.lock();
        match state.socket(socket) {
            Ok(sock) => match sock.pending_failure {
                Some(raw) => raw,
                None => i32::try_from(sock.pending_bytes()).unwrap_or(i32::MAX),
            },
            Err(raw) => raw,
        }
    }

    fn socket_error(&self, socket: RawSocket) -> i32 {
        let mut state = self.state.lock();
        match state.socket(socket) {
            Ok(sock) => sock.latched_error,
            Err(raw) => raw,
        }
    }

    fn socket_poll(&self, socket: RawSocket) -> i32 {
        let mut state = self.state.lock();
        match state.socket(socket) {
            Ok(sock) => sock.readiness.unwrap_or_else(|| {
                let readable = i32::from(sock.pending_bytes() > 0);
                let writable = i32::from(sock.connected_to.is_some() && sock.latched_error == 0);
                readable | (writable << 1)
            }),
            Err(raw) => raw,
        }
    }
}

impl HostServices for MockHost {
    fn log(&self, message: &str) {
        self.state.lock().log.push(message.to_string());
    }

    fn sync_fs(&self) {
        self.state.lock().sync_count += 1;
    }

    fn open_url(&self, url: &str) -> PalResult<()> {
        self.state.lock().opened_urls.push(url.to_string());
        Ok(())
    }

    fn now_ms(&self) -> f64 {
        self.state.lock().clock_ms
    }

    fn init_module(&self) {
        self.state.lock().module_initialised = true;
    }

    fn init_sockets(&self) {
        self.state.lock().sockets_initialised = true;
    }

    fn storage_error(&self) -> Option<String> {
        self.state.lock().storage_error.clone()
    }
}
