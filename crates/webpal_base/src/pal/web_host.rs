use std::ffi::{CString, c_char, c_int, c_void};
use std::io::SeekFrom;
use std::path::PathBuf;

use tracing::warn;

use crate::return_code::{PalResult, ReturnCode};

use super::FilePath;
use super::real_pal::StdFilesystem;
use super::traits::{
    DirEntry, HostFilesystem, HostServices, HostTransport, Metadata, OpenMode, RawDir, RawFile,
    RawSocket,
};

/* 📖 # Why does WebHost reuse StdFilesystem?

Under emscripten, std::fs is compiled against the emulated POSIX filesystem the JavaScript host
mounts, so the std implementation already is the host filesystem. Only the socket shim and the
single-call services need hand-written bindings.
*/

const STORAGE_ERROR_CAPACITY: usize = 64 + 1;

unsafe extern "C" {
    fn interop_SocketCreate() -> c_int;
    fn interop_SocketConnect(sock: c_int, addr: *const c_char, port: c_int) -> c_int;
    fn interop_SocketClose(sock: c_int) -> c_int;
    fn interop_SocketSend(sock: c_int, data: *const c_void, len: c_int) -> c_int;
    fn interop_SocketRecv(sock: c_int, data: *mut c_void, len: c_int) -> c_int;
    fn interop_SocketGetPending(sock: c_int) -> c_int;
    fn interop_SocketGetError(sock: c_int) -> c_int;
    fn interop_SocketPoll(sock: c_int) -> c_int;
    fn interop_Log(msg: *const c_char, len: c_int);
    fn interop_SyncFS();
    fn interop_OpenTab(url: *const c_char) -> c_int;
    fn interop_InitModule();
    fn interop_InitSockets();
    fn interop_GetIndexedDBError(buffer: *mut c_char);
    fn emscripten_get_now() -> f64;
}

fn c_len(len: usize) -> c_int {
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

/// Host backed by the JavaScript interop shim.
#[derive(Debug)]
pub struct WebHost {
    fs: StdFilesystem,
}

impl WebHost {
    pub fn new() -> Self {
        Self {
            fs: StdFilesystem::new(PathBuf::from("/")),
        }
    }
}

impl Default for WebHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostFilesystem for WebHost {
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

impl HostTransport for WebHost {
    fn socket_create(&self) -> RawSocket {
        unsafe { interop_SocketCreate() }
    }

    fn socket_connect(&self, socket: RawSocket, address: &str, port: u16) -> i32 {
        // An interior NUL can never be a valid address; the shim reports those the same way.
        let Ok(address) = CString::new(address) else {
            return crate::errno::transport::failure(crate::errno::transport::EHOSTUNREACH);
        };
        unsafe { interop_SocketConnect(socket, address.as_ptr(), c_int::from(port)) }
    }

    fn socket_close(&self, socket: RawSocket) -> i32 {
        unsafe { interop_SocketClose(socket) }
    }

    fn socket_send(&self, socket: RawSocket, data: &[u8]) -> i32 {
        unsafe { interop_SocketSend(socket, data.as_ptr().cast(), c_len(data.len())) }
    }

    fn socket_recv(&self, socket: RawSocket, buf: &mut [u8]) -> i32 {
        unsafe { interop_SocketRecv(socket, buf.as_mut_ptr().cast(), c_len(buf.len())) }
    }

    fn socket_pending(&self, socket: RawSocket) -> i32 {
        unsafe { interop_SocketGetPending(socket) }
    }

    fn socket_error(&self, socket: RawSocket) -> i32 {
        unsafe { interop_SocketGetError(socket) }
    }

    fn socket_poll(&self, socket: RawSocket) -> i32 {
        unsafe { interop_SocketPoll(socket) }
    }
}

impl HostServices for WebHost {
    fn log(&self, message: &str) {
        unsafe { interop_Log(message.as_ptr().cast(), c_len(message.len())) }
    }

    fn sync_fs(&self) {
        unsafe { interop_SyncFS() }
    }

    fn open_url(&self, url: &str) -> PalResult<()> {
        let url = CString::new(url).map_err(|_| ReturnCode::INVALID_ARGUMENT)?;
        let raw = unsafe { interop_OpenTab(url.as_ptr()) };
        match u32::try_from(raw).ok().and_then(ReturnCode::new) {
            None if raw == 0 => Ok(()),
            Some(code) => Err(code),
            None => {
                warn!(raw, "open tab returned a negative status");
                Err(ReturnCode::INVALID_ARGUMENT)
            }
        }
    }

    fn now_ms(&self) -> f64 {
        unsafe { emscripten_get_now() }
    }

    fn init_module(&self) {
        unsafe { interop_InitModule() }
    }

    fn init_sockets(&self) {
        unsafe { interop_InitSockets() }
    }

    fn storage_error(&self) -> Option<String> {
        let mut buffer = [0 as c_char; STORAGE_ERROR_CAPACITY];
        unsafe { interop_GetIndexedDBError(buffer.as_mut_ptr()) };
        let bytes: Vec<u8> = buffer
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        if bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
