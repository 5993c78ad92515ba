/* 📖 # What sits below the PAL?

The backend never touches the JavaScript host directly. Everything it needs from the
environment goes through three collaborator traits: HostFilesystem, HostTransport and
HostServices. Their union, Host, is shared as a HostHandle.

- MockHost: in-memory filesystem and scripted frame transport, for deterministic tests
- StdHost: std::fs rooted at a base directory and a TcpStream-backed frame transport
- WebHost: the interop imports of the browser shim (emscripten builds only)
*/

mod file_path;
pub mod mock;
pub mod real_pal;
pub mod tcp_transport;
mod traits;
#[cfg(target_os = "emscripten")]
pub mod web_host;

pub use file_path::FilePath;
pub use mock::MockHost;
pub use real_pal::{StdFilesystem, StdHost};
pub use tcp_transport::TcpTransport;
pub use traits::{
    DirEntry, EntryKind, Host, HostFilesystem, HostHandle, HostServices, HostTransport,
    Metadata, OpenMode, RawDir, RawFile, RawSocket, native_code,
};
#[cfg(target_os = "emscripten")]
pub use web_host::WebHost;
