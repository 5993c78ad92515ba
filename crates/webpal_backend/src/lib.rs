/* 📖 # What does webpal_backend provide?

The PAL primitives themselves, implemented over a webpal_base HostHandle. The channel layers
(directory walking, files, sockets) carry the real logic; the remaining modules are one-call
forwards kept so the backend covers the whole PAL surface.

Every primitive returns a PalResult. Application plumbing such as configuration loading uses
WebPalResult instead, because it wants context and span traces rather than a bare code.
*/

pub mod config;
pub mod crypto;
pub mod directory;
pub mod file;
pub mod library;
pub mod memory;
pub mod native;
pub mod platform;
pub mod process;
pub mod socket;
pub mod threading;
pub mod time;
pub mod unifier;

pub use config::{CONFIG_FILE, PalConfig, load_config};
pub use directory::{create_directory, enumerate, file_exists};
pub use file::File;
pub use socket::{PollMode, Socket, SocketState};
pub use unifier::{decode, decode_connect};
