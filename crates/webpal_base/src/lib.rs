/* 📖 # Why have webpal_base as a core library?
webpal_base holds the error handling, the return-code space and the host collaborator traits.
Both the backend and the CLI build on it, so it must not depend on either of them.
*/

pub mod errno;
pub mod error;
pub mod pal;
mod pal_tests;
pub mod return_code;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, ResultExt, WebPalError, WebPalResult};
pub use pal::{FilePath, HostHandle, MockHost, StdHost};
pub use return_code::{PalResult, ReturnCode, code_of};
