use std::fmt;
use std::num::NonZeroU32;

use crate::errno::{native, transport};

/* 📖 # Why is a return code a NonZeroU32?

Callers of the PAL see a single number per operation: zero for success, anything else an error.
Inside Rust the success case is the `Ok` arm of `PalResult`, so the error arm can never legally
hold zero. NonZeroU32 makes that impossible to construct and keeps `PalResult<()>` word-sized.
*/

/// Error code carried by a failed PAL operation.
///
/// Native filesystem codes pass through verbatim. Socket codes follow the numbering of the
/// socket shim. PAL-specific codes live in a reserved range well above any errno value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReturnCode(NonZeroU32);

/// Outcome of every PAL primitive.
pub type PalResult<T> = std::result::Result<T, ReturnCode>;

const fn code(raw: u32) -> ReturnCode {
    match NonZeroU32::new(raw) {
        Some(raw) => ReturnCode(raw),
        None => panic!("zero is reserved for success"),
    }
}

impl ReturnCode {
    /// The operation is not available on this backend.
    pub const NOT_SUPPORTED: ReturnCode = code(0xCCDE_D001);
    /// An argument was rejected before reaching the host.
    pub const INVALID_ARGUMENT: ReturnCode = code(0xCCDE_D002);
    /// An allocation could not be satisfied.
    pub const OUT_OF_MEMORY: ReturnCode = code(0xCCDE_D003);
    /// Defined for parity with other backends; never produced here.
    pub const FILE_SHARE_VIOLATION: ReturnCode = code(1_000_000_000);
    pub const FILE_NOT_FOUND: ReturnCode = code(native::ENOENT);
    pub const DIRECTORY_EXISTS: ReturnCode = code(native::EEXIST);
    pub const SOCKET_IN_PROGRESS: ReturnCode = code(transport::EINPROGRESS);
    pub const SOCKET_WOULD_BLOCK: ReturnCode = code(transport::EAGAIN);
    pub const SOCKET_HOST_UNREACHABLE: ReturnCode = code(transport::EHOSTUNREACH);

    /// Wrap a raw code, or `None` for zero (success).
    pub const fn new(raw: u32) -> Option<ReturnCode> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(ReturnCode(raw)),
            None => None,
        }
    }

    /// The numeric value as seen by callers.
    pub const fn raw(self) -> u32 {
        self.0.get()
    }

    /// Symbolic name for the codes the PAL defines itself.
    pub fn name(self) -> Option<&'static str> {
        NAMED_CODES
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, name)| *name)
    }
}

// Socket and native codes can coincide on some targets; the first match wins.
const NAMED_CODES: &[(ReturnCode, &str)] = &[
    (ReturnCode::NOT_SUPPORTED, "not supported"),
    (ReturnCode::INVALID_ARGUMENT, "invalid argument"),
    (ReturnCode::OUT_OF_MEMORY, "out of memory"),
    (ReturnCode::FILE_SHARE_VIOLATION, "file share violation"),
    (ReturnCode::FILE_NOT_FOUND, "file not found"),
    (ReturnCode::DIRECTORY_EXISTS, "directory exists"),
    (ReturnCode::SOCKET_IN_PROGRESS, "socket in progress"),
    (ReturnCode::SOCKET_WOULD_BLOCK, "socket would block"),
    (ReturnCode::SOCKET_HOST_UNREACHABLE, "host unreachable"),
];

/// Numeric form of a PAL outcome: zero on success, the error code otherwise.
pub fn code_of<T>(result: &PalResult<T>) -> u32 {
    match result {
        Ok(_) => 0,
        Err(code) => code.raw(),
    }
}

impl fmt::Debug for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "ReturnCode({}, {})", self.raw(), name),
            None => write!(f, "ReturnCode({})", self.raw()),
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (code {:#x})", name, self.raw()),
            None => write!(f, "error code {}", self.raw()),
        }
    }
}

impl std::error::Error for ReturnCode {}
