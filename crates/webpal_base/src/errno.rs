//! Numeric error identifiers of the two environments this backend talks to.
//!
//! `native` holds the codes the hosting filesystem reports. They pass through the PAL
//! verbatim, so `ReturnCode::FILE_NOT_FOUND` and friends are defined in terms of them.
//!
//! `transport` holds the numbering used by the JavaScript socket shim. It follows WASI errno
//! values regardless of the target, and must stay in lockstep with the shim: if these drift,
//! every connect attempt looks like a hard failure instead of "in progress".

/// Codes reported by the hosting filesystem, as the target's C library numbers them.
pub mod native {
    pub const EACCES: u32 = libc::EACCES as u32;
    pub const EBADF: u32 = libc::EBADF as u32;
    pub const EEXIST: u32 = libc::EEXIST as u32;
    pub const EINVAL: u32 = libc::EINVAL as u32;
    pub const EIO: u32 = libc::EIO as u32;
    pub const EISDIR: u32 = libc::EISDIR as u32;
    pub const ENOENT: u32 = libc::ENOENT as u32;
    pub const ENOTDIR: u32 = libc::ENOTDIR as u32;
}

/// Codes reported by the socket shim.
pub mod transport {
    pub const EAGAIN: u32 = 6;
    pub const EBADF: u32 = 8;
    pub const ECONNREFUSED: u32 = 14;
    pub const ECONNRESET: u32 = 15;
    pub const EHOSTUNREACH: u32 = 23;
    pub const EINPROGRESS: u32 = 26;
    pub const EIO: u32 = 29;
    pub const ENOTCONN: u32 = 53;
    pub const ETIMEDOUT: u32 = 73;

    /// Encode `code` the way the shim returns failures: as its negation.
    pub const fn failure(code: u32) -> i32 {
        -(code as i32)
    }
}
