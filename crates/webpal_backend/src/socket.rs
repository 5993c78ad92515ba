use tracing::{debug, instrument, warn};

use webpal_base::pal::{HostHandle, RawSocket};
use webpal_base::{PalResult, ReturnCode};

use crate::unifier::{decode, decode_connect};

/* 📖 # Why does read loop over receive calls?

The host transport is frame oriented: one receive hands back at most one frame, however large
the caller's buffer is. A caller asking for 30 bytes while three frames of 10, 10 and 5 bytes
are queued expects 25, not 10. Read therefore keeps receiving while there is room in the buffer
and the transport reports pending data. "Would block" ends the loop quietly with what has been
copied so far; any other failure is returned.
*/

/// Where a socket is in its lifecycle, as far as this side has observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Unconnected,
    /// Connect was issued; the outcome is learned by polling for writability.
    Connecting,
    Established,
    /// The transport latched this error.
    Failed(ReturnCode),
    Closed,
}

/// Which readiness bit [`Socket::poll`] checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Read,
    Write,
}

impl PollMode {
    fn mask(self) -> u32 {
        match self {
            PollMode::Read => 0x01,
            PollMode::Write => 0x02,
        }
    }
}

/// A connection over the host's frame transport.
///
/// No call blocks. Prefer [`Socket::close`] to observe the result of closing; a socket that is
/// dropped without being closed is closed then.
#[derive(Debug)]
pub struct Socket {
    host: HostHandle,
    raw: RawSocket,
    state: SocketState,
}

impl Socket {
    /// Allocate a transport channel. The transport hands out channels unconditionally.
    pub fn create(host: &HostHandle) -> PalResult<Socket> {
        let raw = host.socket_create();
        debug!(raw, "socket created");
        Ok(Socket {
            host: host.clone(),
            raw,
            state: SocketState::Unconnected,
        })
    }

    pub fn raw(&self) -> RawSocket {
        self.raw
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    /// Start connecting to `address:port`.
    ///
    /// The usual answer is `Err(ReturnCode::SOCKET_IN_PROGRESS)`: the attempt continues in the
    /// background and its outcome is learned through [`Socket::poll`] with
    /// [`PollMode::Write`] and [`Socket::error`]. A malformed address is reported as
    /// `ReturnCode::INVALID_ARGUMENT`.
    #[instrument(skip(self), fields(raw = self.raw))]
    pub fn connect(&mut self, address: &str, port: u16) -> PalResult<()> {
        let result = decode_connect(self.host.socket_connect(self.raw, address, port)).map(|_| ());
        self.state = match result {
            Ok(()) => SocketState::Established,
            Err(code) if code == ReturnCode::SOCKET_IN_PROGRESS => SocketState::Connecting,
            Err(code) => SocketState::Failed(code),
        };
        debug!(state = ?self.state, "connect issued");
        result
    }

    /// Copy pending data into `buf`, across as many frames as fit.
    ///
    /// Returns the number of bytes copied, which is zero when nothing is pending.
    pub fn read(&mut self, buf: &mut [u8]) -> PalResult<usize> {
        let mut total = 0;
        while total < buf.len() && self.has_pending() {
            match decode(self.host.socket_recv(self.raw, &mut buf[total..])) {
                // A zero-length receive makes no progress.
                Ok(0) => break,
                // Never advance past the buffer, whatever the host reports.
                Ok(count) => total += (count as usize).min(buf.len() - total),
                Err(code) if code == ReturnCode::SOCKET_WOULD_BLOCK => break,
                Err(code) => {
                    debug!(raw = self.raw, %code, copied = total, "receive failed");
                    return Err(code);
                }
            }
        }
        Ok(total)
    }

    // A failing pending query ends the drain the same way an empty queue does.
    fn has_pending(&self) -> bool {
        matches!(decode(self.host.socket_pending(self.raw)), Ok(pending) if pending > 0)
    }

    /// Send `data`; returns the number of bytes the transport accepted.
    pub fn write(&mut self, data: &[u8]) -> PalResult<usize> {
        decode(self.host.socket_send(self.raw, data)).map(|count| count as usize)
    }

    /// Bytes ready to be read.
    pub fn available(&self) -> PalResult<usize> {
        decode(self.host.socket_pending(self.raw)).map(|count| count as usize)
    }

    /// The error latched by the transport, `None` while the socket is healthy.
    pub fn error(&mut self) -> PalResult<Option<ReturnCode>> {
        let latched = ReturnCode::new(decode(self.host.socket_error(self.raw))?);
        if let Some(code) = latched {
            if matches!(
                self.state,
                SocketState::Connecting | SocketState::Established
            ) {
                debug!(raw = self.raw, %code, "socket failed");
                self.state = SocketState::Failed(code);
            }
        }
        Ok(latched)
    }

    /// Whether the socket is ready for `mode`.
    pub fn poll(&mut self, mode: PollMode) -> PalResult<bool> {
        let readiness = decode(self.host.socket_poll(self.raw))?;
        let ready = readiness & mode.mask() != 0;
        if ready && mode == PollMode::Write && self.state == SocketState::Connecting {
            debug!(raw = self.raw, "connection established");
            self.state = SocketState::Established;
        }
        Ok(ready)
    }

    /// Release the channel and report how closing went.
    pub fn close(mut self) -> PalResult<()> {
        self.release()
    }

    fn release(&mut self) -> PalResult<()> {
        if self.state == SocketState::Closed {
            return Ok(());
        }
        self.state = SocketState::Closed;
        decode(self.host.socket_close(self.raw)).map(|_| ())
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if let Err(code) = self.release() {
            warn!(raw = self.raw, %code, "failed to close socket on drop");
        }
    }
}
