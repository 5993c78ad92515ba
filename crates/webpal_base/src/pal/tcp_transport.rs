use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::errno::transport;

use super::traits::{HostTransport, RawSocket};

/* 📖 # Why does a blocking TcpStream pretend to be a frame shim?

The browser shim connects asynchronously and always answers a connect with "in progress"; the
outcome shows up later through poll and the latched error. TcpTransport keeps that contract so
the backend cannot tell the two apart: connect blocks for at most CONNECT_TIMEOUT, latches any
failure, and reports EINPROGRESS either way. Afterwards the stream is switched to non-blocking,
so an empty receive buffer surfaces as EAGAIN just like an empty frame queue.
*/

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PEEK_LIMIT: usize = 64 * 1024;

/// Frame transport over plain TCP, speaking the shim's raw integer contract.
#[derive(Debug, Default)]
pub struct TcpTransport {
    state: Mutex<TransportState>,
}

#[derive(Debug, Default)]
struct TransportState {
    next_handle: RawSocket,
    channels: HashMap<RawSocket, Channel>,
}

#[derive(Debug, Default)]
struct Channel {
    stream: Option<TcpStream>,
    /// Latched transport code, zero while healthy.
    error: u32,
    /// Scratch space for counting pending bytes, sized on first use.
    peek_buf: Vec<u8>,
}

impl Channel {
    fn latch(&mut self, err: &io::Error) -> i32 {
        let code = transport_code(err);
        self.error = code;
        transport::failure(code)
    }
}

/// Closest shim code for a failed socket call.
fn transport_code(err: &io::Error) -> u32 {
    match err.kind() {
        io::ErrorKind::WouldBlock => transport::EAGAIN,
        io::ErrorKind::ConnectionRefused => transport::ECONNREFUSED,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => transport::ECONNRESET,
        io::ErrorKind::TimedOut => transport::ETIMEDOUT,
        io::ErrorKind::NotConnected => transport::ENOTCONN,
        _ => transport::EIO,
    }
}

fn clamp(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Host names are letters, digits, hyphens and dots. Anything else is not worth a DNS lookup.
fn looks_like_hostname(address: &str) -> bool {
    !address.is_empty()
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

fn resolve(address: &str, port: u16) -> Option<SocketAddr> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Some(SocketAddr::new(ip, port));
    }
    if !looks_like_hostname(address) {
        return None;
    }
    (address, port).to_socket_addrs().ok()?.next()
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the channel of `socket`, or report a bad handle.
    fn with_channel(&self, socket: RawSocket, f: impl FnOnce(&mut Channel) -> i32) -> i32 {
        let mut state = self.state.lock();
        match state.channels.get_mut(&socket) {
            Some(channel) => f(channel),
            None => transport::failure(transport::EBADF),
        }
    }

    /// Run `f` on the connected stream of `socket`.
    fn with_stream(
        &self,
        socket: RawSocket,
        f: impl FnOnce(&mut TcpStream) -> io::Result<usize>,
    ) -> i32 {
        self.with_channel(socket, |channel| {
            let Some(stream) = channel.stream.as_mut() else {
                return transport::failure(transport::ENOTCONN);
            };
            match f(stream) {
                Ok(count) => clamp(count),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    transport::failure(transport::EAGAIN)
                }
                Err(e) => {
                    debug!(socket, error = %e, "socket call failed");
                    channel.latch(&e)
                }
            }
        })
    }
}

impl HostTransport for TcpTransport {
    fn socket_create(&self) -> RawSocket {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.channels.insert(handle, Channel::default());
        handle
    }

    #[instrument(skip(self))]
    fn socket_connect(&self, socket: RawSocket, address: &str, port: u16) -> i32 {
        if !self.state.lock().channels.contains_key(&socket) {
            return transport::failure(transport::EBADF);
        }
        let Some(target) = resolve(address, port) else {
            debug!("address does not resolve");
            return transport::failure(transport::EHOSTUNREACH);
        };

        // The lock is not held while connecting.
        let outcome = TcpStream::connect_timeout(&target, CONNECT_TIMEOUT).and_then(|stream| {
            stream.set_nonblocking(true)?;
            stream.set_nodelay(true)?;
            Ok(stream)
        });

        self.with_channel(socket, |channel| {
            match outcome {
                Ok(stream) => {
                    debug!(%target, "connected");
                    channel.stream = Some(stream);
                    channel.error = 0;
                }
                Err(e) => {
                    warn!(%target, error = %e, "connect failed");
                    channel.latch(&e);
                }
            }
            transport::failure(transport::EINPROGRESS)
        })
    }

    fn socket_close(&self, socket: RawSocket) -> i32 {
        match self.state.lock().channels.remove(&socket) {
            Some(_) => 0,
            None => transport::failure(transport::EBADF),
        }
    }

    fn socket_send(&self, socket: RawSocket, data: &[u8]) -> i32 {
        self.with_stream(socket, |stream| stream.write(data))
    }

    fn socket_recv(&self, socket: RawSocket, buf: &mut [u8]) -> i32 {
        self.with_stream(socket, |stream| stream.read(buf))
    }

    fn socket_pending(&self, socket: RawSocket) -> i32 {
        self.with_channel(socket, |channel| {
            let Some(stream) = channel.stream.as_ref() else {
                return transport::failure(transport::ENOTCONN);
            };
            if channel.peek_buf.is_empty() {
                channel.peek_buf.resize(PEEK_LIMIT, 0);
            }
            match stream.peek(&mut channel.peek_buf) {
                Ok(count) => clamp(count),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
                Err(e) => {
                    debug!(socket, error = %e, "pending query failed");
                    channel.latch(&e)
                }
            }
        })
    }

    fn socket_error(&self, socket: RawSocket) -> i32 {
        self.with_channel(socket, |channel| {
            i32::try_from(channel.error).unwrap_or(i32::MAX)
        })
    }

    fn socket_poll(&self, socket: RawSocket) -> i32 {
        self.with_channel(socket, |channel| {
            let Some(stream) = channel.stream.as_ref() else {
                return 0;
            };
            let mut first = [0u8; 1];
            // End of stream counts as readable: the next receive reports it.
            let readable = match stream.peek(&mut first) {
                Ok(_) => true,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
                Err(e) => {
                    channel.latch(&e);
                    false
                }
            };
            let writable = channel.error == 0;
            i32::from(readable) | (i32::from(writable) << 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_connect_reports_in_progress_then_writable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tcp = TcpTransport::new();
        let sock = tcp.socket_create();

        assert_eq!(
            tcp.socket_connect(sock, "127.0.0.1", port),
            transport::failure(transport::EINPROGRESS)
        );
        assert_eq!(tcp.socket_poll(sock) & 0b10, 0b10);
        assert_eq!(tcp.socket_error(sock), 0);
    }

    #[test]
    fn test_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tcp = TcpTransport::new();
        let sock = tcp.socket_create();
        tcp.socket_connect(sock, "127.0.0.1", port);
        let (mut peer, _) = listener.accept().unwrap();

        assert_eq!(tcp.socket_send(sock, b"ping"), 4);
        let mut received = [0u8; 4];
        peer.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"ping");

        let mut buf = [0u8; 16];
        assert_eq!(
            tcp.socket_recv(sock, &mut buf),
            transport::failure(transport::EAGAIN)
        );
        peer.write_all(b"pong").unwrap();
        assert!(wait_for(|| tcp.socket_pending(sock) == 4));
        let peek_ptr = tcp.state.lock().channels[&sock].peek_buf.as_ptr();
        assert_eq!(tcp.socket_pending(sock), 4);
        {
            let state = tcp.state.lock();
            assert_eq!(state.channels[&sock].peek_buf.as_ptr(), peek_ptr);
            assert_eq!(state.channels[&sock].peek_buf.len(), PEEK_LIMIT);
        }
        assert_eq!(tcp.socket_poll(sock) & 0b01, 0b01);
        assert_eq!(tcp.socket_recv(sock, &mut buf), 4);
        assert_eq!(&buf[..4], b"pong");
    }

    #[test]
    fn test_malformed_address_is_unreachable() {
        let tcp = TcpTransport::new();
        let sock = tcp.socket_create();
        assert_eq!(
            tcp.socket_connect(sock, "bad host!", 25565),
            transport::failure(transport::EHOSTUNREACH)
        );
    }

    #[test]
    fn test_unknown_socket_is_bad_handle() {
        let tcp = TcpTransport::new();
        assert_eq!(tcp.socket_error(42), transport::failure(transport::EBADF));
        assert_eq!(tcp.socket_close(42), transport::failure(transport::EBADF));
    }

    #[test]
    fn test_send_before_connect_is_not_connected() {
        let tcp = TcpTransport::new();
        let sock = tcp.socket_create();
        assert_eq!(
            tcp.socket_send(sock, b"x"),
            transport::failure(transport::ENOTCONN)
        );
        assert_eq!(tcp.socket_poll(sock), 0);
    }
}
