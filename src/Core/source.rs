//! Bounded-read sources for the producer loop.
//!
//! The producer only needs two things from a source: a readiness wait that
//! gives up after a timeout, and a single bounded read into a buffer it
//! provides. [`UdpSource`] is the datagram listener the receiver binary uses.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, warn};

/// Port the receiver listens on unless told otherwise.
pub const DEFAULT_LISTEN_PORT: u16 = 8888;

/// Kernel receive buffer requested for the listening socket (2 MiB).
pub const DEFAULT_RECV_BUFFER: usize = 2 * 1024 * 1024;

const SOCKET: Token = Token(0);
const EVENTS_CAPACITY: usize = 8;

/// Result of a readiness wait.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// A read is expected to make progress.
    Ready,
    /// Nothing arrived within the timeout, or the wait was interrupted.
    TimedOut,
}

/// Where the producer pulls records from.
pub trait Source {
    /// Block for at most `timeout` until data is available.
    fn wait_ready(&mut self, timeout: Duration) -> io::Result<Readiness>;

    /// Perform one read into `buf` and return the length of the record.
    ///
    /// A length greater than `buf.len()` means the record did not fit and
    /// only `buf.len()` bytes were stored. `WouldBlock` and `Interrupted`
    /// are retried by the producer; any other error stops it.
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Stop listening. Called once when the producer loop exits.
    fn shutdown(&mut self) {}
}

impl<S: Source + ?Sized> Source for &mut S {
    fn wait_ready(&mut self, timeout: Duration) -> io::Result<Readiness> {
        (**self).wait_ready(timeout)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_into(buf)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn wait_ready(&mut self, timeout: Duration) -> io::Result<Readiness> {
        (**self).wait_ready(timeout)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_into(buf)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// Non-blocking UDP listener driven by `mio`.
///
/// mio reports readiness edge-triggered, so the source remembers that the
/// socket is readable until a read returns `WouldBlock`.
///
/// The socket is bound with `SO_REUSEADDR` on unix so a restarted receiver
/// can take the port back immediately.
///
/// Oversized datagrams are only detected on Linux, where `MSG_TRUNC` makes
/// `read_into` report the real datagram length. Elsewhere the kernel drops
/// the excess silently and `read_into` never returns more than `buf.len()`,
/// so the producer's oversize policy never fires.
pub struct UdpSource {
    poll: Poll,
    events: Events,
    socket: UdpSocket,
    readable: bool,
    registered: bool,
}

impl UdpSource {
    /// Bind a UDP socket on `addr` and register it for read readiness.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let poll = Poll::new()?;
        let mut socket = bind_socket(addr)?;

        poll.registry()
            .register(&mut socket, SOCKET, Interest::READABLE)?;

        debug!(addr = %socket.local_addr()?, "udp source listening");

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            socket,
            readable: false,
            registered: true,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Ask the kernel for a larger receive queue, which absorbs bursts while
    /// the producer is held up by backpressure.
    #[cfg(unix)]
    pub fn set_recv_buffer_size(&self, bytes: usize) -> io::Result<()> {
        use std::os::fd::AsRawFd;

        let value = libc::c_int::try_from(bytes).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("receive buffer size {bytes} does not fit in a C int"),
            )
        })?;

        let ret = unsafe {
            libc::setsockopt(
                self.socket.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &value as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if ret == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn set_recv_buffer_size(&self, _bytes: usize) -> io::Result<()> {
        Ok(())
    }
}

impl Source for UdpSource {
    fn wait_ready(&mut self, timeout: Duration) -> io::Result<Readiness> {
        if self.readable {
            return Ok(Readiness::Ready);
        }

        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            // A signal landing mid-wait is treated like a timeout.
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(Readiness::TimedOut),
            Err(e) => return Err(e),
        }

        if self
            .events
            .iter()
            .any(|event| event.token() == SOCKET && event.is_readable())
        {
            self.readable = true;
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::TimedOut)
        }
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match recv_datagram(&self.socket, buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.readable = false;
                Err(e)
            }
            other => other,
        }
    }

    fn shutdown(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        self.readable = false;
        if let Err(e) = self.poll.registry().deregister(&mut self.socket) {
            warn!(error = %e, "failed to deregister udp socket");
        }
    }
}

#[cfg(unix)]
fn bind_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    use std::os::fd::FromRawFd;

    let domain = match addr {
        SocketAddr::V4(_) => libc::AF_INET,
        SocketAddr::V6(_) => libc::AF_INET6,
    };
    let fd = unsafe { libc::socket(domain, libc::SOCK_DGRAM, 0) };
    if fd == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: fd is a fresh socket nobody else owns; dropping `socket` closes it.
    let socket = unsafe { std::net::UdpSocket::from_raw_fd(fd) };

    let one: libc::c_int = 1;
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: sockaddr_storage is plain old data; all-zero is a valid value.
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            // SAFETY: sockaddr_storage is large and aligned enough for sockaddr_in.
            let sin = unsafe { &mut *(&mut storage as *mut _ as *mut libc::sockaddr_in) };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_port = v4.port().to_be();
            sin.sin_addr.s_addr = u32::from_ne_bytes(v4.ip().octets());
            std::mem::size_of::<libc::sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            // SAFETY: as above, for sockaddr_in6.
            let sin6 = unsafe { &mut *(&mut storage as *mut _ as *mut libc::sockaddr_in6) };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_port = v6.port().to_be();
            sin6.sin6_addr.s6_addr = v6.ip().octets();
            sin6.sin6_flowinfo = v6.flowinfo();
            sin6.sin6_scope_id = v6.scope_id();
            std::mem::size_of::<libc::sockaddr_in6>()
        }
    };

    let ret = unsafe {
        libc::bind(
            fd,
            &storage as *const libc::sockaddr_storage as *const libc::sockaddr,
            len as libc::socklen_t,
        )
    };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }

    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket))
}

#[cfg(not(unix))]
fn bind_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    UdpSocket::bind(addr)
}

/// Receive one datagram. On Linux `MSG_TRUNC` makes the kernel report the
/// real datagram length even when it exceeded `buf`.
#[cfg(target_os = "linux")]
fn recv_datagram(socket: &UdpSocket, buf: &mut [u8]) -> io::Result<usize> {
    use std::os::fd::AsRawFd;

    let ret = unsafe {
        libc::recv(
            socket.as_raw_fd(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            libc::MSG_TRUNC,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}

#[cfg(not(target_os = "linux"))]
fn recv_datagram(socket: &UdpSocket, buf: &mut [u8]) -> io::Result<usize> {
    socket.recv(buf)
}

impl std::fmt::Debug for UdpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpSource")
            .field("local_addr", &self.socket.local_addr().ok())
            .field("readable", &self.readable)
            .finish_non_exhaustive()
    }
}
