//! Black-hole connection (C4-adjacent): what the server substitutes in for
//! a live session when it decides, silently, not to continue a handshake.
//!
//! Reads return cryptographically random bytes forever; writes are
//! discarded and report success. `close()`/deadlines are best-effort
//! pass-through to the wrapped stream and otherwise no-ops — per spec §9's
//! open question, nothing here is allowed to introduce a signal an
//! observer could use to tell a black-holed connection from a real one.

use std::io::{self, Read, Write};

use rand::RngCore;

/// Wraps a live stream `S` and behaves as described above. The wrapped
/// stream is kept (rather than dropped) so that `close()` can still be a
/// meaningful pass-through and the peer's own close/EOF is still observed
/// by whatever holds the black hole, not synthesized.
pub struct BlackHole<S> {
    inner: S,
}

impl<S> BlackHole<S> {
    pub(crate) fn new(inner: S) -> Self {
        BlackHole { inner }
    }

    /// Best-effort pass-through close of the wrapped stream.
    pub fn close(self) -> io::Result<()>
    where
        S: Shutdown,
    {
        self.inner.shutdown()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

/// Minimal shutdown seam so `BlackHole::close` can pass through on stream
/// types that support it (e.g. `TcpStream`) without requiring every `Read +
/// Write` type used in tests to implement one.
pub trait Shutdown {
    fn shutdown(&self) -> io::Result<()>;
}

impl Shutdown for std::net::TcpStream {
    fn shutdown(&self) -> io::Result<()> {
        std::net::TcpStream::shutdown(self, std::net::Shutdown::Both)
    }
}

impl<S> Read for BlackHole<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        rand::rngs::OsRng.fill_bytes(buf);
        Ok(buf.len())
    }
}

impl<S> Write for BlackHole<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
