use std::{error, fmt, io};

/// `DarkStarError` is the complete error taxonomy surfaced to callers of the
/// handshake and record layer. The server driver deliberately does not
/// surface authentication or replay failures through this type — those are
/// absorbed into black-hole behavior (see `server_accept`) so that an
/// observer on the wire cannot distinguish them from a successful handshake.
#[derive(Debug)]
pub enum DarkStarError {
    /// Key bytes were malformed, off-curve, the point at infinity, or of
    /// the wrong length.
    InvalidKey,
    /// The configured host is not representable as an IPv4 literal, or the
    /// port is out of range.
    InvalidAddress,
    /// The underlying stream failed before the handshake completed.
    HandshakeIo(io::Error),
    /// The client's copy of `scc` did not match the value the server sent.
    HandshakeAuthFailure,
    /// A record's GCM tag failed to verify, or its decrypted length field
    /// exceeded the 16383-byte maximum.
    RecordAuthFailure,
}

impl error::Error for DarkStarError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DarkStarError::HandshakeIo(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DarkStarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DarkStarError::InvalidKey => write!(f, "invalid key material"),
            DarkStarError::InvalidAddress => write!(f, "server address is not a valid IPv4 host:port"),
            DarkStarError::HandshakeIo(e) => write!(f, "handshake io error: {}", e),
            DarkStarError::HandshakeAuthFailure => write!(f, "server confirmation code did not match"),
            DarkStarError::RecordAuthFailure => write!(f, "record authentication failed"),
        }
    }
}

impl From<io::Error> for DarkStarError {
    fn from(e: io::Error) -> Self {
        DarkStarError::HandshakeIo(e)
    }
}
