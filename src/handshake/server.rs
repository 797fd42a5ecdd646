//! Server handshake driver (C4): drives the handshake from the responder's
//! side (spec §4.4), consulting the replay filter and substituting
//! black-hole behavior for every detectable authentication failure so it
//! is indistinguishable, from the wire, from a successful handshake.

use std::io::{Read, Write};
use std::net::Ipv4Addr;

use p256::SecretKey;

use super::{
    client_confirmation_code, client_to_server_key, ecdh, server_confirmation_code,
    server_identifier, server_to_client_key, CONFIRMATION_CODE_LEN,
};
use crate::blackhole::BlackHole;
use crate::error::DarkStarError;
use crate::keys::{darkstar_decode, darkstar_encode, generate_darkstar_keypair, DARKSTAR_KEY_LEN};
use crate::record::SecureStream;
use crate::replay::ReplayFilter;

/// Either outcome of `server_accept`. Both variants implement `Read` and
/// `Write` identically from the caller's point of view — that is the
/// whole point: a caller using only the stream interface cannot tell a
/// rejected handshake from an accepted one.
pub enum ServerSession<S> {
    Secure(SecureStream<S>),
    BlackHole(BlackHole<S>),
}

impl<S: Read> Read for ServerSession<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ServerSession::Secure(s) => s.read(buf),
            ServerSession::BlackHole(b) => b.read(buf),
        }
    }
}

impl<S: Write> Write for ServerSession<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            ServerSession::Secure(s) => s.write(buf),
            ServerSession::BlackHole(b) => b.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            ServerSession::Secure(s) => s.flush(),
            ServerSession::BlackHole(b) => b.flush(),
        }
    }
}

/// Drives the DarkStar handshake from the responder's side:
///
/// 1. Read the candidate client ephemeral key.
/// 2. Consult the replay filter; a previously-seen key diverts to
///    black-hole with no bytes written.
/// 3. Decode the key; an off-curve or identity point also diverts.
/// 4. Read and verify `ccc`; a mismatch also diverts.
/// 5. On success, derive the directional keys and `scc`, write the
///    response, and return a framed connection.
///
/// Only a genuine I/O failure on the underlying stream surfaces as
/// `DarkStarError::HandshakeIo` — every detectable credential failure is
/// absorbed into `ServerSession::BlackHole` instead of an `Err`.
pub fn server_accept<S: Read + Write>(
    mut stream: S,
    server_persistent_sk: &SecretKey,
    host: Ipv4Addr,
    port: u16,
    replay_filter: &dyn ReplayFilter,
) -> Result<ServerSession<S>, DarkStarError> {
    let server_persistent_pk = server_persistent_sk.public_key();
    let sid = server_identifier(host, port);
    let (server_eph_sk, server_eph_pk) = generate_darkstar_keypair();

    let mut client_eph_bytes = [0u8; DARKSTAR_KEY_LEN];
    stream.read_exact(&mut client_eph_bytes)?;

    if replay_filter.check_and_add(&client_eph_bytes) {
        return Ok(ServerSession::BlackHole(BlackHole::new(stream)));
    }

    let client_eph_pk = match darkstar_decode(&client_eph_bytes) {
        Ok(pk) => pk,
        Err(_) => return Ok(ServerSession::BlackHole(BlackHole::new(stream))),
    };

    let mut ccc_received = [0u8; CONFIRMATION_CODE_LEN];
    stream.read_exact(&mut ccc_received)?;

    let z_p = ecdh(server_persistent_sk, &client_eph_pk);
    let ccc_expected = client_confirmation_code(&z_p, &sid, &server_persistent_pk, &client_eph_pk);
    if ccc_expected != ccc_received {
        return Ok(ServerSession::BlackHole(BlackHole::new(stream)));
    }

    let z1 = ecdh(&server_eph_sk, &client_eph_pk);
    let z2 = z_p;

    let k_c2s = client_to_server_key(&z1, &z2, &sid, &client_eph_pk, &server_eph_pk);
    let k_s2c = server_to_client_key(&z1, &z2, &sid, &client_eph_pk, &server_eph_pk);
    let scc = server_confirmation_code(&z_p, &sid, &server_persistent_pk, &client_eph_pk);

    stream.write_all(&darkstar_encode(&server_eph_pk))?;
    stream.write_all(&scc)?;

    Ok(ServerSession::Secure(SecureStream::new(stream, k_s2c, k_c2s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A `Read + Write` wrapper over separate in and out buffers, so a
    /// single-threaded test can drive both sides of `server_accept` without
    /// a real socket.
    struct DuplexPipe {
        read_from: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Read for DuplexPipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.read_from.read(buf)
        }
    }

    impl Write for DuplexPipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn garbage_client_ephemeral_key_is_black_holed_not_errored() {
        let (server_sk, _server_pk) = generate_darkstar_keypair();
        let filter = crate::replay::InMemoryReplayFilter::new();

        // 32 bytes that do not decode to a point on the curve for an
        // arbitrary choice of the implicit 0x02 tag.
        let mut bogus = vec![0xFFu8; DARKSTAR_KEY_LEN];
        bogus.extend_from_slice(&[0u8; CONFIRMATION_CODE_LEN]);
        let pipe = DuplexPipe { read_from: Cursor::new(bogus), written: Vec::new() };

        let session =
            server_accept(pipe, &server_sk, Ipv4Addr::new(127, 0, 0, 1), 1234, &filter).unwrap();
        assert!(matches!(session, ServerSession::BlackHole(_)));
    }

    #[test]
    fn previously_seen_client_ephemeral_key_is_black_holed_before_any_response() {
        let (server_sk, server_pk) = generate_darkstar_keypair();
        let filter = crate::replay::InMemoryReplayFilter::new();

        let (_eph_sk, eph_pk) = generate_darkstar_keypair();
        let eph_wire = darkstar_encode(&eph_pk);
        filter.check_and_add(&eph_wire);

        let sid = server_identifier(Ipv4Addr::new(127, 0, 0, 1), 1234);
        let z_p = ecdh(&server_sk, &eph_pk);
        let ccc = client_confirmation_code(&z_p, &sid, &server_pk, &eph_pk);

        let mut input = eph_wire.to_vec();
        input.extend_from_slice(&ccc);
        let pipe = DuplexPipe { read_from: Cursor::new(input), written: Vec::new() };

        let session =
            server_accept(pipe, &server_sk, Ipv4Addr::new(127, 0, 0, 1), 1234, &filter).unwrap();
        match session {
            ServerSession::BlackHole(b) => assert!(b.into_inner().written.is_empty()),
            ServerSession::Secure(_) => panic!("replayed key must not produce a secure session"),
        }
    }
}
