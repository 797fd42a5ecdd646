//! Client handshake driver (C3): drives the handshake from the
//! initiator's side (spec §4.3) and assembles the resulting `SecureStream`.

use std::io::{Read, Write};
use std::net::Ipv4Addr;

use p256::PublicKey;

use super::{
    client_confirmation_code, client_to_server_key, ecdh, server_confirmation_code,
    server_identifier, server_to_client_key, CONFIRMATION_CODE_LEN,
};
use crate::error::DarkStarError;
use crate::keys::{darkstar_decode, darkstar_encode, generate_darkstar_keypair, DARKSTAR_KEY_LEN};
use crate::record::SecureStream;

/// Drives the DarkStar handshake from the initiator's side:
///
/// 1. Send `darkstar_encode(client_eph_pk)` then `ccc`.
/// 2. Receive `darkstar_encode(server_eph_pk)` then `scc`.
/// 3. Verify `scc`; derive `k_c2s`/`k_s2c` and return a framed connection.
///
/// Any I/O error before completion surfaces as `DarkStarError::HandshakeIo`;
/// a confirmation-code mismatch surfaces as `HandshakeAuthFailure` and no
/// application bytes are ever produced.
pub fn client_connect<S: Read + Write>(
    mut stream: S,
    server_persistent_pk: &PublicKey,
    host: Ipv4Addr,
    port: u16,
) -> Result<SecureStream<S>, DarkStarError> {
    let sid = server_identifier(host, port);
    let (client_eph_sk, client_eph_pk) = generate_darkstar_keypair();

    let z_p = ecdh(&client_eph_sk, server_persistent_pk);
    let ccc = client_confirmation_code(&z_p, &sid, server_persistent_pk, &client_eph_pk);

    stream.write_all(&darkstar_encode(&client_eph_pk))?;
    stream.write_all(&ccc)?;

    let mut server_eph_bytes = [0u8; DARKSTAR_KEY_LEN];
    stream.read_exact(&mut server_eph_bytes)?;
    let server_eph_pk = darkstar_decode(&server_eph_bytes)?;

    let mut scc_received = [0u8; CONFIRMATION_CODE_LEN];
    stream.read_exact(&mut scc_received)?;

    let scc_expected = server_confirmation_code(&z_p, &sid, server_persistent_pk, &client_eph_pk);
    if scc_expected != scc_received {
        return Err(DarkStarError::HandshakeAuthFailure);
    }

    let z1 = ecdh(&client_eph_sk, &server_eph_pk);
    let z2 = z_p;

    let k_c2s = client_to_server_key(&z1, &z2, &sid, &client_eph_pk, &server_eph_pk);
    let k_s2c = server_to_client_key(&z1, &z2, &sid, &client_eph_pk, &server_eph_pk);

    Ok(SecureStream::new(stream, k_c2s, k_s2c))
}
