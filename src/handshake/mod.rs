//! Handshake core (C2): server identifier derivation, the ECDH shared
//! secrets, confirmation codes, and the two per-direction keys. These are
//! pure functions shared by both the client driver (`client.rs`) and the
//! server driver (`server.rs`) — neither side owns the formulas, they both
//! just call them with their own key material.

pub mod client;
pub mod server;

use std::net::Ipv4Addr;

use p256::{PublicKey, SecretKey};
use sha2::{Digest, Sha256};

use crate::error::DarkStarError;
use crate::keys::{darkstar_encode, keychain_encode};

pub const SID_LEN: usize = 6;
pub const CONFIRMATION_CODE_LEN: usize = 32;
pub const DIRECTIONAL_KEY_LEN: usize = 32;

const PROTOCOL_TAG: &[u8] = b"DarkStar";
const ROLE_CLIENT: &[u8] = b"client";
const ROLE_SERVER: &[u8] = b"server";

/// `sid = IPv4(host) || BE16(port)`, per spec §4.2. Both peers must compute
/// an identical value out-of-band; there is no wire encoding for it.
pub fn server_identifier(host: Ipv4Addr, port: u16) -> [u8; SID_LEN] {
    let mut sid = [0u8; SID_LEN];
    sid[..4].copy_from_slice(&host.octets());
    sid[4..].copy_from_slice(&port.to_be_bytes());
    sid
}

/// Parses a host string into the `Ipv4Addr` the `sid` is derived from,
/// rejecting anything that isn't an IPv4 literal (spec §9: DarkStar does
/// not define a `sid` for IPv6).
pub fn parse_ipv4_host(host: &str) -> Result<Ipv4Addr, DarkStarError> {
    host.parse::<Ipv4Addr>().map_err(|_| DarkStarError::InvalidAddress)
}

/// ECDH shared secret encoded as the raw X-coordinate of the resulting
/// point (32 bytes) — no hashing, unlike a Noise `mix_key` ratchet.
pub fn ecdh(local_secret: &SecretKey, remote_public: &PublicKey) -> [u8; 32] {
    let shared = p256::ecdh::diffie_hellman(
        &local_secret.to_nonzero_scalar(),
        remote_public.as_affine(),
    );
    let mut out = [0u8; 32];
    out.copy_from_slice(shared.raw_secret_bytes().as_slice());
    out
}

/// Computes `ccc` or `scc` (they differ only in the trailing role tag):
///
/// ```text
/// SHA256( z_p || sid || keychain_encode(server_persistent_pk)
///              || darkstar_encode(client_eph_pk) || "DarkStar" || role )
/// ```
fn confirmation_code(
    z_p: &[u8; 32],
    sid: &[u8; SID_LEN],
    server_persistent_pk: &PublicKey,
    client_eph_pk: &PublicKey,
    role: &[u8],
) -> [u8; CONFIRMATION_CODE_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(z_p);
    hasher.update(sid);
    hasher.update(keychain_encode(server_persistent_pk));
    hasher.update(darkstar_encode(client_eph_pk));
    hasher.update(PROTOCOL_TAG);
    hasher.update(role);
    let digest = hasher.finalize();
    let mut out = [0u8; CONFIRMATION_CODE_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Client confirmation code: proves the client knows the server's
/// persistent public key.
pub fn client_confirmation_code(
    z_p: &[u8; 32],
    sid: &[u8; SID_LEN],
    server_persistent_pk: &PublicKey,
    client_eph_pk: &PublicKey,
) -> [u8; CONFIRMATION_CODE_LEN] {
    confirmation_code(z_p, sid, server_persistent_pk, client_eph_pk, ROLE_CLIENT)
}

/// Server confirmation code: proves the server holds the persistent
/// private key.
pub fn server_confirmation_code(
    z_p: &[u8; 32],
    sid: &[u8; SID_LEN],
    server_persistent_pk: &PublicKey,
    client_eph_pk: &PublicKey,
) -> [u8; CONFIRMATION_CODE_LEN] {
    confirmation_code(z_p, sid, server_persistent_pk, client_eph_pk, ROLE_SERVER)
}

/// Computes `k_c2s` or `k_s2c` (they differ only in the trailing role tag,
/// which reflects the *sender* being authenticated to the *receiver*):
///
/// ```text
/// SHA256( z1 || z2 || sid || darkstar_encode(client_eph_pk)
///             || darkstar_encode(server_eph_pk) || "DarkStar" || role )
/// ```
fn directional_key(
    z1: &[u8; 32],
    z2: &[u8; 32],
    sid: &[u8; SID_LEN],
    client_eph_pk: &PublicKey,
    server_eph_pk: &PublicKey,
    role: &[u8],
) -> [u8; DIRECTIONAL_KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(z1);
    hasher.update(z2);
    hasher.update(sid);
    hasher.update(darkstar_encode(client_eph_pk));
    hasher.update(darkstar_encode(server_eph_pk));
    hasher.update(PROTOCOL_TAG);
    hasher.update(role);
    let digest = hasher.finalize();
    let mut out = [0u8; DIRECTIONAL_KEY_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Client-to-server key: the sender (client) is authenticated to the
/// receiver (server), hence the `"server"` role tag.
pub fn client_to_server_key(
    z1: &[u8; 32],
    z2: &[u8; 32],
    sid: &[u8; SID_LEN],
    client_eph_pk: &PublicKey,
    server_eph_pk: &PublicKey,
) -> [u8; DIRECTIONAL_KEY_LEN] {
    directional_key(z1, z2, sid, client_eph_pk, server_eph_pk, ROLE_SERVER)
}

/// Server-to-client key: the sender (server) is authenticated to the
/// receiver (client), hence the `"client"` role tag.
pub fn server_to_client_key(
    z1: &[u8; 32],
    z2: &[u8; 32],
    sid: &[u8; SID_LEN],
    client_eph_pk: &PublicKey,
    server_eph_pk: &PublicKey,
) -> [u8; DIRECTIONAL_KEY_LEN] {
    directional_key(z1, z2, sid, client_eph_pk, server_eph_pk, ROLE_CLIENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sid_canonical_value() {
        let sid = server_identifier(Ipv4Addr::new(127, 0, 0, 1), 1234);
        assert_eq!(sid, [0x7F, 0x00, 0x00, 0x01, 0x04, 0xD2]);
    }

    #[test]
    fn parse_ipv4_host_rejects_ipv6() {
        assert!(parse_ipv4_host("::1").is_err());
        assert!(parse_ipv4_host("not-an-address").is_err());
        assert!(parse_ipv4_host("127.0.0.1").is_ok());
    }
}
