//! P-256 public key encoding (C1): the two wire/file formats DarkStar uses,
//! plus the Base64 string-form and raw key-file conventions from spec §6.
//!
//! Darkstar format is a 32-byte compressed SEC1 point with the leading tag
//! byte stripped, on the convention that the tag is always `0x02`.
//! `generate_darkstar_keypair` rejection-samples to guarantee that
//! invariant; `darkstar_encode` assumes its caller already holds it.
//!
//! Keychain format is a single `0x02` prefix byte followed by the 65-byte
//! uncompressed SEC1 encoding (`0x04 || X || Y`).

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand_core::OsRng;

use crate::error::DarkStarError;

pub const DARKSTAR_KEY_LEN: usize = 32;
pub const KEYCHAIN_KEY_LEN: usize = 66;

const EVEN_TAG: u8 = 0x02;
const KEYCHAIN_PREFIX: u8 = 0x02;
const UNCOMPRESSED_TAG: u8 = 0x04;

/// Strips the leading SEC1 tag byte from the 33-byte compressed encoding of
/// `public_key`. Precondition: `public_key` was produced by
/// `generate_darkstar_keypair` (or otherwise known to have an even
/// y-coordinate) — passing an odd-tagged key loses information silently.
pub fn darkstar_encode(public_key: &PublicKey) -> [u8; DARKSTAR_KEY_LEN] {
    let encoded = public_key.as_affine().to_encoded_point(true);
    let bytes = encoded.as_bytes();
    let mut out = [0u8; DARKSTAR_KEY_LEN];
    out.copy_from_slice(&bytes[1..]);
    out
}

/// Reconstructs a public key from its 32-byte Darkstar-format encoding by
/// re-prepending the implicit `0x02` tag before SEC1 decompression.
pub fn darkstar_decode(bytes: &[u8; DARKSTAR_KEY_LEN]) -> Result<PublicKey, DarkStarError> {
    let mut sec1 = [0u8; 1 + DARKSTAR_KEY_LEN];
    sec1[0] = EVEN_TAG;
    sec1[1..].copy_from_slice(bytes);
    PublicKey::from_sec1_bytes(&sec1).map_err(|_| DarkStarError::InvalidKey)
}

/// Encodes `public_key` in 66-byte Keychain format.
pub fn keychain_encode(public_key: &PublicKey) -> [u8; KEYCHAIN_KEY_LEN] {
    let encoded = public_key.as_affine().to_encoded_point(false);
    let bytes = encoded.as_bytes();
    let mut out = [0u8; KEYCHAIN_KEY_LEN];
    out[0] = KEYCHAIN_PREFIX;
    out[1..].copy_from_slice(bytes);
    out
}

/// Decodes 66-byte Keychain format: skips the prefix byte and decodes the
/// remaining 65 bytes as uncompressed SEC1.
pub fn keychain_decode(bytes: &[u8; KEYCHAIN_KEY_LEN]) -> Result<PublicKey, DarkStarError> {
    if bytes[0] != KEYCHAIN_PREFIX || bytes[1] != UNCOMPRESSED_TAG {
        return Err(DarkStarError::InvalidKey);
    }
    PublicKey::from_sec1_bytes(&bytes[1..]).map_err(|_| DarkStarError::InvalidKey)
}

/// Rejection-samples a P-256 keypair until the compressed form of the
/// public key begins with `0x02` (an even y-coordinate), which is what
/// makes the 32-byte Darkstar wire encoding lossless.
pub fn generate_darkstar_keypair() -> (SecretKey, PublicKey) {
    loop {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        let encoded = public.as_affine().to_encoded_point(true);
        if encoded.as_bytes()[0] == EVEN_TAG {
            return (secret, public);
        }
    }
}

/// Base64-standard (padded) encoding of a public key in Keychain format —
/// the string form passed to clients in configuration.
pub fn encode_public_key_base64(public_key: &PublicKey) -> String {
    STANDARD.encode(keychain_encode(public_key))
}

pub fn decode_public_key_base64(s: &str) -> Result<PublicKey, DarkStarError> {
    let bytes = STANDARD.decode(s.trim()).map_err(|_| DarkStarError::InvalidKey)?;
    let arr: [u8; KEYCHAIN_KEY_LEN] = bytes.try_into().map_err(|_| DarkStarError::InvalidKey)?;
    keychain_decode(&arr)
}

/// Base64-standard (padded) encoding of the raw 32-byte private scalar.
pub fn encode_private_key_base64(secret_key: &SecretKey) -> String {
    STANDARD.encode(secret_key.to_bytes())
}

pub fn decode_private_key_base64(s: &str) -> Result<SecretKey, DarkStarError> {
    let bytes = STANDARD.decode(s.trim()).map_err(|_| DarkStarError::InvalidKey)?;
    SecretKey::from_slice(&bytes).map_err(|_| DarkStarError::InvalidKey)
}

/// Loads a 32-byte raw big-endian P-256 scalar from `path` (spec §6
/// private key file format).
pub fn load_private_key_file(path: impl AsRef<Path>) -> Result<SecretKey, DarkStarError> {
    let bytes = fs::read(path)?;
    SecretKey::from_slice(&bytes).map_err(|_| DarkStarError::InvalidKey)
}

/// Writes a 32-byte raw big-endian P-256 scalar to `path`, setting
/// permissions to `0600` where the platform supports it.
pub fn save_private_key_file(path: impl AsRef<Path>, secret_key: &SecretKey) -> Result<(), DarkStarError> {
    let path = path.as_ref();
    fs::write(path, secret_key.to_bytes())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Loads a 66-byte Keychain-format public key from `path`.
pub fn load_public_key_file(path: impl AsRef<Path>) -> Result<PublicKey, DarkStarError> {
    let bytes = fs::read(path)?;
    let arr: [u8; KEYCHAIN_KEY_LEN] = bytes.try_into().map_err(|_| DarkStarError::InvalidKey)?;
    keychain_decode(&arr)
}

/// Writes a 66-byte Keychain-format public key to `path`, setting
/// permissions to `0644` where the platform supports it.
pub fn save_public_key_file(path: impl AsRef<Path>, public_key: &PublicKey) -> Result<(), DarkStarError> {
    let path = path.as_ref();
    fs::write(path, keychain_encode(public_key))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    }
    Ok(())
}
