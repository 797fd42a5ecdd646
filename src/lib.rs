//! DarkStar: a P-256/AES-256-GCM handshake and obfuscated AEAD record
//! layer in the Shadowsocks family. Two peers who already share the
//! server's persistent public key run a one-round-trip handshake
//! (`client_connect` / `server_accept`) that yields a pair of directional
//! keys, then exchange application data as a stream of independently
//! authenticated records (`record::SecureStream`) over any `Read + Write`
//! transport.
//!
//! Detectable handshake failures on the server side never produce an
//! `Err` — they are absorbed into [`handshake::server::ServerSession::BlackHole`]
//! so a probing client cannot distinguish a bad credential from a live
//! session by watching the wire.

#![forbid(unsafe_code)]

pub mod blackhole;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod record;
pub mod replay;

pub use blackhole::BlackHole;
pub use error::DarkStarError;
pub use handshake::client::client_connect;
pub use handshake::server::{server_accept, ServerSession};
pub use handshake::{parse_ipv4_host, server_identifier};
pub use keys::{
    darkstar_decode, darkstar_encode, decode_private_key_base64, decode_public_key_base64,
    encode_private_key_base64, encode_public_key_base64, generate_darkstar_keypair,
    keychain_decode, keychain_encode, load_private_key_file, load_public_key_file,
    save_private_key_file, save_public_key_file, DARKSTAR_KEY_LEN, KEYCHAIN_KEY_LEN,
};
pub use record::{SecureStream, MAX_RECORD_PAYLOAD};
pub use replay::{InMemoryReplayFilter, ReplayFilter};
