//! AEAD record layer (C5): length-prefixed, independently authenticated
//! AES-256-GCM records over an arbitrary `Read + Write` stream.
//!
//! Each user-visible record on the wire is two independently encrypted
//! GCM records back to back — a 2-byte big-endian length, then the
//! payload — and each consumes its own nonce from the sender's 96-bit
//! little-endian counter. Keys are derived once at the end of the
//! handshake and are never rotated or reset (spec §3, §9: DarkStar has no
//! rekeying).

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use byteorder::{BigEndian, ByteOrder};

use crate::error::DarkStarError;

const MAC_SIZE: usize = 16;
const LENGTH_HEADER_SIZE: usize = 2;
/// 2^14 - 1: the largest plaintext payload a single record can carry.
pub const MAX_RECORD_PAYLOAD: usize = 16383;

fn to_io_error(e: DarkStarError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// One direction's AEAD state: the AES-256-GCM instance keyed on the
/// derived directional key, and the monotone nonce counter.
struct CipherState {
    cipher: Aes256Gcm,
    nonce_counter: u64,
}

impl fmt::Debug for CipherState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CipherState {{ nonce: {} }}", hex::encode(self.nonce_bytes()))
    }
}

impl CipherState {
    fn new(key: [u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        CipherState { cipher, nonce_counter: 0 }
    }

    fn nonce_bytes(&self) -> [u8; 12] {
        // 96-bit little-endian counter; the high 32 bits stay zero for the
        // lifetime of any realistic session.
        let mut nonce = [0u8; 12];
        nonce[..8].copy_from_slice(&self.nonce_counter.to_le_bytes());
        nonce
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, DarkStarError> {
        let nonce_bytes = self.nonce_bytes();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| DarkStarError::RecordAuthFailure)?;
        self.nonce_counter += 1;
        Ok(ciphertext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, DarkStarError> {
        let nonce_bytes = self.nonce_bytes();
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
            .map_err(|_| DarkStarError::RecordAuthFailure)?;
        self.nonce_counter += 1;
        Ok(plaintext)
    }

    #[cfg(test)]
    fn nonce_counter(&self) -> u64 {
        self.nonce_counter
    }
}

/// A handshake-completed DarkStar connection: a reliable, in-order,
/// authenticated byte stream layered over `inner`.
pub struct SecureStream<S> {
    inner: S,
    send: CipherState,
    recv: CipherState,
    read_buffer: VecDeque<u8>,
}

impl<S> SecureStream<S> {
    pub(crate) fn new(inner: S, send_key: [u8; 32], recv_key: [u8; 32]) -> Self {
        SecureStream {
            inner,
            send: CipherState::new(send_key),
            recv: CipherState::new(recv_key),
            read_buffer: VecDeque::new(),
        }
    }

    /// Returns the wrapped stream, discarding any buffered plaintext.
    /// Intended for best-effort access to the underlying socket (e.g. to
    /// set deadlines) rather than continued use after the session ends.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Write> SecureStream<S> {
    fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut len_bytes = [0u8; LENGTH_HEADER_SIZE];
        BigEndian::write_u16(&mut len_bytes, payload.len() as u16);
        let enc_len = self.send.encrypt(&len_bytes).map_err(to_io_error)?;
        self.inner.write_all(&enc_len)?;
        let enc_payload = self.send.encrypt(payload).map_err(to_io_error)?;
        self.inner.write_all(&enc_payload)?;
        Ok(())
    }
}

impl<S: Read> SecureStream<S> {
    fn read_record(&mut self) -> io::Result<Vec<u8>> {
        let mut len_record = [0u8; LENGTH_HEADER_SIZE + MAC_SIZE];
        self.inner.read_exact(&mut len_record)?;
        let len_plain = self.recv.decrypt(&len_record).map_err(to_io_error)?;

        let n = BigEndian::read_u16(&len_plain) as usize;
        if n > MAX_RECORD_PAYLOAD {
            return Err(to_io_error(DarkStarError::RecordAuthFailure));
        }

        let mut payload_record = vec![0u8; n + MAC_SIZE];
        self.inner.read_exact(&mut payload_record)?;
        self.recv.decrypt(&payload_record).map_err(to_io_error)
    }
}

impl<S: Write> Write for SecureStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(MAX_RECORD_PAYLOAD);
        self.write_record(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Read> Read for SecureStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.read_buffer.is_empty() {
            let plaintext = self.read_record()?;
            self.read_buffer.extend(plaintext);
        }
        let n = buf.len().min(self.read_buffer.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.read_buffer.pop_front().expect("checked length above");
        }
        Ok(n)
    }
}
