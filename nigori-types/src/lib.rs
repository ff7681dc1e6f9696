use serde::{Deserialize, Serialize};

use nigori_base::{err, Result};

/// The minimum length of a nonce token: an 8-byte big-endian unix-ms
/// timestamp, plus at least one byte of client-chosen entropy.
pub const NONCE_MIN_LEN: usize = 9;

/// A registered user, identified by the hash of their public key. Fully
/// populated or not observable at all — see the registry's state machine.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct User {
    pub public_hash: Vec<u8>,
    pub public_key: Vec<u8>,
    pub registration_time: u64,
}

impl User {
    pub fn new(public_hash: Vec<u8>, public_key: Vec<u8>, registration_time: u64) -> Self {
        User {
            public_hash,
            public_key,
            registration_time,
        }
    }
}

/// One revision of a value stored under some index: the pair the record
/// store hands back from `get_record`/`get_revision`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct RevValue {
    pub revision: Vec<u8>,
    pub value: Vec<u8>,
}

impl RevValue {
    pub fn new(revision: Vec<u8>, value: Vec<u8>) -> Self {
        RevValue { revision, value }
    }
}

/// An opaque replay-prevention token: an 8-byte big-endian unix-ms
/// timestamp followed by client-chosen entropy. The core only ever reads
/// the timestamp prefix, during `purge_expired_nonces`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Nonce {
    token: Vec<u8>,
}

impl Nonce {
    pub fn new(token: Vec<u8>) -> Result<Self> {
        if token.len() < NONCE_MIN_LEN {
            return Err(err("nonce token too short"));
        }
        Ok(Nonce { token })
    }

    pub fn token(&self) -> &[u8] {
        &self.token
    }

    pub fn timestamp_ms(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.token[..8]);
        u64::from_be_bytes(buf)
    }
}
