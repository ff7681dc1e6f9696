//! Pure functions laying the three-level hierarchy (user -> index -> revision
//! -> value) out onto flat byte keys for the ordered-duplicates byte store.
//!
//! No escaping is performed on embedded bytes: uniqueness of the physical
//! keys relies entirely on the position and length of the fixed tag
//! components, never on the separator being absent from variable input.
//! This mirrors the on-disk format fixed by the external contract and must
//! not change without a format migration.

/// Reserved separator byte between key components.
pub const SEPARATOR: u8 = b'/';

const USERS: &[u8] = b"users";
const STORES: &[u8] = b"stores";
const NONCES: &[u8] = b"users/nonces";
const DATE: &[u8] = b"date";
const KEY: &[u8] = b"key";

fn join(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum::<usize>() + parts.len().saturating_sub(1);
    let mut out = Vec::with_capacity(len);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.extend_from_slice(part);
    }
    out
}

/// `users` — the user roster; duplicates are public hashes.
pub fn users_key() -> Vec<u8> {
    USERS.to_vec()
}

/// `users/<public_hash>/date` — registration timestamp, 8-byte big-endian unix-ms.
pub fn reg_date_key(public_hash: &[u8]) -> Vec<u8> {
    join(&[USERS, public_hash, DATE])
}

/// `users/<public_hash>/key` — the user's raw public key bytes.
pub fn public_key_key(public_hash: &[u8]) -> Vec<u8> {
    join(&[USERS, public_hash, KEY])
}

/// `stores/<public_hash>` — index set; duplicates are index bytes.
pub fn stores_key(public_hash: &[u8]) -> Vec<u8> {
    join(&[STORES, public_hash])
}

/// `stores/<public_hash>/<index>` — revision set; duplicates are revision bytes.
pub fn lookup_key(public_hash: &[u8], index: &[u8]) -> Vec<u8> {
    join(&[STORES, public_hash, index])
}

/// `stores/<public_hash>/<index>/<revision>` — the value blob.
pub fn value_key(public_hash: &[u8], index: &[u8], revision: &[u8]) -> Vec<u8> {
    join(&[STORES, public_hash, index, revision])
}

/// `users/nonces/<public_key>` — nonce set; duplicates are raw nonce tokens.
pub fn nonces_key(public_key: &[u8]) -> Vec<u8> {
    join(&[NONCES, public_key])
}
