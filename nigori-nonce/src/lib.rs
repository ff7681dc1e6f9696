//! Replay-prevention nonce ledger: a per-public-key set of seen request
//! nonces. `check_and_add` is the atomic guard every signed request passes
//! through; `purge_expired` is the maintenance sweep that keeps the ledger
//! from growing without bound.

use nigori_base::Result;
use nigori_keys::nonces_key;
use nigori_store::Txn;

#[derive(Debug, Default, Clone, Copy)]
pub struct NonceLedger;

impl NonceLedger {
    pub fn new() -> Self {
        NonceLedger
    }

    /// Atomically checks whether `nonce_token` has been seen before under
    /// `public_key` and, if not, records it. Returns `true` exactly once
    /// for any given `(public_key, nonce_token)` pair -- every subsequent
    /// call returns `false`.
    pub fn check_and_add(&self, txn: &Txn, public_key: &[u8], nonce_token: &[u8]) -> Result<bool> {
        let key = nonces_key(public_key);
        if txn.get_exact(&key, nonce_token)? {
            return Ok(false);
        }
        txn.put(&key, nonce_token)?;
        Ok(true)
    }

    /// Removes every nonce under `public_key` whose embedded timestamp
    /// (the first 8 bytes, big-endian unix-ms) is older than `now_ms -
    /// ttl_ms`. Returns the count removed. Tokens shorter than 8 bytes
    /// should never occur (callers go through `nigori_types::Nonce`
    /// validation before they reach the ledger) but are treated as
    /// never-expiring rather than panicking, since purge is a best-effort
    /// maintenance sweep, not a correctness-critical path.
    pub fn purge_expired(
        &self,
        txn: &Txn,
        public_key: &[u8],
        now_ms: u64,
        ttl_ms: u64,
    ) -> Result<usize> {
        let key = nonces_key(public_key);
        let cutoff = now_ms.saturating_sub(ttl_ms);
        let tokens: Vec<Vec<u8>> = txn.cursor(&key)?.collect();
        let mut removed = 0usize;
        for token in tokens {
            if token.len() < 8 {
                continue;
            }
            let mut ts_bytes = [0u8; 8];
            ts_bytes.copy_from_slice(&token[..8]);
            let ts = u64::from_be_bytes(ts_bytes);
            if ts < cutoff && txn.remove_duplicate(&key, &token)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nigori_store::Store;
    use test_log::test;

    fn open_tmp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    fn token_at(ms: u64, tag: &[u8]) -> Vec<u8> {
        let mut t = ms.to_be_bytes().to_vec();
        t.extend_from_slice(tag);
        t
    }

    #[test]
    fn check_and_add_accepts_once_then_rejects_replay() {
        let (_dir, store) = open_tmp();
        let ledger = NonceLedger::new();
        let txn = store.begin_txn().unwrap();
        let nonce = token_at(1_000, b"a");
        assert!(ledger.check_and_add(&txn, b"pk", &nonce).unwrap());
        assert!(!ledger.check_and_add(&txn, b"pk", &nonce).unwrap());
        txn.commit().unwrap();
    }

    #[test]
    fn distinct_nonce_same_key_is_accepted() {
        let (_dir, store) = open_tmp();
        let ledger = NonceLedger::new();
        let txn = store.begin_txn().unwrap();
        assert!(ledger.check_and_add(&txn, b"pk", &token_at(1, b"a")).unwrap());
        assert!(ledger.check_and_add(&txn, b"pk", &token_at(1, b"b")).unwrap());
        txn.commit().unwrap();
    }

    #[test]
    fn purge_removes_only_nonces_older_than_ttl() {
        let (_dir, store) = open_tmp();
        let ledger = NonceLedger::new();
        let txn = store.begin_txn().unwrap();
        ledger.check_and_add(&txn, b"pk", &token_at(1_000, b"old")).unwrap();
        ledger.check_and_add(&txn, b"pk", &token_at(9_000, b"new")).unwrap();

        let removed = ledger.purge_expired(&txn, b"pk", 10_000, 5_000).unwrap();
        assert_eq!(removed, 1);

        assert!(!ledger.check_and_add(&txn, b"pk", &token_at(9_000, b"new")).unwrap());
        assert!(ledger.check_and_add(&txn, b"pk", &token_at(1_000, b"old")).unwrap());
        txn.commit().unwrap();
    }
}
