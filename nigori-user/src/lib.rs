//! User registry: registration, lookup, and deletion of user records keyed
//! by a public-key hash. Every method here takes an already-open `Txn` --
//! transaction lifecycle belongs to the facade, not to this component, so
//! that `delete_user` can compose registry cleanup with record-store and
//! nonce-ledger cleanup inside one atomic unit.

use nigori_base::Result;
use nigori_keys::{public_key_key, reg_date_key, users_key};
use nigori_store::Txn;
use nigori_types::User;

#[derive(Debug, Default, Clone, Copy)]
pub struct UserRegistry;

impl UserRegistry {
    pub fn new() -> Self {
        UserRegistry
    }

    /// Registers a new user, stamped with `registration_time_ms` (the
    /// facade supplies this from its injected `Clock`; the registry has no
    /// clock of its own). Returns `false` (not an error) if `public_hash`
    /// is already registered; the existing registration is left untouched.
    pub fn add_user(
        &self,
        txn: &Txn,
        public_key: &[u8],
        public_hash: &[u8],
        registration_time_ms: u64,
    ) -> Result<bool> {
        if self.have_user(txn, public_hash)? {
            return Ok(false);
        }
        txn.put(&users_key(), public_hash)?;
        txn.put(&reg_date_key(public_hash), &registration_time_ms.to_be_bytes())?;
        txn.put(&public_key_key(public_hash), public_key)?;
        Ok(true)
    }

    pub fn have_user(&self, txn: &Txn, public_hash: &[u8]) -> Result<bool> {
        Ok(txn.get(&reg_date_key(public_hash))?.is_some())
    }

    pub fn get_user(&self, txn: &Txn, public_hash: &[u8]) -> Result<Option<User>> {
        let date_bytes = match txn.get(&reg_date_key(public_hash))? {
            Some(b) => b,
            None => return Ok(None),
        };
        let public_key = match txn.get(&public_key_key(public_hash))? {
            Some(b) => b,
            None => return Ok(None),
        };
        let registration_time = be_bytes_to_u64(&date_bytes);
        Ok(Some(User::new(
            public_hash.to_vec(),
            public_key,
            registration_time,
        )))
    }

    pub fn get_public_key(&self, txn: &Txn, public_hash: &[u8]) -> Result<Option<Vec<u8>>> {
        txn.get(&public_key_key(public_hash))
    }

    /// Every registered public hash. Not part of the external facade
    /// contract; used internally to drive `clear_old_nonces` across all
    /// known users without a separate global nonce index.
    pub fn list_user_hashes(&self, txn: &Txn) -> Result<Vec<Vec<u8>>> {
        Ok(txn.cursor(&users_key())?.collect())
    }

    /// Deletes the reg-date row, public-key row, and the `users` duplicate
    /// entry for `public_hash`. Returns `false` only when the `users`
    /// duplicate was not found -- a missing reg-date/public-key row is
    /// treated as nothing-to-delete. Does not cascade into record or nonce
    /// data; that is the facade's job (see `nigori_db::Database::delete_user`).
    pub fn delete_user_rows(&self, txn: &Txn, public_hash: &[u8]) -> Result<bool> {
        txn.delete(&reg_date_key(public_hash))?;
        txn.delete(&public_key_key(public_hash))?;
        txn.remove_duplicate(&users_key(), public_hash)
    }
}

fn be_bytes_to_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[8 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
    u64::from_be_bytes(buf)
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

    #[test]
    fn add_get_have_user_roundtrip() {
        let (_dir, store) = open_tmp();
        let reg = UserRegistry::new();
        let txn = store.begin_txn().unwrap();
        assert!(reg
            .add_user(&txn, b"pubkey", b"hash", 42)
            .unwrap());
        assert!(reg.have_user(&txn, b"hash").unwrap());
        let user = reg.get_user(&txn, b"hash").unwrap().unwrap();
        assert_eq!(user.public_key, b"pubkey");
        assert_eq!(user.registration_time, 42);
        assert_eq!(
            reg.get_public_key(&txn, b"hash").unwrap(),
            Some(b"pubkey".to_vec())
        );
        txn.commit().unwrap();
    }

    #[test]
    fn duplicate_registration_is_rejected_and_original_preserved() {
        let (_dir, store) = open_tmp();
        let reg = UserRegistry::new();
        let txn = store.begin_txn().unwrap();
        assert!(reg.add_user(&txn, b"pk1", b"hash", 1).unwrap());
        assert!(!reg.add_user(&txn, b"pk2", b"hash", 2).unwrap());
        let user = reg.get_user(&txn, b"hash").unwrap().unwrap();
        assert_eq!(user.public_key, b"pk1");
        assert_eq!(user.registration_time, 1);
        txn.commit().unwrap();
    }

    #[test]
    fn missing_user_is_well_typed_absence() {
        let (_dir, store) = open_tmp();
        let reg = UserRegistry::new();
        let txn = store.begin_txn().unwrap();
        assert!(reg.get_user(&txn, b"nope").unwrap().is_none());
        assert!(!reg.have_user(&txn, b"nope").unwrap());
        txn.commit().unwrap();
    }

    #[test]
    fn delete_user_rows_removes_everything_and_reports_roster_presence() {
        let (_dir, store) = open_tmp();
        let reg = UserRegistry::new();
        let txn = store.begin_txn().unwrap();
        reg.add_user(&txn, b"pk", b"hash", 7).unwrap();
        assert!(reg.delete_user_rows(&txn, b"hash").unwrap());
        assert!(!reg.have_user(&txn, b"hash").unwrap());
        assert!(reg.get_public_key(&txn, b"hash").unwrap().is_none());
        assert!(reg.list_user_hashes(&txn).unwrap().is_empty());
        // Second delete finds no roster duplicate left.
        assert!(!reg.delete_user_rows(&txn, b"hash").unwrap());
        txn.commit().unwrap();
    }

    #[test]
    fn list_user_hashes_reflects_the_roster() {
        let (_dir, store) = open_tmp();
        let reg = UserRegistry::new();
        let txn = store.begin_txn().unwrap();
        reg.add_user(&txn, b"pk1", b"a", 1).unwrap();
        reg.add_user(&txn, b"pk2", b"b", 2).unwrap();
        let mut hashes = reg.list_user_hashes(&txn).unwrap();
        hashes.sort();
        assert_eq!(hashes, vec![b"a".to_vec(), b"b".to_vec()]);
        txn.commit().unwrap();
    }
}
