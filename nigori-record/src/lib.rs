//! Per-user multi-revision record store: for each user, a set of indices,
//! each holding a set of `(revision, value)` pairs. Revisions are immutable
//! once written -- a client "updates" by inserting a new revision, never by
//! overwriting an old one. As with the user registry, every method takes an
//! already-open `Txn`; transaction lifecycle belongs to the facade.

use nigori_base::Result;
use nigori_keys::{lookup_key, stores_key, value_key};
use nigori_store::Txn;
use nigori_types::RevValue;

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordStore;

impl RecordStore {
    pub fn new() -> Self {
        RecordStore
    }

    /// Stores `value` at revision `revision` under `index`. Rejects
    /// (`Ok(false)`) if `revision` already exists under this index --
    /// revisions are immutable, never overwritten.
    pub fn put(
        &self,
        txn: &Txn,
        user_hash: &[u8],
        index: &[u8],
        revision: &[u8],
        value: &[u8],
    ) -> Result<bool> {
        let lookup = lookup_key(user_hash, index);
        if txn.get_exact(&lookup, revision)? {
            return Ok(false);
        }
        txn.put(&stores_key(user_hash), index)?;
        txn.put(&lookup, revision)?;
        txn.put(&value_key(user_hash, index, revision), value)?;
        Ok(true)
    }

    /// All revisions stored under `index`, or `None` if the index itself
    /// has never been written (or has since been fully deleted). A
    /// revision whose value row is missing -- an anomaly the byte-store
    /// should never produce, but one the reader tolerates -- is silently
    /// skipped rather than failing the whole call.
    pub fn get_record(
        &self,
        txn: &Txn,
        user_hash: &[u8],
        index: &[u8],
    ) -> Result<Option<Vec<RevValue>>> {
        if !self.has_index(txn, user_hash, index)? {
            return Ok(None);
        }
        let mut out = Vec::new();
        for revision in txn.cursor(&lookup_key(user_hash, index))? {
            if let Some(value) = txn.get(&value_key(user_hash, index, &revision))? {
                out.push(RevValue::new(revision, value));
            }
        }
        Ok(Some(out))
    }

    pub fn get_revision(
        &self,
        txn: &Txn,
        user_hash: &[u8],
        index: &[u8],
        revision: &[u8],
    ) -> Result<Option<RevValue>> {
        let value = txn.get(&value_key(user_hash, index, revision))?;
        Ok(value.map(|v| RevValue::new(revision.to_vec(), v)))
    }

    pub fn get_indices(&self, txn: &Txn, user_hash: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(txn.cursor(&stores_key(user_hash))?.collect())
    }

    /// All revision bytes under `index`, or `None` when the index is empty
    /// (absent).
    pub fn get_revisions(
        &self,
        txn: &Txn,
        user_hash: &[u8],
        index: &[u8],
    ) -> Result<Option<Vec<Vec<u8>>>> {
        let revisions: Vec<Vec<u8>> = txn.cursor(&lookup_key(user_hash, index))?.collect();
        if revisions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(revisions))
        }
    }

    /// Deletes `index` and every revision/value under it. Returns `true` if
    /// either the index duplicate or any revision was actually removed.
    pub fn delete_record(&self, txn: &Txn, user_hash: &[u8], index: &[u8]) -> Result<bool> {
        let index_removed = txn.remove_duplicate(&stores_key(user_hash), index)?;
        let revisions_removed = self.delete_revisions(txn, user_hash, index)?;
        Ok(index_removed || revisions_removed)
    }

    /// Cascade helper: deletes every index, revision, and value belonging
    /// to `user_hash`. Used only by the facade's `delete_user`, inside the
    /// same transaction as the registry's row deletions (§9: cascading
    /// user-deletion must clean dependent data atomically).
    pub fn delete_all_for_user(&self, txn: &Txn, user_hash: &[u8]) -> Result<()> {
        for index in self.get_indices(txn, user_hash)? {
            self.delete_revisions(txn, user_hash, &index)?;
        }
        txn.delete(&stores_key(user_hash))?;
        Ok(())
    }

    fn has_index(&self, txn: &Txn, user_hash: &[u8], index: &[u8]) -> Result<bool> {
        txn.get_exact(&stores_key(user_hash), index)
    }

    fn delete_revisions(&self, txn: &Txn, user_hash: &[u8], index: &[u8]) -> Result<bool> {
        let mut any = false;
        let revisions: Vec<Vec<u8>> = txn.cursor(&lookup_key(user_hash, index))?.collect();
        for revision in revisions {
            txn.delete(&value_key(user_hash, index, &revision))?;
            any = true;
        }
        txn.delete(&lookup_key(user_hash, index))?;
        Ok(any)
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

    #[test]
    fn put_then_get_revision_round_trips() {
        let (_dir, store) = open_tmp();
        let rs = RecordStore::new();
        let txn = store.begin_txn().unwrap();
        assert!(rs.put(&txn, b"u", b"idx", b"r1", b"v1").unwrap());
        let rv = rs.get_revision(&txn, b"u", b"idx", b"r1").unwrap().unwrap();
        assert_eq!(rv.revision, b"r1");
        assert_eq!(rv.value, b"v1");
        txn.commit().unwrap();
    }

    #[test]
    fn duplicate_revision_is_rejected_keeping_the_first_value() {
        let (_dir, store) = open_tmp();
        let rs = RecordStore::new();
        let txn = store.begin_txn().unwrap();
        assert!(rs.put(&txn, b"u", b"idx", b"r1", b"v1").unwrap());
        assert!(!rs.put(&txn, b"u", b"idx", b"r1", b"v2").unwrap());
        let rv = rs.get_revision(&txn, b"u", b"idx", b"r1").unwrap().unwrap();
        assert_eq!(rv.value, b"v1");
        txn.commit().unwrap();
    }

    #[test]
    fn multi_revision_fan_out() {
        let (_dir, store) = open_tmp();
        let rs = RecordStore::new();
        let txn = store.begin_txn().unwrap();
        rs.put(&txn, b"u", b"idx", b"r1", b"v1").unwrap();
        rs.put(&txn, b"u", b"idx", b"r2", b"v2").unwrap();
        rs.put(&txn, b"u", b"idx", b"r3", b"v3").unwrap();

        let record = rs.get_record(&txn, b"u", b"idx").unwrap().unwrap();
        assert_eq!(record.len(), 3);

        let mut revisions = rs.get_revisions(&txn, b"u", b"idx").unwrap().unwrap();
        revisions.sort();
        assert_eq!(revisions, vec![b"r1".to_vec(), b"r2".to_vec(), b"r3".to_vec()]);

        assert!(rs.delete_record(&txn, b"u", b"idx").unwrap());
        assert!(rs.get_record(&txn, b"u", b"idx").unwrap().is_none());
        assert!(rs.get_revisions(&txn, b"u", b"idx").unwrap().is_none());
        txn.commit().unwrap();
    }

    #[test]
    fn absent_index_is_null_not_empty() {
        let (_dir, store) = open_tmp();
        let rs = RecordStore::new();
        let txn = store.begin_txn().unwrap();
        assert!(rs.get_record(&txn, b"u", b"idx").unwrap().is_none());
        assert!(rs.get_revisions(&txn, b"u", b"idx").unwrap().is_none());
        txn.commit().unwrap();
    }

    #[test]
    fn get_indices_enumerates_all_written_indices() {
        let (_dir, store) = open_tmp();
        let rs = RecordStore::new();
        let txn = store.begin_txn().unwrap();
        rs.put(&txn, b"u", b"a", b"r", b"v").unwrap();
        rs.put(&txn, b"u", b"b", b"r", b"v").unwrap();
        let mut indices = rs.get_indices(&txn, b"u").unwrap();
        indices.sort();
        assert_eq!(indices, vec![b"a".to_vec(), b"b".to_vec()]);
        txn.commit().unwrap();
    }

    #[test]
    fn delete_all_for_user_clears_every_index() {
        let (_dir, store) = open_tmp();
        let rs = RecordStore::new();
        let txn = store.begin_txn().unwrap();
        rs.put(&txn, b"u", b"a", b"r1", b"v1").unwrap();
        rs.put(&txn, b"u", b"a", b"r2", b"v2").unwrap();
        rs.put(&txn, b"u", b"b", b"r1", b"v1").unwrap();
        rs.delete_all_for_user(&txn, b"u").unwrap();
        assert!(rs.get_indices(&txn, b"u").unwrap().is_empty());
        assert!(rs.get_record(&txn, b"u", b"a").unwrap().is_none());
        assert!(rs.get_record(&txn, b"u", b"b").unwrap().is_none());
        txn.commit().unwrap();
    }

    #[test]
    fn distinct_users_do_not_see_each_others_records() {
        let (_dir, store) = open_tmp();
        let rs = RecordStore::new();
        let txn = store.begin_txn().unwrap();
        rs.put(&txn, b"alice", b"idx", b"r1", b"va").unwrap();
        rs.put(&txn, b"bob", b"idx", b"r1", b"vb").unwrap();
        assert_eq!(
            rs.get_revision(&txn, b"alice", b"idx", b"r1").unwrap().unwrap().value,
            b"va"
        );
        assert_eq!(
            rs.get_revision(&txn, b"bob", b"idx", b"r1").unwrap().unwrap().value,
            b"vb"
        );
        txn.commit().unwrap();
    }
}
