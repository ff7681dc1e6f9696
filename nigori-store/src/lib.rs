//! An embedded, transactional, ordered-duplicates byte-key/byte-value store.
//!
//! Every logical key in the system -- whether it conceptually holds a single
//! value (a registration date) or a duplicate set (a user's index roster) --
//! lives in the same physical table, a `redb` multimap. Callers that only
//! ever insert one duplicate under a key get singleton semantics for free:
//! `get` returns the lexicographically-first (and, by construction, only)
//! duplicate.

use std::collections::VecDeque;
use std::path::Path;

use redb::{Database, MultimapTableDefinition, ReadableMultimapTable};

use nigori_base::Result;

const DATA_TABLE: MultimapTableDefinition<'static, &'static [u8], &'static [u8]> =
    MultimapTableDefinition::new("data");

pub struct Store {
    db: Database,
}

impl Store {
    /// Opens (creating if necessary) the single named byte-store inside
    /// `data_dir`. The caller is responsible for checking that `data_dir`
    /// exists and is a directory before calling this -- see
    /// `nigori_db::Database::open`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join("nigori.redb");
        let db = Database::create(db_path)?;
        // Pre-create the table so later opens never race its creation.
        let txn = db.begin_write()?;
        {
            txn.open_multimap_table(DATA_TABLE)?;
        }
        txn.commit()?;
        Ok(Store { db })
    }

    /// A cheap liveness probe used by the facade's single-instance-per-directory
    /// sync step: if this fails, the environment is considered dead.
    pub fn ping(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.open_multimap_table(DATA_TABLE)?;
        txn.commit()?;
        Ok(())
    }

    pub fn begin_txn(&self) -> Result<Txn> {
        Ok(Txn {
            inner: self.db.begin_write()?,
        })
    }
}

/// A read-write serializable transaction. All mutation in the system funnels
/// through one of these; it is held open for the duration of exactly one
/// public operation and then committed or aborted.
pub struct Txn {
    inner: redb::WriteTransaction,
}

impl Txn {
    /// Adds `value` to `key`'s duplicate set. Re-inserting an existing
    /// duplicate is a no-op success (`Ok(false)`), never a conflict.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let mut table = self.inner.open_multimap_table(DATA_TABLE)?;
        Ok(table.insert(key, value)?)
    }

    /// The lexicographically-first duplicate under `key`, if any.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.inner.open_multimap_table(DATA_TABLE)?;
        let mut iter = table.get(key)?;
        match iter.next() {
            Some(guard) => Ok(Some(guard?.value().to_vec())),
            None => Ok(None),
        }
    }

    /// Probes for one specific `(key, value)` duplicate.
    pub fn get_exact(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let table = self.inner.open_multimap_table(DATA_TABLE)?;
        for item in table.get(key)? {
            if item?.value() == value {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Removes `key` and all of its duplicates, returning the count removed.
    pub fn delete(&self, key: &[u8]) -> Result<usize> {
        let mut table = self.inner.open_multimap_table(DATA_TABLE)?;
        let removed = table.remove_all(key)?;
        let mut count = 0usize;
        for item in removed {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Removes exactly one `(key, value)` duplicate -- the "search_both"
    /// primitive used by cascade deletion and nonce purge.
    pub fn remove_duplicate(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let mut table = self.inner.open_multimap_table(DATA_TABLE)?;
        Ok(table.remove(key, value)?)
    }

    /// Walks every duplicate under `key`. The underlying `redb` cursor and
    /// table handle are drained and dropped before this call returns, which
    /// is what guarantees they are closed before the caller can commit or
    /// abort the owning transaction.
    pub fn cursor(&self, key: &[u8]) -> Result<DupCursor> {
        let table = self.inner.open_multimap_table(DATA_TABLE)?;
        let mut items = VecDeque::new();
        for item in table.get(key)? {
            items.push_back(item?.value().to_vec());
        }
        Ok(DupCursor { items })
    }

    pub fn commit(self) -> Result<()> {
        Ok(self.inner.commit()?)
    }

    /// `redb` rolls back any write transaction dropped without a commit, so
    /// this is just an explicit, readable name for that.
    pub fn abort(self) -> Result<()> {
        drop(self.inner);
        Ok(())
    }
}

/// An eagerly-materialized walk over one key's duplicate set, matching the
/// `first_match` / `next_dup` shape of the abstract byte-store contract.
#[derive(Debug, Default)]
pub struct DupCursor {
    items: VecDeque<Vec<u8>>,
}

impl DupCursor {
    pub fn first_match(&self) -> Option<&[u8]> {
        self.items.front().map(|v| v.as_slice())
    }

    pub fn next_dup(&mut self) -> Option<Vec<u8>> {
        self.items.pop_front()
    }
}

impl Iterator for DupCursor {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_dup()
    }
}
