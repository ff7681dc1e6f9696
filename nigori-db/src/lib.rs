//! The database facade: the single entry point that composes the user
//! registry, record store, and nonce ledger behind one contract, and owns
//! transaction lifecycle for every operation it exposes.
//!
//! Each public method opens exactly one `Txn`, runs the component calls that
//! implement it, and commits on success or aborts on the first storage
//! failure -- never a partial write escapes a facade method. See the
//! `StorageFailure` handling in `run_txn`/`with_default`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use nigori_base::{Clock, Result, SystemClock};
use nigori_keys::nonces_key;
use nigori_nonce::NonceLedger;
use nigori_record::RecordStore;
use nigori_store::{Store, Txn};
use nigori_types::{Nonce, RevValue, User};
use nigori_user::UserRegistry;

/// Tunables for a `Database`. Currently just the nonce ledger's retention
/// window; everything else (which data directory, which clock) is a
/// constructor argument rather than config, since they vary per call site
/// rather than per deployment.
#[derive(Debug, Clone)]
pub struct Config {
    pub nonce_ttl: Duration,
}

impl Config {
    pub fn with_nonce_ttl(nonce_ttl: Duration) -> Self {
        Config { nonce_ttl }
    }

    fn nonce_ttl_ms(&self) -> u64 {
        self.nonce_ttl.as_millis() as u64
    }
}

impl Default for Config {
    fn default() -> Self {
        // Ten minutes comfortably outlives any reasonable clock-skew and
        // request-retry window without letting the ledger grow unbounded
        // between sweeps.
        Config {
            nonce_ttl: Duration::from_secs(600),
        }
    }
}

type FacadeMap = Mutex<HashMap<PathBuf, Weak<Database>>>;

fn live_facades() -> &'static FacadeMap {
    static MAP: OnceLock<FacadeMap> = OnceLock::new();
    MAP.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The storage engine's public contract: one instance per data directory,
/// internally synchronized, atomic across every multi-step operation.
pub struct Database {
    store: Store,
    clock: Box<dyn Clock>,
    nonce_ttl_ms: u64,
    registry: UserRegistry,
    records: RecordStore,
    nonces: NonceLedger,
}

impl Database {
    /// Opens (or returns the already-live handle for) the environment at
    /// `data_directory`, using the system wall clock and default config.
    pub fn open(data_directory: &Path) -> Result<Arc<Database>> {
        Self::open_with(data_directory, Config::default(), Box::new(SystemClock))
    }

    pub fn open_with_config(data_directory: &Path, config: Config) -> Result<Arc<Database>> {
        Self::open_with(data_directory, config, Box::new(SystemClock))
    }

    /// Full constructor, exposed so tests can inject a `FixedClock`. If a
    /// facade for this (canonicalized) directory is already alive and its
    /// store still answers `ping`, that instance is returned and `config`/
    /// `clock` are ignored -- single-instance-per-directory means the first
    /// opener wins until every handle is dropped.
    pub fn open_with(
        data_directory: &Path,
        config: Config,
        clock: Box<dyn Clock>,
    ) -> Result<Arc<Database>> {
        if !data_directory.is_dir() {
            return Err(nigori_base::err(
                "data directory does not exist or is not a directory",
            ));
        }
        let canonical = data_directory.canonicalize()?;

        let mut facades = live_facades().lock().unwrap();
        if let Some(existing) = facades.get(&canonical).and_then(Weak::upgrade) {
            if existing.store.ping().is_ok() {
                return Ok(existing);
            }
            facades.remove(&canonical);
        }

        let store = Store::open(data_directory)?;
        let db = Arc::new(Database {
            store,
            clock,
            nonce_ttl_ms: config.nonce_ttl_ms(),
            registry: UserRegistry::new(),
            records: RecordStore::new(),
            nonces: NonceLedger::new(),
        });
        facades.insert(canonical, Arc::downgrade(&db));
        Ok(db)
    }

    // -- users -----------------------------------------------------------

    pub fn add_user(&self, public_key: &[u8], public_hash: &[u8]) -> bool {
        let now = self.clock.now_unix_ms();
        self.with_default("add_user", public_hash, false, |txn| {
            self.registry.add_user(txn, public_key, public_hash, now)
        })
    }

    pub fn have_user(&self, public_hash: &[u8]) -> bool {
        self.with_default("have_user", public_hash, false, |txn| {
            self.registry.have_user(txn, public_hash)
        })
    }

    pub fn get_user(&self, public_hash: &[u8]) -> Option<User> {
        self.with_default("get_user", public_hash, None, |txn| {
            self.registry.get_user(txn, public_hash)
        })
    }

    pub fn get_public_key(&self, public_hash: &[u8]) -> Option<Vec<u8>> {
        self.with_default("get_public_key", public_hash, None, |txn| {
            self.registry.get_public_key(txn, public_hash)
        })
    }

    /// Atomically removes the user's registration, every record they wrote,
    /// and their outstanding nonces. Returns `false` if the user was not
    /// registered to begin with.
    pub fn delete_user(&self, user: &User) -> bool {
        self.with_default("delete_user", &user.public_hash, false, |txn| {
            let removed = self.registry.delete_user_rows(txn, &user.public_hash)?;
            self.records.delete_all_for_user(txn, &user.public_hash)?;
            txn.delete(&nonces_key(&user.public_key))?;
            Ok(removed)
        })
    }

    // -- records -----------------------------------------------------------

    pub fn put_record(&self, user: &User, index: &[u8], revision: &[u8], value: &[u8]) -> bool {
        self.with_default("put_record", &user.public_hash, false, |txn| {
            self.records.put(txn, &user.public_hash, index, revision, value)
        })
    }

    pub fn get_record(&self, user: &User, index: &[u8]) -> Result<Option<Vec<RevValue>>> {
        self.run_txn("get_record", &user.public_hash, |txn| {
            self.records.get_record(txn, &user.public_hash, index)
        })
    }

    pub fn get_revision(&self, user: &User, index: &[u8], revision: &[u8]) -> Option<RevValue> {
        self.with_default("get_revision", &user.public_hash, None, |txn| {
            self.records.get_revision(txn, &user.public_hash, index, revision)
        })
    }

    pub fn get_indices(&self, user: &User) -> Result<Vec<Vec<u8>>> {
        self.run_txn("get_indices", &user.public_hash, |txn| {
            self.records.get_indices(txn, &user.public_hash)
        })
    }

    pub fn get_revisions(&self, user: &User, index: &[u8]) -> Result<Option<Vec<Vec<u8>>>> {
        self.run_txn("get_revisions", &user.public_hash, |txn| {
            self.records.get_revisions(txn, &user.public_hash, index)
        })
    }

    pub fn delete_record(&self, user: &User, index: &[u8]) -> bool {
        self.with_default("delete_record", &user.public_hash, false, |txn| {
            self.records.delete_record(txn, &user.public_hash, index)
        })
    }

    // -- nonces -----------------------------------------------------------

    pub fn check_and_add_nonce(&self, public_key: &[u8], nonce: &Nonce) -> bool {
        self.with_default("check_and_add_nonce", public_key, false, |txn| {
            self.nonces.check_and_add(txn, public_key, nonce.token())
        })
    }

    /// Sweeps every registered user's nonce set for entries older than the
    /// configured TTL. There is no internal scheduler: callers (or whatever
    /// drives the process's maintenance cadence) decide when to invoke this.
    pub fn clear_old_nonces(&self) {
        let now = self.clock.now_unix_ms();
        let ttl = self.nonce_ttl_ms;
        let swept = self.run_txn("clear_old_nonces", &[], |txn| {
            let mut total = 0usize;
            for hash in self.registry.list_user_hashes(txn)? {
                if let Some(public_key) = self.registry.get_public_key(txn, &hash)? {
                    total += self.nonces.purge_expired(txn, &public_key, now, ttl)?;
                }
            }
            Ok(total)
        });
        match swept {
            Ok(count) => tracing::debug!(target: "nigori", count, "cleared expired nonces"),
            Err(e) => tracing::error!(target: "nigori", error = ?e, "nonce sweep failed"),
        }
    }

    // -- transaction plumbing ----------------------------------------------

    fn run_txn<T>(
        &self,
        op: &'static str,
        ctx_hash: &[u8],
        f: impl FnOnce(&Txn) -> Result<T>,
    ) -> Result<T> {
        tracing::debug!(target: "nigori", operation = op, hash = %hex_prefix(ctx_hash), "begin");
        let txn = self.store.begin_txn()?;
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::error!(target: "nigori", operation = op, error = ?abort_err, "txn abort failed");
                }
                Err(e)
            }
        }
    }

    /// Same as `run_txn`, but storage failures are logged and collapsed
    /// into `default` rather than propagated -- the shape most of the
    /// facade's boolean/single-value operations use.
    fn with_default<T>(
        &self,
        op: &'static str,
        ctx_hash: &[u8],
        default: T,
        f: impl FnOnce(&Txn) -> Result<T>,
    ) -> T {
        match self.run_txn(op, ctx_hash, f) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(target: "nigori", operation = op, error = ?e, "storage operation failed");
                default
            }
        }
    }
}

/// Up to the first 4 bytes of `bytes`, hex-encoded, for log lines. Never
/// enough to reconstruct a full hash or key, per the no-payload-in-logs rule.
fn hex_prefix(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let n = bytes.len().min(4);
    let mut out = String::with_capacity(n * 2);
    for b in &bytes[..n] {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
