//! Top-level re-export crate: a single `use nigori::...` surface over the
//! subsystem crates that actually do the work. Thin by design -- application
//! code and tests should be able to depend on just this crate.

pub use nigori_auth::{AlwaysValid, SignatureVerifier};
pub use nigori_base::{err, Clock, Error, FixedClock, Result, SystemClock};
pub use nigori_db::{Config, Database};
pub use nigori_types::{Nonce, RevValue, User, NONCE_MIN_LEN};
