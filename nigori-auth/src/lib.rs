//! Names the boundary between this core and the signature-verification
//! collaborator it consumes but does not own.
//!
//! DSA signature verification and request-nonce derivation are explicitly
//! out of scope for the storage core (see the top-level purpose and scope
//! notes): a request arrives already verified by whatever wire layer sits
//! in front of the engine. This crate exists only to give that collaborator
//! a name and a type, the same way the source project keeps placeholder
//! subsystem crates for things it composes with but doesn't implement.

/// Verifies that `signature` over `message` was produced by the holder of
/// `public_key`. The engine never calls this itself -- it is invoked by the
/// (out-of-scope) wire layer before a request reaches any facade method.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// A verifier for tests and local tooling that accepts everything. Never
/// wire this into anything that isn't itself a test.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysValid;

impl SignatureVerifier for AlwaysValid {
    fn verify(&self, _public_key: &[u8], _message: &[u8], _signature: &[u8]) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn always_valid_accepts_anything() {
        assert!(AlwaysValid.verify(b"pk", b"msg", b"sig"));
    }
}
