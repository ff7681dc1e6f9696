use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, injected so the nonce ledger's TTL logic can
/// be driven deterministically in tests instead of racing the wall clock.
pub trait Clock: Send + Sync {
    fn now_unix_ms(&self) -> u64;
}

/// The default clock: wall-clock time since the Unix epoch, in milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that can be wound forward by hand. Exported (not test-gated) so
/// that downstream crates can drive nonce-TTL tests deterministically.
pub struct FixedClock(pub std::sync::atomic::AtomicU64);

impl FixedClock {
    pub fn new(now_ms: u64) -> Self {
        FixedClock(std::sync::atomic::AtomicU64::new(now_ms))
    }

    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix_ms(&self) -> u64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn system_clock_is_roughly_now() {
        let ms = SystemClock.now_unix_ms();
        assert!(ms > 1_700_000_000_000);
    }

    #[test]
    fn fixed_clock_advances_deterministically() {
        let clock = FixedClock::new(1_000);
        assert_eq!(clock.now_unix_ms(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now_unix_ms(), 1_500);
    }
}
