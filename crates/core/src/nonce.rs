//! Request nonces for authenticated venue calls
//!
//! Venues reject a signed request whose nonce is not strictly greater than the
//! last one seen for the same API key. Nonces are millisecond wall-clock
//! values, bumped by one whenever two requests land in the same millisecond.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::timing::nanos;

/// Process-wide generator shared by every connector instance
static PROCESS_NONCES: NonceGenerator = NonceGenerator::new();

/// Round microseconds since the epoch to the nearest millisecond.
///
/// Integer form of `floor(sec * 1000 + usec * 0.001 + 0.5)`.
#[inline]
pub fn millis_from_micros(micros: u64) -> u64 {
    (micros + 500) / 1_000
}

/// Millisecond nonce candidate for the current wall-clock time
pub fn wall_clock_nonce() -> u64 {
    millis_from_micros(nanos() / 1_000)
}

/// Next nonce from the process-wide generator
pub fn next_nonce() -> u64 {
    PROCESS_NONCES.next()
}

/// Strictly increasing nonce source
#[derive(Debug)]
pub struct NonceGenerator {
    last: AtomicU64,
}

impl NonceGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next nonce derived from the wall clock
    pub fn next(&self) -> u64 {
        self.next_from(wall_clock_nonce())
    }

    /// Next nonce given a candidate value: `max(candidate, last + 1)`.
    pub fn next_from(&self, candidate: u64) -> u64 {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = candidate.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// Last nonce handed out, zero before the first call
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
