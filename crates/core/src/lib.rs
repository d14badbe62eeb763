//! # Tradelink Core
//!
//! Runtime-agnostic pieces shared by every venue connector:
//!
//! 1. **Wall-clock timing** - timestamps and per-request latency reports
//! 2. **Request nonces** - strictly increasing millisecond values per process
//! 3. **Unified logging** - one `tracing` subscriber, stdout or a log file

pub mod timing;
pub mod nonce;
pub mod logging;

// Re-export commonly used items
pub use timing::{nanos, PerfTimer, Timestamp};
pub use nonce::{next_nonce, NonceGenerator};
pub use logging::{init_logging, init_logging_with, LogConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::timing::{nanos, PerfTimer, Timestamp};
    pub use crate::nonce::{millis_from_micros, next_nonce, wall_clock_nonce, NonceGenerator};
    pub use crate::logging::{init_logging, init_logging_with, LogConfig};

    // Common external types
    pub use serde::{Deserialize, Serialize};
    pub use chrono::{DateTime, Utc};
}
