//! Per-run context threaded through fetch and load calls.
//!
//! Replaces process-global configuration: the API token and every pacing
//! knob travel together as one explicit value.

use std::time::Duration;

/// Throttle before each page request; also the base retry delay.
const DEFAULT_THROTTLE: Duration = Duration::from_secs(1);
/// Retry each page request up to this many attempts.
const DEFAULT_RETRIES: u32 = 10;
/// Multiply the delay by this factor after every failed attempt.
const DEFAULT_BACKOFF: u32 = 2;
/// Lower than the API default of 100 to prevent upstream timeouts.
const DEFAULT_PAGE_SIZE: u32 = 64;
/// The Notion API is not fast; allow generous per-request time.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Credentials and pacing parameters for one import run.
///
/// With the defaults, the worst-case cumulative delay for a single page is
/// about 1023 seconds, which lets the upstream recover from most temporary
/// issues before the run aborts.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// API bearer token.
    pub token: String,
    /// Minimum delay enforced before every page request.
    pub throttle: Duration,
    /// Maximum attempts per page request.
    pub retries: u32,
    /// Exponential backoff factor between attempts.
    pub backoff: u32,
    /// Records requested per page.
    pub page_size: u32,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl RunContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            throttle: DEFAULT_THROTTLE,
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
