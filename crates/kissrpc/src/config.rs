//! Connection settings shared by clients and servers.

use std::time::Duration;

use crate::error::Error;
use crate::error::Result;

/// Default upper bound on a single frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

pub const ENV_MAX_FRAME_LEN: &str = "KISSRPC_MAX_FRAME_LEN";
pub const ENV_CALL_TIMEOUT_MS: &str = "KISSRPC_CALL_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Frames announcing a longer body are rejected before anything is allocated.
    pub max_frame_len: u32,
    /// Deadline for a synchronous call. `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_frame_len: DEFAULT_MAX_FRAME_LEN, call_timeout: None }
    }
}

impl Config {
    pub fn with_max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Defaults overridden by `KISSRPC_MAX_FRAME_LEN` and `KISSRPC_CALL_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(len) = lookup(ENV_MAX_FRAME_LEN) {
            config.max_frame_len = len
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid {}: {:?}", ENV_MAX_FRAME_LEN, len)))?;
        }
        if let Some(ms) = lookup(ENV_CALL_TIMEOUT_MS) {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid {}: {:?}", ENV_CALL_TIMEOUT_MS, ms)))?;
            // zero disables the deadline
            config.call_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }
}
