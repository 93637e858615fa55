//! # Runtime configuration
//!
//! Settings read from the environment at startup; CLI flags override them.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `RSRV_STACK_SIZE` | `0x8000` | Coroutine stack size, hex (`0x..`) or decimal |
//! | `RSRV_ADDR` | `0.0.0.0:3000` | Listen address |
//! | `RSRV_SPEC` | `doc/openapi.yaml` | API schema file |
//! | `RSRV_VALIDATE_RESPONSES` | `true` | Check handler responses against the schema |
//!
//! Unparsable values fall back to the default.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_STACK_SIZE: usize = 0x8000;
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SPEC_PATH: &str = "doc/openapi.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    pub addr: String,
    pub spec_path: PathBuf,
    pub validate_responses: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            addr: DEFAULT_ADDR.to_string(),
            spec_path: PathBuf::from(DEFAULT_SPEC_PATH),
            validate_responses: true,
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            stack_size: lookup("RSRV_STACK_SIZE")
                .and_then(|v| parse_size(&v))
                .filter(|&s| s > 0)
                .unwrap_or(defaults.stack_size),
            addr: lookup("RSRV_ADDR")
                .filter(|a| !a.trim().is_empty())
                .unwrap_or(defaults.addr),
            spec_path: lookup("RSRV_SPEC")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.spec_path),
            validate_responses: lookup("RSRV_VALIDATE_RESPONSES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.validate_responses),
        }
    }

    /// Apply the stack size to the `may` runtime; call before spawning coroutines.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}
