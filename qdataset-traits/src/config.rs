//! Process-wide configuration.
//!
//! The only knob is range checking on the hot value-access paths. The
//! configuration is read from the environment the first time it is needed
//! unless [`init`] installed one before that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Environment variable controlling range checking. `0`, `false` and `off`
/// disable it; anything else leaves it on.
pub const RANGE_CHECK_ENV: &str = "QDATASET_RANGE_CHECK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Check every index against its dimension length on value access.
    pub range_checking: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            range_checking: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let range_checking = match std::env::var(RANGE_CHECK_ENV) {
            Ok(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"),
            Err(_) => true,
        };
        Config { range_checking }
    }
}

struct Global {
    range_checking: AtomicBool,
}

static GLOBAL: OnceLock<Global> = OnceLock::new();

fn global() -> &'static Global {
    GLOBAL.get_or_init(|| {
        let config = Config::from_env();
        tracing::debug!(range_checking = config.range_checking, "qdataset config from env");
        Global::from(config)
    })
}

impl From<Config> for Global {
    fn from(config: Config) -> Self {
        Global {
            range_checking: AtomicBool::new(config.range_checking),
        }
    }
}

/// Install `config` as the process configuration. Returns `false` if the
/// configuration was already initialised, in which case nothing changes.
pub fn init(config: Config) -> bool {
    GLOBAL.set(Global::from(config)).is_ok()
}

/// The configuration currently in effect.
pub fn current() -> Config {
    Config {
        range_checking: range_checking(),
    }
}

/// Whether value accessors check indices against lengths.
#[inline]
pub fn range_checking() -> bool {
    global().range_checking.load(Ordering::Relaxed)
}

/// Flip range checking at runtime. Intended for hot loops whose indices
/// are known to be valid.
pub fn set_range_checking(enabled: bool) {
    global().range_checking.store(enabled, Ordering::Relaxed);
}
