//! Process-wide runtime switches
//!
//! Two boolean flags are read from the environment once and cached for the
//! lifetime of the process: one engages the learned routing path, the other
//! turns on per-lookup interval diagnostics. Callers that want explicit
//! control (tests, the CLI) build a [`RuntimeFlags`] value instead.

use std::env;
use std::sync::OnceLock;

/// Environment variable that engages the learned routing path
pub const LEARNED_INDEX_ENV: &str = "LEARNED_INDEX";
/// Environment variable that enables interval diagnostics
pub const LEARNED_DEBUG_ENV: &str = "LEARNED_DEBUG";

/// Returns true for "1", "true", "on" or "yes", ignoring case and
/// surrounding whitespace.
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    if value == "1" {
        return true;
    }
    ["true", "on", "yes"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}

/// Returns true iff environment variable `name` is set to a truthy value.
///
/// Unset variables and values that are not valid unicode are falsy.
pub fn env_on(name: &str) -> bool {
    env::var(name).map(|v| is_truthy(&v)).unwrap_or(false)
}

/// Cached value of [`LEARNED_INDEX_ENV`], evaluated on first call
pub fn learned_env_enabled() -> bool {
    static LEARNED: OnceLock<bool> = OnceLock::new();
    *LEARNED.get_or_init(|| env_on(LEARNED_INDEX_ENV))
}

/// Cached value of [`LEARNED_DEBUG_ENV`], evaluated on first call
pub fn learned_debug_enabled() -> bool {
    static DEBUG: OnceLock<bool> = OnceLock::new();
    *DEBUG.get_or_init(|| env_on(LEARNED_DEBUG_ENV))
}

/// Snapshot of the runtime switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct RuntimeFlags {
    /// Engage the learned router on the read path
    pub learned: bool,
    /// Emit interval diagnostics for every routed lookup
    pub debug: bool,
}

impl RuntimeFlags {
    /// Flags from the process-wide cache
    pub fn cached() -> Self {
        Self {
            learned: learned_env_enabled(),
            debug: learned_debug_enabled(),
        }
    }

    /// Apply command line overrides on top of these flags.
    ///
    /// An override can only switch a flag on; absent overrides keep the
    /// environment's value.
    pub fn with_overrides(self, learned: bool, debug: bool) -> Self {
        Self {
            learned: self.learned || learned,
            debug: self.debug || debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_values() {
        for v in ["1", "true", "TRUE", "True", "on", "ON", "yes", "Yes", "  yes \n"] {
            assert!(is_truthy(v), "{:?} should be truthy", v);
        }
    }

    #[test]
    fn test_falsy_values() {
        for v in ["", " ", "0", "false", "off", "no", "y", "11", "truee", "enable"] {
            assert!(!is_truthy(v), "{:?} should be falsy", v);
        }
    }

    #[test]
    fn test_env_on_reads_variable() {
        // Unique names so parallel tests never observe each other's writes
        unsafe {
            env::set_var("LEARNED_ROUTER_TEST_FLAG_ON", "Yes");
            env::set_var("LEARNED_ROUTER_TEST_FLAG_OFF", "nope");
        }
        assert!(env_on("LEARNED_ROUTER_TEST_FLAG_ON"));
        assert!(!env_on("LEARNED_ROUTER_TEST_FLAG_OFF"));
        assert!(!env_on("LEARNED_ROUTER_TEST_FLAG_UNSET"));
    }

    #[test]
    fn test_cached_flags_are_stable() {
        let first = RuntimeFlags::cached();
        let second = RuntimeFlags::cached();
        assert_eq!(first, second);
    }

    #[test]
    fn test_overrides_only_enable() {
        let flags = RuntimeFlags { learned: false, debug: true };
        let merged = flags.with_overrides(true, false);
        assert!(merged.learned);
        assert!(merged.debug);
    }
}
