//! Reactivity policy configuration.
//!
//! A thread-local default applies to every effect that has no root-level
//! override. Roots created with [`MountOptions::config`](crate::pipeline::MountOptions)
//! carry their own copy, resolved through the ownership chain when a policy
//! decision is needed.
//!
//! ```ignore
//! use pounce::config::{with_config, ReactivityConfig, Policy};
//!
//! with_config(ReactivityConfig::strict().with_max_reaction_depth(16), || {
//!     // effects created and flushed here use the strict policy
//! });
//! ```

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do when a policy check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Policy {
    /// Skip the check entirely.
    Off,
    /// Log through `tracing::warn!` and carry on.
    Warn,
    /// Raise an error to the nearest error handler.
    #[default]
    Error,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Policy::Off => "off",
            Policy::Warn => "warn",
            Policy::Error => "error",
        })
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "false" | "0" => Ok(Policy::Off),
            "warn" | "warning" => Ok(Policy::Warn),
            "error" | "throw" | "true" | "1" => Ok(Policy::Error),
            other => Err(format!("unknown policy `{other}`")),
        }
    }
}

/// Policies for the rebuild fence and the reaction-depth guard.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReactivityConfig {
    /// Rebuild fence policy (`checkReactivity`).
    pub check_reactivity: Policy,
    /// How many times one effect may run inside a single flush.
    pub max_reaction_depth: usize,
    /// What happens when `max_reaction_depth` is exceeded.
    pub on_max_reaction_depth: Policy,
}

impl ReactivityConfig {
    pub const DEFAULT_MAX_REACTION_DEPTH: usize = 100;

    /// Every violation is an error. Recommended for tests.
    pub fn strict() -> Self {
        Self {
            check_reactivity: Policy::Error,
            max_reaction_depth: Self::DEFAULT_MAX_REACTION_DEPTH,
            on_max_reaction_depth: Policy::Error,
        }
    }

    /// Violations are logged, never raised.
    pub fn lenient() -> Self {
        Self {
            check_reactivity: Policy::Warn,
            max_reaction_depth: Self::DEFAULT_MAX_REACTION_DEPTH,
            on_max_reaction_depth: Policy::Warn,
        }
    }

    pub fn with_check_reactivity(mut self, policy: Policy) -> Self {
        self.check_reactivity = policy;
        self
    }

    pub fn with_max_reaction_depth(mut self, depth: usize) -> Self {
        self.max_reaction_depth = depth.max(1);
        self
    }

    pub fn with_on_max_reaction_depth(mut self, policy: Policy) -> Self {
        self.on_max_reaction_depth = policy;
        self
    }

    /// Build a config from `POUNCE_*` environment variables on top of the
    /// build-profile default. Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup("POUNCE_CHECK_REACTIVITY") {
            match raw.parse() {
                Ok(policy) => config.check_reactivity = policy,
                Err(err) => tracing::warn!(%err, "ignoring POUNCE_CHECK_REACTIVITY"),
            }
        }
        if let Some(raw) = lookup("POUNCE_MAX_REACTION_DEPTH") {
            match raw.trim().parse::<usize>() {
                Ok(depth) => config.max_reaction_depth = depth.max(1),
                Err(err) => tracing::warn!(%err, "ignoring POUNCE_MAX_REACTION_DEPTH"),
            }
        }
        if let Some(raw) = lookup("POUNCE_ON_MAX_REACTION_DEPTH") {
            match raw.parse() {
                Ok(policy) => config.on_max_reaction_depth = policy,
                Err(err) => tracing::warn!(%err, "ignoring POUNCE_ON_MAX_REACTION_DEPTH"),
            }
        }
        config
    }
}

impl Default for ReactivityConfig {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::strict()
        } else {
            Self::lenient()
        }
    }
}

// =============================================================================
// Process-wide default
// =============================================================================

thread_local! {
    static CONFIG: RefCell<ReactivityConfig> = RefCell::new(ReactivityConfig::default());
}

/// The current default config.
pub fn config() -> ReactivityConfig {
    CONFIG.with(|c| c.borrow().clone())
}

/// Replace the default config, returning the previous one.
pub fn set_config(config: ReactivityConfig) -> ReactivityConfig {
    CONFIG.with(|c| c.replace(config))
}

/// Run `f` with `config` as the default, restoring the previous default
/// afterwards (also when `f` panics).
pub fn with_config<R>(config: ReactivityConfig, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<ReactivityConfig>);

    impl Drop for Restore {
        fn drop(&mut self) {
            if let Some(previous) = self.0.take() {
                set_config(previous);
            }
        }
    }

    let _restore = Restore(Some(set_config(config)));
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_policy_parse() {
        assert_eq!("off".parse::<Policy>(), Ok(Policy::Off));
        assert_eq!(" Warn ".parse::<Policy>(), Ok(Policy::Warn));
        assert_eq!("throw".parse::<Policy>(), Ok(Policy::Error));
        assert!("sometimes".parse::<Policy>().is_err());
        assert_eq!(Policy::Warn.to_string(), "warn");
    }

    #[test]
    fn test_with_config_restores() {
        let before = config();
        let inner = with_config(ReactivityConfig::lenient().with_max_reaction_depth(7), || {
            config()
        });
        assert_eq!(inner.max_reaction_depth, 7);
        assert_eq!(inner.check_reactivity, Policy::Warn);
        assert_eq!(config(), before);
    }

    #[test]
    fn test_with_config_restores_after_panic() {
        let before = config();
        let result = std::panic::catch_unwind(|| {
            with_config(ReactivityConfig::lenient(), || -> i32 { panic!("boom") })
        });
        assert!(result.is_err());
        assert_eq!(config(), before);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("POUNCE_CHECK_REACTIVITY", "off"),
            ("POUNCE_MAX_REACTION_DEPTH", "12"),
            ("POUNCE_ON_MAX_REACTION_DEPTH", "nonsense"),
        ]
        .into_iter()
        .collect();

        let config = ReactivityConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.check_reactivity, Policy::Off);
        assert_eq!(config.max_reaction_depth, 12);
        // Bad value keeps the default
        assert_eq!(
            config.on_max_reaction_depth,
            ReactivityConfig::default().on_max_reaction_depth
        );
    }

    #[test]
    fn test_depth_never_zero() {
        assert_eq!(ReactivityConfig::strict().with_max_reaction_depth(0).max_reaction_depth, 1);
    }
}
