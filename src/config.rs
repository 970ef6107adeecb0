//! Optimizer configuration options.
//!
//! The optimizer runs with sensible defaults; a configuration file is only
//! needed to change the selector budget, e.g. for rulesets generated by
//! tooling that emits unusually wide rules:
//!
//! ```toml
//! max_selectors = 64
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default upper bound on distinct selectors tracked per chain.
pub const DEFAULT_MAX_SELECTORS: usize = 32;

/// Loads a configuration file from `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> OptimizeConfig {
    let config_str = fs::read_to_string(path).expect("ERROR: File read failed");
    toml::from_str(&config_str).expect("Invalid config file")
}

/// Tunable limits for a single optimizer pass.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OptimizeConfig {
    /// Upper bound on the number of distinct selectors tracked per chain.
    ///
    /// Bounds the memory of the rule-by-selector table and the cost of the
    /// linear selector scans. A chain that reaches the bound is skipped
    /// whole: none of its rules are rewritten. Defaults to
    /// [`DEFAULT_MAX_SELECTORS`].
    #[serde(default = "default_max_selectors")]
    pub max_selectors: usize,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        OptimizeConfig {
            max_selectors: DEFAULT_MAX_SELECTORS,
        }
    }
}

fn default_max_selectors() -> usize {
    DEFAULT_MAX_SELECTORS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = OptimizeConfig::default();
        assert_eq!(config.max_selectors, DEFAULT_MAX_SELECTORS);
    }

    #[test]
    fn config_from_toml() {
        let config: OptimizeConfig = toml::from_str("max_selectors = 8").unwrap();
        assert_eq!(config.max_selectors, 8);

        let config: OptimizeConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_selectors, DEFAULT_MAX_SELECTORS);
    }
}
