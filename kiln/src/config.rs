//! Compile session configuration

use kiln_plugin::clean_input_key;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Categories compiled first to last when no order is configured
pub const DEFAULT_COMPILE_ORDER: [&str; 6] = ["engine", "cv", "volume", "state", "network", "movescheme"];

/// What to do with input categories missing from the compile order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryPolicy {
    /// Compile them after every ordered category, in input order
    #[default]
    Last,
    /// Fail with `UNKNOWN_CATEGORY`
    Reject,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid compile configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Compile order lists '{0}' twice")]
    DuplicateCategory(String),
}

/// Compile session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub compile_order: Vec<String>,
    pub unknown_categories: UnknownCategoryPolicy,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            compile_order: DEFAULT_COMPILE_ORDER.iter().map(|c| c.to_string()).collect(),
            unknown_categories: UnknownCategoryPolicy::default(),
        }
    }
}

impl CompileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compile_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compile_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unknown_categories(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_categories = policy;
        self
    }

    /// Parse from JSON; absent fields take their defaults
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Compile order entries must be distinct once cleaned the way input
    /// keys are
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for category in &self.compile_order {
            if !seen.insert(clean_input_key(category)) {
                return Err(ConfigError::DuplicateCategory(category.clone()));
            }
        }
        Ok(())
    }
}
