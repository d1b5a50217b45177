//! Immutable run configuration
//!
//! Parameters are validated once, before any table is touched. Output file
//! paths are deliberately not part of this struct; see
//! [`OutputPaths`](crate::storage::OutputPaths).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default floor for time-difference denominators
pub const DEFAULT_DELTA_T_MIN: f64 = 0.0;

/// Default maximum gap before a series link is broken
pub const DEFAULT_DELTA_T_MAX: f64 = 110.0;

/// Default relaxation time constant
pub const DEFAULT_TAU: f64 = 45.0;

/// How the last sample of a time series is treated.
///
/// A terminal sample has no successor, so no forward difference exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalPolicy {
    /// Leave terminal samples out of both matrices.
    #[default]
    Exclude,
    /// Emit terminal samples with response = design.
    SteadyState,
}

/// Parameters for design/response construction.
///
/// ```rust
/// use trueno_design::config::{DesignResponseConfig, TerminalPolicy};
///
/// let config = DesignResponseConfig::builder()
///     .tau(30.0)
///     .delta_t_max(60.0)
///     .terminal_policy(TerminalPolicy::SteadyState)
///     .build()?;
/// assert_eq!(config.delta_t_min(), 0.0);
/// # Ok::<(), trueno_design::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesignResponseConfig {
    delta_t_min: f64,
    delta_t_max: f64,
    tau: f64,
    terminal_policy: TerminalPolicy,
}

impl Default for DesignResponseConfig {
    fn default() -> Self {
        Self {
            delta_t_min: DEFAULT_DELTA_T_MIN,
            delta_t_max: DEFAULT_DELTA_T_MAX,
            tau: DEFAULT_TAU,
            terminal_policy: TerminalPolicy::Exclude,
        }
    }
}

impl DesignResponseConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> DesignResponseConfigBuilder {
        DesignResponseConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration.
    ///
    /// Missing keys take their defaults; unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or a parameter is out of range
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or does not validate
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Floor for time-difference denominators.
    #[must_use]
    pub const fn delta_t_min(&self) -> f64 {
        self.delta_t_min
    }

    /// Maximum gap before a series link is broken.
    #[must_use]
    pub const fn delta_t_max(&self) -> f64 {
        self.delta_t_max
    }

    /// Relaxation time constant.
    #[must_use]
    pub const fn tau(&self) -> f64 {
        self.tau
    }

    /// Terminal sample handling.
    #[must_use]
    pub const fn terminal_policy(&self) -> TerminalPolicy {
        self.terminal_policy
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if:
    /// - `delta_t_min` or `delta_t_max` is negative or not finite
    /// - `tau` is not a finite positive number
    pub fn validate(&self) -> Result<()> {
        if !self.delta_t_min.is_finite() || self.delta_t_min < 0.0 {
            return Err(Error::Configuration(format!(
                "delta_t_min must be a finite value >= 0, got {}",
                self.delta_t_min
            )));
        }
        if !self.delta_t_max.is_finite() || self.delta_t_max < 0.0 {
            return Err(Error::Configuration(format!(
                "delta_t_max must be a finite value >= 0, got {}",
                self.delta_t_max
            )));
        }
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(Error::Configuration(format!(
                "tau must be a finite value > 0, got {}",
                self.tau
            )));
        }
        Ok(())
    }
}

/// Builder for `DesignResponseConfig`.
#[derive(Debug, Default)]
pub struct DesignResponseConfigBuilder {
    config: DesignResponseConfig,
}

impl DesignResponseConfigBuilder {
    /// Set the floor for time-difference denominators.
    #[must_use]
    pub const fn delta_t_min(mut self, delta_t_min: f64) -> Self {
        self.config.delta_t_min = delta_t_min;
        self
    }

    /// Set the maximum gap before a series link is broken.
    #[must_use]
    pub const fn delta_t_max(mut self, delta_t_max: f64) -> Self {
        self.config.delta_t_max = delta_t_max;
        self
    }

    /// Set the relaxation time constant.
    #[must_use]
    pub const fn tau(mut self, tau: f64) -> Self {
        self.config.tau = tau;
        self
    }

    /// Set terminal sample handling.
    #[must_use]
    pub const fn terminal_policy(mut self, policy: TerminalPolicy) -> Self {
        self.config.terminal_policy = policy;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if a parameter is out of range
    pub fn build(self) -> Result<DesignResponseConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
