//! Resolver configuration.
//!
//! Settings are plain serde data so callers can embed them in whatever
//! configuration file their generator already reads. Every field has a
//! default, so an empty document is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! pointer_width: 64
//! bitflag_aliases: warn
//! allow_qualified_references: true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How bitflag entries that resolve to the same mask are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AliasPolicy {
    /// Not reported.
    Allow,
    /// Reported as a warning; the model stays available.
    #[default]
    Warn,
    /// Reported as an error.
    Deny,
}

/// Settings for one [`Resolver`](crate::Resolver).
///
/// # Examples
///
/// ```
/// use idl_schema_core::{AliasPolicy, ResolverConfig};
///
/// let config = ResolverConfig::from_yaml_str("pointer_width: 32\nbitflag_aliases: deny\n").unwrap();
/// assert_eq!(config.pointer_width, 32);
/// assert_eq!(config.bitflag_aliases, AliasPolicy::Deny);
/// assert!(config.allow_qualified_references);
///
/// assert!(ResolverConfig::from_yaml_str("pointer_width: 16").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Target pointer width in bits, used to resolve `usize_max`.
    pub pointer_width: u32,
    /// Severity of duplicate bitflag values.
    pub bitflag_aliases: AliasPolicy,
    /// Accept `kind.name` and `array<T>` reference forms.
    pub allow_qualified_references: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pointer_width: 64,
            bitflag_aliases: AliasPolicy::Warn,
            allow_qualified_references: true,
        }
    }
}

impl ResolverConfig {
    /// Parses and validates a YAML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::YamlError`] if parsing fails, or
    /// [`ConfigError::UnsupportedPointerWidth`] for widths other than 32/64.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not a map.
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.pointer_width {
            32 | 64 => Ok(()),
            other => Err(ConfigError::UnsupportedPointerWidth(other)),
        }
    }

    /// Sets the pointer width.
    pub fn with_pointer_width(mut self, bits: u32) -> Self {
        self.pointer_width = bits;
        self
    }

    /// Sets the bitflag alias policy.
    pub fn with_bitflag_aliases(mut self, policy: AliasPolicy) -> Self {
        self.bitflag_aliases = policy;
        self
    }
}
