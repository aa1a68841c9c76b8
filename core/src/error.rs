//! Error types for resolver configuration.
//!
//! Schema problems are not errors in this sense: they are collected as
//! diagnostics in a [`ValidationReport`](crate::ValidationReport).

use thiserror::Error;

/// Errors that can occur while loading a [`ResolverConfig`](crate::ResolverConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Pointer width other than 32 or 64.
    #[error("unsupported pointer width: {0} (expected 32 or 64)")]
    UnsupportedPointerWidth(u32),
}
