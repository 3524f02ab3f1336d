//! Service configuration

use thiserror::Error;

/// Configuration errors raised at service construction.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunable limits for the versioning core.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Maximum plaintext content size accepted for a version.
    pub max_content_bytes: u64,
    /// History page size when the query does not specify one.
    pub default_history_page: usize,
    /// Upper bound on history page size; larger requests are clamped.
    pub max_history_page: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: 50 * 1024 * 1024,
            default_history_page: 20,
            max_history_page: 100,
        }
    }
}

impl VaultConfig {
    /// Validate internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_content_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_content_bytes must be positive".to_string(),
            ));
        }
        if self.default_history_page == 0 || self.max_history_page == 0 {
            return Err(ConfigError::Invalid(
                "history page sizes must be positive".to_string(),
            ));
        }
        if self.default_history_page > self.max_history_page {
            return Err(ConfigError::Invalid(format!(
                "default_history_page {} exceeds max_history_page {}",
                self.default_history_page, self.max_history_page
            )));
        }
        Ok(())
    }

    /// Clamp a requested page size into [1, max_history_page], using the
    /// default when unspecified.
    pub fn history_page(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_history_page)
            .clamp(1, self.max_history_page)
    }
}
