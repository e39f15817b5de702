use std::num::NonZeroUsize;

use crate::{error::IndexBrainError, search::SearchConfig};

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Create a builder for quick type-ahead lookups (few results)
    pub fn fast() -> Self {
        let mut builder = Self::new();
        builder.config.default_limit = NonZeroUsize::new(10).unwrap_or(builder.config.default_limit);
        builder
    }

    /// Create a builder that matches case exactly on `\n`-terminated corpora
    pub fn exact() -> Self {
        Self::new().case_sensitive(true).crlf(false)
    }

    /// Set the number of results returned when a request does not ask for a
    /// specific count
    pub fn default_limit(mut self, limit: usize) -> Result<Self, IndexBrainError> {
        let Some(limit) = NonZeroUsize::new(limit) else {
            return Err(IndexBrainError::ConfigError(
                "Default result limit must be at least 1".to_string(),
            ));
        };
        self.config.default_limit = limit;
        Ok(self)
    }

    /// Match query case exactly instead of ignoring it
    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.config.case_insensitive = !enabled;
        self
    }

    /// Treat `\r\n` as the corpus line terminator
    pub fn crlf(mut self, enabled: bool) -> Self {
        self.config.crlf = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SearchConfig {
        self.config
    }
}
