//! Index engine configuration.

/// Configuration for an [`IndexEngine`](crate::IndexEngine).
#[derive(Debug, Clone)]
pub struct IndexEngineConfig {
    /// Emit a warning when a single query returns more entities than this.
    pub scan_warning_threshold: usize,

    /// Whether query keys are checked against the field descriptors.
    ///
    /// With validation off, a key of the wrong kind simply matches nothing.
    pub validate_query_keys: bool,
}

impl Default for IndexEngineConfig {
    fn default() -> Self {
        Self {
            scan_warning_threshold: 10_000,
            validate_query_keys: true,
        }
    }
}

impl IndexEngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result size above which a query is logged as a large scan.
    #[must_use]
    pub const fn scan_warning_threshold(mut self, value: usize) -> Self {
        self.scan_warning_threshold = value;
        self
    }

    /// Sets whether query keys are validated.
    #[must_use]
    pub const fn validate_query_keys(mut self, value: bool) -> Self {
        self.validate_query_keys = value;
        self
    }
}
