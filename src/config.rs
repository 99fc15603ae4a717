//! Configuration for KeyTable
//!
//! Centralized configuration with sensible defaults.

/// Default cap on live bookmarks per table
pub const DEFAULT_MAX_BOOKMARKS: usize = 100;

/// Columns a partial key update may append past the end of a row's key
/// when `sort_columns` does not fix the shape
pub const MAX_KEY_GROWTH: usize = 8;

/// Configuration for a single table instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Bookmark Configuration
    // -------------------------------------------------------------------------
    /// Max number of live bookmarks before `create_bookmark` fails
    pub max_bookmarks: usize,

    // -------------------------------------------------------------------------
    // Sort Key Configuration
    // -------------------------------------------------------------------------
    /// Expected column count of every SortKey (None = unchecked)
    pub sort_columns: Option<usize>,

    /// Reject keys whose column count differs from `sort_columns`.
    /// When false, short keys are accepted and missing columns compare as NULL.
    pub strict_shape: bool,

    // -------------------------------------------------------------------------
    // Memory Configuration
    // -------------------------------------------------------------------------
    /// Number of rows to pre-allocate space for
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_bookmarks: DEFAULT_MAX_BOOKMARKS,
            sort_columns: None,
            strict_shape: false,
            initial_capacity: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the maximum number of live bookmarks
    pub fn max_bookmarks(mut self, count: usize) -> Self {
        self.config.max_bookmarks = count;
        self
    }

    /// Set the expected number of sort columns
    pub fn sort_columns(mut self, count: usize) -> Self {
        self.config.sort_columns = Some(count);
        self
    }

    /// Reject mis-shaped sort keys instead of padding them with NULL
    pub fn strict_shape(mut self, strict: bool) -> Self {
        self.config.strict_shape = strict;
        self
    }

    /// Set the row pre-allocation hint
    pub fn initial_capacity(mut self, rows: usize) -> Self {
        self.config.initial_capacity = rows;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
