#![forbid(unsafe_code)]

use super::StoreError;
use std::time::Duration;
use tv_core::MigrationPhase;

pub const ENV_GC_WINDOW_MS: &str = "TUPLEVAULT_GC_WINDOW_MS";
pub const ENV_REVISION_FUZZING_MS: &str = "TUPLEVAULT_REVISION_FUZZING_MS";
pub const ENV_REVISION_QUANTIZATION_MS: &str = "TUPLEVAULT_REVISION_QUANTIZATION_MS";
pub const ENV_MIGRATION_PHASE: &str = "TUPLEVAULT_MIGRATION_PHASE";
pub const ENV_BUSY_TIMEOUT_MS: &str = "TUPLEVAULT_BUSY_TIMEOUT_MS";
pub const ENV_QUERY_PAGE_SIZE: &str = "TUPLEVAULT_QUERY_PAGE_SIZE";

/// Construction-time settings for [`super::SqliteStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatastoreConfig {
    /// How long a superseded revision stays readable once a newer one exists.
    pub gc_window: Duration,
    /// Window after a write during which `optimized_revision` may hand out an
    /// older, still valid revision.
    pub revision_fuzzing_window: Duration,
    /// Bucket width for snapping revisions down; zero disables quantization.
    pub revision_quantization: Duration,
    pub migration_phase: MigrationPhase,
    pub busy_timeout: Duration,
    /// Rows fetched per round trip by query iterators.
    pub query_page_size: usize,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            gc_window: Duration::from_secs(24 * 60 * 60),
            revision_fuzzing_window: Duration::ZERO,
            revision_quantization: Duration::ZERO,
            migration_phase: MigrationPhase::NewOnly,
            busy_timeout: Duration::from_secs(5),
            query_page_size: 1000,
        }
    }
}

impl DatastoreConfig {
    pub fn with_gc_window(mut self, value: Duration) -> Self {
        self.gc_window = value;
        self
    }

    pub fn with_revision_fuzzing_window(mut self, value: Duration) -> Self {
        self.revision_fuzzing_window = value;
        self
    }

    pub fn with_revision_quantization(mut self, value: Duration) -> Self {
        self.revision_quantization = value;
        self
    }

    pub fn with_migration_phase(mut self, value: MigrationPhase) -> Self {
        self.migration_phase = value;
        self
    }

    pub fn with_busy_timeout(mut self, value: Duration) -> Self {
        self.busy_timeout = value;
        self
    }

    pub fn with_query_page_size(mut self, value: usize) -> Self {
        self.query_page_size = value;
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.gc_window.is_zero() {
            return Err(StoreError::InvalidConfig(
                "gc_window must be greater than zero".to_string(),
            ));
        }
        if self.revision_fuzzing_window >= self.gc_window {
            return Err(StoreError::InvalidConfig(format!(
                "revision_fuzzing_window ({:?}) must be shorter than gc_window ({:?})",
                self.revision_fuzzing_window, self.gc_window
            )));
        }
        if self.revision_quantization >= self.gc_window {
            return Err(StoreError::InvalidConfig(format!(
                "revision_quantization ({:?}) must be shorter than gc_window ({:?})",
                self.revision_quantization, self.gc_window
            )));
        }
        if self.query_page_size == 0 {
            return Err(StoreError::InvalidConfig(
                "query_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Defaults overridden by any `TUPLEVAULT_*` variables that are set.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_GC_WINDOW_MS) {
            config.gc_window = parse_millis(ENV_GC_WINDOW_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_REVISION_FUZZING_MS) {
            config.revision_fuzzing_window = parse_millis(ENV_REVISION_FUZZING_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_REVISION_QUANTIZATION_MS) {
            config.revision_quantization = parse_millis(ENV_REVISION_QUANTIZATION_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_MIGRATION_PHASE) {
            config.migration_phase = value
                .parse()
                .map_err(|err| StoreError::InvalidConfig(format!("{ENV_MIGRATION_PHASE}: {err}")))?;
        }
        if let Some(value) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout = parse_millis(ENV_BUSY_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_QUERY_PAGE_SIZE) {
            config.query_page_size = value.trim().parse().map_err(|_| {
                StoreError::InvalidConfig(format!("{ENV_QUERY_PAGE_SIZE}: `{value}` is not a count"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, StoreError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| StoreError::InvalidConfig(format!("{key}: `{value}` is not milliseconds")))
}
