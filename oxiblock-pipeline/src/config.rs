//! Pipeline configuration.

use oxiblock_core::error::{OxiBlockError, Result};
use serde::{Deserialize, Serialize};

/// Ordered pipeline configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of units in flight.
    pub capacity: usize,
    /// Worker threads; 0 lets rayon pick one per CPU.
    pub threads: usize,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl PipelineConfig {
    /// Default number of in-flight units.
    pub const DEFAULT_CAPACITY: usize = 8;

    /// Create a configuration with the given capacity and default threads.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Check the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(OxiBlockError::capacity(0, 1));
        }
        if self.thread_name.is_empty() {
            return Err(OxiBlockError::config("thread name prefix must not be empty"));
        }
        Ok(())
    }

    /// Build the worker pool described by this configuration.
    pub(crate) fn build_pool(&self) -> Result<rayon::ThreadPool> {
        let prefix = self.thread_name.clone();
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(move |index| format!("{}-{}", prefix, index))
            .build()
            .map_err(|e| OxiBlockError::config(format!("failed to build worker pool: {}", e)))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            threads: 0,
            thread_name: "oxiblock-worker".to_string(),
        }
    }
}
