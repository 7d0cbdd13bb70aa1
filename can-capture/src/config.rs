//! Store and display configuration types
//!
//! The store itself only needs the ingest policy and a pre-sizing hint; the
//! display options are consumed by the [`crate::format`] helpers.

use serde::{Deserialize, Serialize};

/// How `FrameStore::ingest` treats a frame whose identifier is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Every frame is appended to the history
    #[default]
    Append,
    /// A frame replaces the stored frame with the same identifier
    Dedup,
}

/// Radix used to render and parse identifiers and payload bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberBase {
    #[default]
    Hex,
    Decimal,
}

impl NumberBase {
    pub fn radix(&self) -> u32 {
        match self {
            NumberBase::Hex => 16,
            NumberBase::Decimal => 10,
        }
    }
}

/// Configuration for a frame store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Ingest policy for single-frame ingestion
    #[serde(default)]
    pub ingest_mode: IngestMode,

    /// Number of frames to pre-allocate in the history and filtered views
    #[serde(default = "default_capacity_hint")]
    pub capacity_hint: usize,
}

/// Default pre-allocation. Long live captures should raise this towards
/// [`LARGE_CAPTURE_CAPACITY`].
pub const DEFAULT_CAPACITY_HINT: usize = 65_536;

/// Capacity the store is designed to hold without restructuring
pub const LARGE_CAPTURE_CAPACITY: usize = 10_000_000;

fn default_capacity_hint() -> usize {
    DEFAULT_CAPACITY_HINT
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ingest_mode: IngestMode::default(),
            capacity_hint: DEFAULT_CAPACITY_HINT,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: choose the ingest policy
    pub fn with_ingest_mode(mut self, mode: IngestMode) -> Self {
        self.ingest_mode = mode;
        self
    }

    /// Builder method: set the pre-allocation hint
    pub fn with_capacity_hint(mut self, frames: usize) -> Self {
        self.capacity_hint = frames;
        self
    }
}

/// How frames are rendered for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Radix for identifiers and payload bytes
    #[serde(default)]
    pub number_base: NumberBase,

    /// Render timestamps as seconds with 6 decimals instead of raw microseconds
    #[serde(default)]
    pub seconds: bool,

    /// Ask the frame decoder to enrich payload text
    #[serde(default)]
    pub interpret: bool,
}

impl DisplayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number_base(mut self, base: NumberBase) -> Self {
        self.number_base = base;
        self
    }

    pub fn with_seconds(mut self, seconds: bool) -> Self {
        self.seconds = seconds;
        self
    }

    pub fn with_interpret(mut self, interpret: bool) -> Self {
        self.interpret = interpret;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::new()
            .with_ingest_mode(IngestMode::Dedup)
            .with_capacity_hint(16);

        assert_eq!(config.ingest_mode, IngestMode::Dedup);
        assert_eq!(config.capacity_hint, 16);
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.ingest_mode, IngestMode::Append);
        assert_eq!(config.capacity_hint, DEFAULT_CAPACITY_HINT);

        let display = DisplayOptions::default();
        assert_eq!(display.number_base, NumberBase::Hex);
        assert!(!display.seconds);
    }

    #[test]
    fn test_number_base_radix() {
        assert_eq!(NumberBase::Hex.radix(), 16);
        assert_eq!(NumberBase::Decimal.radix(), 10);
    }
}
