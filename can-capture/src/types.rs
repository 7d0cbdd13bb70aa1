//! Core types for the CAN capture store
//!
//! This module defines the frame value type that flows through the store and
//! the analytics engine, together with the library error type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for capture store operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Maximum payload size of a classic CAN frame
pub const MAX_PAYLOAD: usize = 8;

/// Direction of a captured frame relative to the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Frame was received from the bus
    #[default]
    Received,
    /// Frame was transmitted by the capture device
    Transmitted,
}

impl Direction {
    /// Short display token (`Rx` / `Tx`)
    pub fn token(&self) -> &'static str {
        match self {
            Direction::Received => "Rx",
            Direction::Transmitted => "Tx",
        }
    }

    /// Parse a display token, case-insensitive
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "rx" => Some(Direction::Received),
            "tx" => Some(Direction::Transmitted),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A single captured CAN frame
///
/// Frames are plain values. Once stored, only the timestamp rebase performed
/// by [`crate::FrameStore::normalize_time`] and dedup-mode replacement touch
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// CAN identifier (11-bit or 29-bit, stored unmasked)
    pub identifier: u32,
    /// True if this is an extended (29-bit) identifier
    pub extended: bool,
    /// Capture clock timestamp in microseconds
    pub timestamp: u64,
    /// Bus index the frame was seen on
    pub bus: u8,
    /// Received or transmitted
    pub direction: Direction,
    /// Number of meaningful payload bytes (0-8, not validated by the store)
    pub length: u8,
    /// Payload bytes; only the first `length` are meaningful
    pub payload: [u8; MAX_PAYLOAD],
}

impl Frame {
    /// Create a received frame on bus 0 from an identifier, timestamp and data
    ///
    /// Data longer than 8 bytes is truncated.
    pub fn new(identifier: u32, timestamp: u64, data: &[u8]) -> Self {
        let mut payload = [0u8; MAX_PAYLOAD];
        let length = data.len().min(MAX_PAYLOAD);
        payload[..length].copy_from_slice(&data[..length]);
        Self {
            identifier,
            extended: identifier > 0x7FF,
            timestamp,
            bus: 0,
            direction: Direction::Received,
            length: length as u8,
            payload,
        }
    }

    /// Builder method: set the extended flag
    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    /// Builder method: set the bus index
    pub fn with_bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }

    /// Builder method: set the direction
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Meaningful payload bytes, clamped to the 8-byte buffer
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.data_len()]
    }

    /// Payload length clamped to the 8-byte buffer
    pub fn data_len(&self) -> usize {
        (self.length as usize).min(MAX_PAYLOAD)
    }
}

/// Errors that can occur in the capture store
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse capture line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Failed to parse DBC file: {0}")]
    DbcParse(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),
}
