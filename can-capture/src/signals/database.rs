//! Signal definition database
//!
//! Holds message definitions from one or more DBC files, keyed by CAN ID.

use std::collections::HashMap;

/// A CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID (extended flag bit stripped)
    pub id: u32,
    pub name: String,
    /// Sender ECU name (optional)
    pub sender: Option<String>,
    pub signals: Vec<SignalDefinition>,
    /// Multiplexer signal name (if multiplexed)
    pub multiplexer_signal: Option<String>,
}

/// A CAN signal definition
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    pub name: String,
    /// Start bit in the CAN frame
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    pub byte_order: ByteOrder,
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    pub unit: Option<String>,
    /// Multiplexer info (None if not multiplexed)
    pub multiplexer_info: Option<MultiplexerInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Intel format
    LittleEndian,
    /// Motorola format
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Signed,
    Unsigned,
}

/// Multiplexer information for multiplexed signals
#[derive(Debug, Clone)]
pub struct MultiplexerInfo {
    /// Name of the multiplexer signal that controls this signal
    pub multiplexer_signal: String,
    /// Multiplexer value(s) for which this signal is active
    pub multiplexer_values: Vec<u64>,
}

/// Message definitions by CAN ID
///
/// Several files may define the same ID; the first definition loaded wins.
#[derive(Debug, Default)]
pub struct SignalDatabase {
    messages: HashMap<u32, Vec<MessageDefinition>>,
}

impl SignalDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: MessageDefinition) {
        self.messages.entry(message.id).or_default().push(message);
    }

    /// First message definition loaded for `can_id`
    pub fn get_message(&self, can_id: u32) -> Option<&MessageDefinition> {
        self.messages.get(&can_id).and_then(|msgs| msgs.first())
    }

    /// Number of (messages, signals) defined
    pub fn counts(&self) -> (usize, usize) {
        let definitions = self.messages.values().flatten();
        let num_messages = self.messages.values().map(Vec::len).sum();
        let num_signals = definitions.map(|msg| msg.signals.len()).sum();
        (num_messages, num_signals)
    }
}
