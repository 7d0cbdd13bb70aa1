//! Signal extraction
//!
//! Pulls signal values out of a payload according to DBC definitions and
//! renders them as `Name: value unit` lines. Handles Intel/Motorola bit
//! order, sign extension, scaling and multiplexing.

use crate::decoder::DecodedMessage;
use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use std::fmt;

/// Physical value of one signal
#[derive(Debug, Clone, Copy, PartialEq)]
enum SignalValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{:.3}", v),
            SignalValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

pub(crate) struct MessageDecoder;

impl MessageDecoder {
    /// Render every signal of `message_def` that is present in `data`.
    ///
    /// Multiplexed signals are only rendered when the multiplexer selects
    /// them. Returns `None` if no signal fits the payload.
    pub(crate) fn decode_message(data: &[u8], message_def: &MessageDefinition) -> Option<DecodedMessage> {
        let multiplexer_value = message_def
            .multiplexer_signal
            .as_ref()
            .and_then(|name| message_def.signals.iter().find(|s| s.name == *name))
            .and_then(|signal| Self::extract_signal_value(data, signal))
            .map(|value| value as u64);

        let fields: Vec<String> = message_def
            .signals
            .iter()
            .filter(|signal| match (&signal.multiplexer_info, multiplexer_value) {
                (Some(mux), Some(active)) => mux.multiplexer_values.contains(&active),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter_map(|signal| Self::render_signal(data, signal))
            .collect();

        if fields.is_empty() {
            return None;
        }

        Some(DecodedMessage {
            name: message_def.name.clone(),
            fields,
        })
    }

    fn render_signal(data: &[u8], signal: &SignalDefinition) -> Option<String> {
        let raw_value = Self::extract_signal_value(data, signal)?;
        let value = Self::physical_value(raw_value, signal);

        Some(match &signal.unit {
            Some(unit) => format!("{}: {} {}", signal.name, value, unit),
            None => format!("{}: {}", signal.name, value),
        })
    }

    fn physical_value(raw_value: i64, signal: &SignalDefinition) -> SignalValue {
        let scaled = signal.factor != 1.0 || signal.offset != 0.0;
        if !scaled && signal.length == 1 {
            SignalValue::Boolean(raw_value != 0)
        } else if scaled {
            SignalValue::Float(signal.offset + signal.factor * raw_value as f64)
        } else {
            SignalValue::Integer(raw_value)
        }
    }

    fn extract_signal_value(data: &[u8], signal: &SignalDefinition) -> Option<i64> {
        let length = signal.length as usize;

        // First bit in the extractor's own numbering
        let first_bit = match signal.byte_order {
            ByteOrder::LittleEndian => signal.start_bit as usize,
            ByteOrder::BigEndian => Self::motorola_msb_position(signal.start_bit as usize),
        };

        if length == 0 || (first_bit + length).div_ceil(8) > data.len() {
            log::trace!(
                "Signal '{}' does not fit a {}-byte payload",
                signal.name,
                data.len()
            );
            return None;
        }

        let raw_value = match signal.byte_order {
            ByteOrder::LittleEndian => Self::extract_little_endian(data, first_bit, length),
            ByteOrder::BigEndian => Self::extract_big_endian(data, first_bit, length),
        };

        Some(match signal.value_type {
            ValueType::Unsigned => raw_value as i64,
            ValueType::Signed => Self::sign_extend(raw_value, length),
        })
    }

    /// Map a DBC Motorola start bit (sawtooth numbering, bit 7 is the MSB of
    /// byte 0) to an MSB-first position counted from the start of the payload
    fn motorola_msb_position(start_bit: usize) -> usize {
        (start_bit / 8) * 8 + (7 - start_bit % 8)
    }

    /// Intel order: start bit is the LSB, bits counted upward through bytes
    fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        (0..length).fold(0u64, |acc, i| {
            let bit_pos = start_bit + i;
            let bit = (data[bit_pos / 8] >> (bit_pos % 8)) & 0x01;
            acc | (bit as u64) << i
        })
    }

    /// Motorola order from an MSB-first position (0 is the MSB of byte 0)
    fn extract_big_endian(data: &[u8], msb_position: usize, length: usize) -> u64 {
        (0..length).fold(0u64, |acc, i| {
            let bit_pos = msb_position + i;
            let bit = (data[bit_pos / 8] >> (7 - bit_pos % 8)) & 0x01;
            acc | (bit as u64) << (length - 1 - i)
        })
    }

    fn sign_extend(value: u64, bit_length: usize) -> i64 {
        if bit_length >= 64 {
            return value as i64;
        }
        let sign_bit = 1u64 << (bit_length - 1);
        if value & sign_bit != 0 {
            (value | (!0u64 << bit_length)) as i64
        } else {
            value as i64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::database::MultiplexerInfo;

    fn signal(name: &str, start_bit: u16, length: u16) -> SignalDefinition {
        SignalDefinition {
            name: name.to_string(),
            start_bit,
            length,
            byte_order: ByteOrder::LittleEndian,
            value_type: ValueType::Unsigned,
            factor: 1.0,
            offset: 0.0,
            unit: None,
            multiplexer_info: None,
        }
    }

    #[test]
    fn test_extract_little_endian_cross_byte() {
        let data = [0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(MessageDecoder::extract_little_endian(&data, 0, 8), 0xAB);
        assert_eq!(MessageDecoder::extract_little_endian(&data, 0, 16), 0xCDAB);
    }

    #[test]
    fn test_motorola_msb_position() {
        assert_eq!(MessageDecoder::motorola_msb_position(7), 0);
        assert_eq!(MessageDecoder::motorola_msb_position(0), 7);
        assert_eq!(MessageDecoder::motorola_msb_position(15), 8);
        assert_eq!(MessageDecoder::motorola_msb_position(12), 11);
    }

    #[test]
    fn test_motorola_signals_use_sawtooth_start_bit() {
        let mut word = signal("Word", 7, 16);
        word.byte_order = ByteOrder::BigEndian;
        let mut high = signal("High", 7, 8);
        high.byte_order = ByteOrder::BigEndian;
        // Low nibble of byte 1: MSB at sawtooth bit 11
        let mut nibble = signal("Nibble", 11, 4);
        nibble.byte_order = ByteOrder::BigEndian;

        let message = MessageDefinition {
            id: 0x300,
            name: "Motorola".to_string(),
            sender: None,
            signals: vec![word, high, nibble],
            multiplexer_signal: None,
        };

        let decoded = MessageDecoder::decode_message(&[0x12, 0x34], &message).unwrap();
        assert_eq!(decoded.fields, vec!["Word: 4660", "High: 18", "Nibble: 4"]);
    }

    #[test]
    fn test_motorola_signal_past_payload_skipped() {
        let mut wide = signal("Wide", 15, 16);
        wide.byte_order = ByteOrder::BigEndian;
        let message = MessageDefinition {
            id: 0x301,
            name: "Short".to_string(),
            sender: None,
            signals: vec![wide],
            multiplexer_signal: None,
        };
        assert!(MessageDecoder::decode_message(&[0x12, 0x34], &message).is_none());
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(MessageDecoder::sign_extend(0x7F, 8), 127);
        assert_eq!(MessageDecoder::sign_extend(0xFF, 8), -1);
        assert_eq!(MessageDecoder::sign_extend(0x8000, 16), -32768);
    }

    #[test]
    fn test_signal_outside_payload_skipped() {
        let message = MessageDefinition {
            id: 0x10,
            name: "Short".to_string(),
            sender: None,
            signals: vec![signal("Wide", 8, 16)],
            multiplexer_signal: None,
        };
        assert!(MessageDecoder::decode_message(&[0x01, 0x02], &message).is_none());
    }

    #[test]
    fn test_multiplexed_rendering() {
        let mut mode_a = signal("SignalA", 8, 8);
        mode_a.multiplexer_info = Some(MultiplexerInfo {
            multiplexer_signal: "Mode".to_string(),
            multiplexer_values: vec![0],
        });
        let mut mode_b = signal("SignalB", 8, 8);
        mode_b.multiplexer_info = Some(MultiplexerInfo {
            multiplexer_signal: "Mode".to_string(),
            multiplexer_values: vec![1],
        });
        let mut flag = signal("Flag", 16, 1);
        flag.unit = Some("bool".to_string());

        let message = MessageDefinition {
            id: 0x200,
            name: "Muxed".to_string(),
            sender: None,
            signals: vec![signal("Mode", 0, 8), mode_a, mode_b, flag],
            multiplexer_signal: Some("Mode".to_string()),
        };

        let decoded = MessageDecoder::decode_message(&[1, 42, 1], &message).unwrap();
        assert_eq!(decoded.fields, vec!["Mode: 1", "SignalB: 42", "Flag: true bool"]);
    }
}
