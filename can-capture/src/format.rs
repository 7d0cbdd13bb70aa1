//! Text encoding of identifiers, timestamps and payloads
//!
//! Everything rendered here parses back through [`parse_number`] with the
//! same [`NumberBase`].

use crate::config::{DisplayOptions, NumberBase};
use crate::decoder::FrameDecoder;
use crate::types::{CaptureError, Frame, Result};
use std::fmt::Write;

/// Column headers matching [`FrameRow`]
pub const COLUMN_HEADERS: [&str; 7] = ["Timestamp", "ID", "Ext", "Dir", "Bus", "Len", "Data"];

/// Render a number: `0x`-prefixed uppercase hex, or plain decimal
pub fn format_number(value: u32, base: NumberBase) -> String {
    match base {
        NumberBase::Hex => format!("0x{:X}", value),
        NumberBase::Decimal => value.to_string(),
    }
}

/// Render an identifier, padding hex to 3 digits (standard) or 8 (extended)
pub fn format_identifier(identifier: u32, extended: bool, base: NumberBase) -> String {
    match base {
        NumberBase::Hex if extended => format!("0x{:08X}", identifier),
        NumberBase::Hex => format!("0x{:03X}", identifier),
        NumberBase::Decimal => identifier.to_string(),
    }
}

/// Parse a number typed by a user or produced by [`format_number`].
///
/// `0x`/`0X` selects hex and `0b`/`0B` binary regardless of `base`; an
/// optional leading `+` is accepted. Unprefixed text uses `base`.
pub fn parse_number(text: &str, base: NumberBase) -> Result<u32> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (digits, radix) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = unsigned
        .strip_prefix("0b")
        .or_else(|| unsigned.strip_prefix("0B"))
    {
        (bin, 2)
    } else {
        (unsigned, base.radix())
    };

    u32::from_str_radix(digits, radix)
        .map_err(|_| CaptureError::InvalidIdentifier(text.to_string()))
}

/// Render a timestamp as raw microseconds, or seconds with 6 decimals
pub fn format_timestamp(timestamp: u64, seconds: bool) -> String {
    if seconds {
        format!("{}.{:06}", timestamp / 1_000_000, timestamp % 1_000_000)
    } else {
        timestamp.to_string()
    }
}

/// Render a byte as 8 binary digits, most significant first
pub fn format_binary(value: u8) -> String {
    format!("{:08b}", value)
}

/// Space-separated payload bytes, optionally followed by the decoder's view
/// of the frame.
///
/// Falls back to the raw bytes when there is no decoder or it does not know
/// the frame.
pub fn format_payload(frame: &Frame, base: NumberBase, decoder: Option<&dyn FrameDecoder>) -> String {
    let mut text = String::new();
    for byte in frame.data() {
        text.push_str(&format_number(*byte as u32, base));
        text.push(' ');
    }

    if let Some(message) = decoder.and_then(|d| d.decode(frame)) {
        let _ = write!(text, "\n{}", message.name);
        for field in &message.fields {
            text.push('\n');
            text.push_str(field);
        }
    }

    text
}

/// One display row of the frame table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRow {
    pub timestamp: String,
    pub identifier: String,
    pub extended: String,
    pub direction: String,
    pub bus: String,
    pub length: String,
    pub data: String,
}

impl FrameRow {
    pub fn render(frame: &Frame, options: &DisplayOptions, decoder: Option<&dyn FrameDecoder>) -> Self {
        let decoder = if options.interpret { decoder } else { None };
        Self {
            timestamp: format_timestamp(frame.timestamp, options.seconds),
            identifier: format_number(frame.identifier, options.number_base),
            extended: u8::from(frame.extended).to_string(),
            direction: frame.direction.token().to_string(),
            bus: frame.bus.to_string(),
            length: frame.length.to_string(),
            data: format_payload(frame, options.number_base, decoder),
        }
    }

    /// Columns in [`COLUMN_HEADERS`] order
    pub fn columns(&self) -> [&str; 7] {
        [
            &self.timestamp,
            &self.identifier,
            &self.extended,
            &self.direction,
            &self.bus,
            &self.length,
            &self.data,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecodedMessage;
    use crate::types::Direction;

    struct FixedDecoder;

    impl FrameDecoder for FixedDecoder {
        fn decode(&self, frame: &Frame) -> Option<DecodedMessage> {
            (frame.identifier == 0x100).then(|| DecodedMessage {
                name: "Speed".to_string(),
                fields: vec!["VehicleSpeed: 12 km/h".to_string()],
            })
        }
    }

    #[test]
    fn test_number_round_trip() {
        for value in [0, 0x7FF, 0x18FEDF00, u32::MAX] {
            for base in [NumberBase::Hex, NumberBase::Decimal] {
                assert_eq!(parse_number(&format_number(value, base), base).unwrap(), value);
            }
            let padded = format_identifier(value, true, NumberBase::Hex);
            assert_eq!(parse_number(&padded, NumberBase::Decimal).unwrap(), value);
        }
    }

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(parse_number("1F", NumberBase::Hex).unwrap(), 0x1F);
        assert_eq!(parse_number("+42", NumberBase::Decimal).unwrap(), 42);
        assert_eq!(parse_number("0b101", NumberBase::Decimal).unwrap(), 5);
        assert!(parse_number("-1", NumberBase::Decimal).is_err());
        assert!(parse_number("0xZZ", NumberBase::Hex).is_err());
    }

    #[test]
    fn test_identifier_padding() {
        assert_eq!(format_identifier(0x12, false, NumberBase::Hex), "0x012");
        assert_eq!(format_identifier(0x12, true, NumberBase::Hex), "0x00000012");
        assert_eq!(format_identifier(0x12, true, NumberBase::Decimal), "18");
    }

    #[test]
    fn test_timestamp_seconds() {
        assert_eq!(format_timestamp(1_500_042, false), "1500042");
        assert_eq!(format_timestamp(1_500_042, true), "1.500042");
        assert_eq!(format_timestamp(7, true), "0.000007");
    }

    #[test]
    fn test_payload_with_and_without_decoder() {
        let frame = Frame::new(0x100, 0, &[0x0A, 0xFF]);
        assert_eq!(format_payload(&frame, NumberBase::Hex, None), "0xA 0xFF ");
        assert_eq!(format_payload(&frame, NumberBase::Decimal, None), "10 255 ");

        let decoded = format_payload(&frame, NumberBase::Hex, Some(&FixedDecoder));
        assert_eq!(decoded, "0xA 0xFF \nSpeed\nVehicleSpeed: 12 km/h");

        let unknown = Frame::new(0x200, 0, &[1]);
        assert_eq!(format_payload(&unknown, NumberBase::Hex, Some(&FixedDecoder)), "0x1 ");
    }

    #[test]
    fn test_row_rendering() {
        let frame = Frame::new(0x100, 2_000_000, &[1])
            .with_bus(1)
            .with_direction(Direction::Transmitted);
        let options = DisplayOptions::new().with_seconds(true);

        let row = FrameRow::render(&frame, &options, Some(&FixedDecoder));
        assert_eq!(
            row.columns(),
            ["2.000000", "0x100", "0", "Tx", "1", "1", "0x1 "]
        );

        let interpreted = FrameRow::render(&frame, &options.with_interpret(true), Some(&FixedDecoder));
        assert!(interpreted.data.contains("Speed"));
    }
}
