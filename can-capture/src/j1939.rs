//! J1939 identifier decoding
//!
//! Splits a 29-bit identifier into priority, parameter group number, PDU
//! format/specific bytes, source address and destination.

use serde::Serialize;

/// Destination reported for broadcast (PDU2) frames
pub const BROADCAST_DESTINATION: u16 = 0xFFFF;

/// PDU format values above this are broadcast (PDU2) frames
const PDU1_MAX_FORMAT: u8 = 0xEF;

/// Sub-fields of a J1939 extended identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct J1939Id {
    pub priority: u8,
    pub pgn: u32,
    pub pdu_format: u8,
    pub pdu_specific: u8,
    pub source: u8,
    /// Destination address, or [`BROADCAST_DESTINATION`]
    pub destination: u16,
    pub is_broadcast: bool,
}

impl J1939Id {
    pub fn decode(identifier: u32) -> Self {
        let pdu_format = ((identifier >> 16) & 0xFF) as u8;
        let pdu_specific = ((identifier >> 8) & 0xFF) as u8;
        let is_broadcast = pdu_format > PDU1_MAX_FORMAT;

        Self {
            priority: (identifier >> 26) as u8,
            pgn: (identifier >> 8) & 0x3FFFF,
            pdu_format,
            pdu_specific,
            source: (identifier & 0xFF) as u8,
            destination: if is_broadcast {
                BROADCAST_DESTINATION
            } else {
                pdu_specific as u16
            },
            is_broadcast,
        }
    }
}
