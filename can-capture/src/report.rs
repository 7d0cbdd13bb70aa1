//! Plain-text rendering of a [`FrameSnapshot`]
//!
//! The report is an indented tree, one tab per level, suitable for saving
//! alongside a capture.

use crate::analytics::FrameSnapshot;
use crate::config::NumberBase;
use crate::format::{format_binary, format_identifier, format_number};

/// A line of the report and its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportNode {
    pub text: String,
    pub children: Vec<ReportNode>,
}

impl ReportNode {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    fn child(&mut self, text: impl Into<String>) -> &mut ReportNode {
        self.children.push(ReportNode::new(text));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push('\t');
        }
        out.push_str(&self.text);
        out.push('\n');
        for child in &self.children {
            child.write_into(out, depth + 1);
        }
    }

    /// Render the tree, one line per node
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0);
        out
    }
}

fn millis(micros: u64) -> String {
    format!("{:.3}ms", micros as f64 / 1000.0)
}

/// Build the report tree for one identifier
pub fn build_report(snapshot: &FrameSnapshot, base: NumberBase) -> ReportNode {
    let num = |value: u32| format_number(value, base);
    let mut root = ReportNode::new(format!(
        "ID: {}",
        format_identifier(snapshot.identifier, snapshot.extended, base)
    ));

    if let Some(j1939) = &snapshot.j1939 {
        if j1939.is_broadcast {
            root.child("Broadcast Frame");
        } else {
            root.child(format!("Destination ID: {}", num(j1939.destination as u32)));
        }
        root.child(format!("SRC: {}", num(j1939.source as u32)));
        root.child(format!("PGN: {}({})", num(j1939.pgn), j1939.pgn));
        root.child(format!("PF: {}", num(j1939.pdu_format as u32)));
        root.child(format!("PS: {}", num(j1939.pdu_specific as u32)));
        root.child(format!("Priority: {}", j1939.priority));
    }

    root.child(format!("# of frames: {}", snapshot.frame_count));

    if snapshot.min_length < snapshot.max_length {
        root.child(format!(
            "Data Length: {} to {}",
            snapshot.min_length, snapshot.max_length
        ));
    } else {
        root.child(format!("Data Length: {}", snapshot.min_length));
    }

    let intervals = &snapshot.intervals;
    root.child(format!(
        "Average inter-frame interval: {:.3}ms",
        intervals.mean / 1000.0
    ));
    root.child(format!("Minimum inter-frame interval: {}", millis(intervals.min)));
    root.child(format!("Maximum inter-frame interval: {}", millis(intervals.max)));
    root.child(format!(
        "Inter-frame interval variation: {}",
        millis(intervals.variation())
    ));
    root.child(format!(
        "Interval standard deviation: {:.3}ms",
        intervals.std_dev / 1000.0
    ));
    root.child(format!(
        "Minimum range to fit 90% of inter-frame intervals: {}",
        millis(intervals.spread_90())
    ));

    for (position, byte) in snapshot.bytes.iter().enumerate() {
        let node = root.child(format!("Data Byte {}", position));
        node.child(format!(
            "Changed bits: 0x{:X}  ({})",
            byte.changed_bits,
            format_binary(byte.changed_bits)
        ));
        node.child(format!(
            "Range: {} to {}",
            num(byte.min as u32),
            num(byte.max as u32)
        ));

        let histogram = node.child("Histogram");
        for (value, &count) in byte.histogram.iter().enumerate() {
            if count > 0 {
                histogram.child(format!(
                    "{}/0x{:X} ({}) -> {}",
                    value,
                    value,
                    format_binary(value as u8),
                    count
                ));
            }
        }
    }

    let bit_slots = snapshot.bytes.len() * 8;
    for (title, counts) in [
        ("Bitfield Histogram", &snapshot.bit_set_histogram),
        ("Bit Toggle Histogram", &snapshot.bit_toggle_histogram),
    ] {
        let node = root.child(title);
        for (slot, count) in counts.iter().take(bit_slots).enumerate() {
            node.child(format!(
                "{} (Byte {} Bit {}) :{}",
                slot,
                slot / 8,
                slot % 8,
                count
            ));
        }
    }

    if !intervals.histogram.is_empty() {
        let node = root.child("Interval Histogram");
        for bucket in &intervals.histogram {
            node.child(format!("<= {}: {}", millis(bucket.upper_bound), bucket.count));
        }
    }

    root
}

/// Render the report for one identifier as text
pub fn render_report(snapshot: &FrameSnapshot, base: NumberBase) -> String {
    build_report(snapshot, base).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsEngine;
    use crate::types::Frame;

    #[test]
    fn test_report_layout() {
        let frames = vec![
            Frame::new(0x123, 0, &[0x0F]),
            Frame::new(0x123, 1_000, &[0xF0]),
        ];
        let snapshot = AnalyticsEngine::compute(&frames, 0x123).unwrap();
        let text = render_report(&snapshot, NumberBase::Hex);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ID: 0x123");
        assert_eq!(lines[1], "\t# of frames: 2");
        assert_eq!(lines[2], "\tData Length: 1");
        assert_eq!(lines[3], "\tAverage inter-frame interval: 1.000ms");
        assert!(text.contains("\tData Byte 0\n\t\tChanged bits: 0xFF  (11111111)\n"));
        assert!(text.contains("\t\tRange: 0xF to 0xF0\n"));
        assert!(text.contains("\t\t\t15/0xF (00001111) -> 1\n"));
        assert!(text.contains("\tBit Toggle Histogram\n\t\t0 (Byte 0 Bit 0) :1\n"));
        assert!(!text.contains("Broadcast"));
    }

    #[test]
    fn test_report_j1939_lines() {
        let frames = vec![Frame::new(0x18FEDF00, 0, &[])];
        let snapshot = AnalyticsEngine::compute(&frames, 0x18FEDF00).unwrap();
        let root = build_report(&snapshot, NumberBase::Hex);

        assert_eq!(root.text, "ID: 0x18FEDF00");
        assert_eq!(root.children[0].text, "Broadcast Frame");
        assert_eq!(root.children[2].text, "PGN: 0xFEDF(65247)");
    }
}
