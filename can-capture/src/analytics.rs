//! Per-identifier statistics
//!
//! [`AnalyticsEngine::compute`] scans a frame sequence for one identifier and
//! builds a fresh [`FrameSnapshot`]: payload length range, per-byte value
//! statistics, bit histograms, inter-frame interval statistics and, for
//! extended identifiers, the J1939 sub-fields. Nothing is cached between
//! queries.

use crate::j1939::J1939Id;
use crate::types::{Frame, MAX_PAYLOAD};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of buckets of the interval histogram
pub const INTERVAL_HISTOGRAM_BUCKETS: u64 = 20;

/// Number of bit slots (8 bytes × 8 bits)
pub const BIT_SLOTS: usize = MAX_PAYLOAD * 8;

/// Statistics for one payload byte position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ByteStats {
    pub min: u8,
    pub max: u8,
    /// Frames long enough to carry this byte
    pub samples: u32,
    /// Bits that differed from the first frame at least once
    pub changed_bits: u8,
    /// Occurrences of each value, indexed by value
    pub histogram: Vec<u32>,
}

impl ByteStats {
    fn new() -> Self {
        Self {
            min: u8::MAX,
            max: u8::MIN,
            samples: 0,
            changed_bits: 0,
            histogram: vec![0; 256],
        }
    }

    fn record(&mut self, value: u8, reference: u8) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.samples += 1;
        self.changed_bits |= value ^ reference;
        self.histogram[value as usize] += 1;
    }
}

/// One bar of the interval histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramBucket {
    /// Largest interval counted in this bucket
    pub upper_bound: u64,
    pub count: usize,
}

/// Inter-frame interval statistics, in capture clock units
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntervalStats {
    pub count: usize,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub percentile_5: u64,
    pub percentile_95: u64,
    pub histogram: Vec<HistogramBucket>,
}

impl IntervalStats {
    /// Build statistics from unsorted intervals
    pub fn from_intervals(mut intervals: Vec<u64>) -> Self {
        if intervals.is_empty() {
            return Self::default();
        }

        intervals.sort_unstable();
        let count = intervals.len();
        let min = intervals[0];
        let max = intervals[count - 1];

        let sum: u128 = intervals.iter().map(|&v| v as u128).sum();
        let mean = sum as f64 / count as f64;
        let variance = intervals
            .iter()
            .map(|&v| {
                let deviation = v as f64 - mean;
                deviation * deviation
            })
            .sum::<f64>()
            / count as f64;

        Self {
            count,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            percentile_5: intervals[count * 5 / 100],
            percentile_95: intervals[count * 95 / 100],
            histogram: cumulative_histogram(&intervals, min, max),
        }
    }

    /// Width of the range holding the middle 90% of intervals
    pub fn spread_90(&self) -> u64 {
        self.percentile_95 - self.percentile_5
    }

    /// Difference between the longest and shortest interval
    pub fn variation(&self) -> u64 {
        self.max - self.min
    }
}

/// Bucket the sorted intervals against bounds stepping down from `max`.
///
/// Bucket `l` (0..=20) ends at `max - (20 - l) * width` with
/// `width = ceil((max - min) / 20)`; a cursor walks the sorted intervals so
/// each one lands in the first bucket whose bound covers it. Bounds below
/// zero clamp to zero.
///
/// The width rounds up rather than truncating, so the lowest bound never
/// exceeds `min`.
fn cumulative_histogram(sorted: &[u64], min: u64, max: u64) -> Vec<HistogramBucket> {
    let width = (max - min).div_ceil(INTERVAL_HISTOGRAM_BUCKETS);
    let mut buckets = Vec::with_capacity(INTERVAL_HISTOGRAM_BUCKETS as usize + 1);
    let mut cursor = 0;

    for l in 0..=INTERVAL_HISTOGRAM_BUCKETS {
        let upper_bound = max.saturating_sub((INTERVAL_HISTOGRAM_BUCKETS - l) * width);
        let start = cursor;
        while cursor < sorted.len() && sorted[cursor] <= upper_bound {
            cursor += 1;
        }
        buckets.push(HistogramBucket {
            upper_bound,
            count: cursor - start,
        });
    }

    buckets
}

/// Raw per-frame data for plotting consumers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameSeries {
    pub timestamps: Vec<u64>,
    pub payloads: Vec<Vec<u8>>,
}

impl FrameSeries {
    /// `(frame index, value)` pairs for byte `position`, skipping frames too
    /// short to carry it
    pub fn byte_series(&self, position: usize) -> Vec<(usize, u8)> {
        self.payloads
            .iter()
            .enumerate()
            .filter_map(|(index, payload)| payload.get(position).map(|&value| (index, value)))
            .collect()
    }
}

/// Everything known about one identifier at query time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub identifier: u32,
    pub extended: bool,
    pub frame_count: usize,
    pub min_length: u8,
    pub max_length: u8,
    /// One entry per byte position up to the longest payload
    pub bytes: Vec<ByteStats>,
    /// Per bit (`byte * 8 + bit`): frames where the bit differs from frame 0
    pub bit_toggle_histogram: Vec<u32>,
    /// Per bit: frames where the bit is set
    pub bit_set_histogram: Vec<u32>,
    pub intervals: IntervalStats,
    /// Present when the frames use extended identifiers
    pub j1939: Option<J1939Id>,
    pub series: FrameSeries,
}

/// Stateless statistics calculator
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    /// Statistics for `identifier` over `frames`, or `None` if no frame
    /// carries it.
    ///
    /// Intervals are absolute differences of consecutive timestamps, so a
    /// single local inversion is tolerated but unsorted input is not
    /// detected.
    pub fn compute(frames: &[Frame], identifier: u32) -> Option<FrameSnapshot> {
        let matching: Vec<&Frame> = frames
            .iter()
            .filter(|frame| frame.identifier == identifier)
            .collect();

        let first = matching.first()?;
        let reference = first.payload;

        let mut min_length = u8::MAX;
        let mut max_length = u8::MIN;
        let mut bytes: Vec<ByteStats> = Vec::new();
        let mut bit_toggle_histogram = vec![0u32; BIT_SLOTS];
        let mut bit_set_histogram = vec![0u32; BIT_SLOTS];
        let mut intervals = Vec::with_capacity(matching.len().saturating_sub(1));
        let mut series = FrameSeries::default();

        for (index, frame) in matching.iter().enumerate() {
            if index > 0 {
                intervals.push(frame.timestamp.abs_diff(matching[index - 1].timestamp));
            }

            min_length = min_length.min(frame.length);
            max_length = max_length.max(frame.length);

            let data = frame.data();
            while bytes.len() < data.len() {
                bytes.push(ByteStats::new());
            }

            for (position, &value) in data.iter().enumerate() {
                bytes[position].record(value, reference[position]);

                let toggled = value ^ reference[position];
                for bit in 0..8 {
                    let slot = position * 8 + bit;
                    if toggled & (1 << bit) != 0 {
                        bit_toggle_histogram[slot] += 1;
                    }
                    if value & (1 << bit) != 0 {
                        bit_set_histogram[slot] += 1;
                    }
                }
            }

            series.timestamps.push(frame.timestamp);
            series.payloads.push(data.to_vec());
        }

        log::debug!(
            "Computed statistics for 0x{:X} over {} frames",
            identifier,
            matching.len()
        );

        Some(FrameSnapshot {
            identifier,
            extended: first.extended,
            frame_count: matching.len(),
            min_length,
            max_length,
            bytes,
            bit_toggle_histogram,
            bit_set_histogram,
            intervals: IntervalStats::from_intervals(intervals),
            j1939: first.extended.then(|| J1939Id::decode(identifier)),
            series,
        })
    }
}

/// Split `frames` into per-identifier sequences, preserving order
pub fn group_by_identifier(frames: &[Frame]) -> BTreeMap<u32, Vec<Frame>> {
    let mut groups: BTreeMap<u32, Vec<Frame>> = BTreeMap::new();
    for frame in frames {
        groups.entry(frame.identifier).or_default().push(*frame);
    }
    groups
}
