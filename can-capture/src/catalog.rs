//! Identifier catalog
//!
//! Incrementally maintained set of identifiers seen so far, so identifier
//! pickers never have to rescan the whole history.

use crate::types::Frame;
use std::collections::BTreeMap;

/// Sorted set of seen identifiers with the extended flag of their first sighting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierCatalog {
    seen: BTreeMap<u32, bool>,
}

impl IdentifierCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame's identifier. Returns true if it was not known yet.
    pub fn observe(&mut self, frame: &Frame) -> bool {
        if self.seen.contains_key(&frame.identifier) {
            return false;
        }
        self.seen.insert(frame.identifier, frame.extended);
        true
    }

    /// Record the last `count` frames of `frames`, returning how many
    /// identifiers were new.
    ///
    /// A `count` larger than the sequence is clamped.
    pub fn observe_tail(&mut self, frames: &[Frame], count: usize) -> usize {
        let start = frames.len().saturating_sub(count);
        frames[start..]
            .iter()
            .filter(|frame| self.observe(frame))
            .count()
    }

    /// Discard everything and rescan `frames`
    pub fn rebuild(&mut self, frames: &[Frame]) {
        self.seen.clear();
        for frame in frames {
            self.observe(frame);
        }
    }

    pub fn contains(&self, identifier: u32) -> bool {
        self.seen.contains_key(&identifier)
    }

    /// Extended flag recorded at first sighting
    pub fn is_extended(&self, identifier: u32) -> Option<bool> {
        self.seen.get(&identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Identifiers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.seen.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_counts_each_identifier_once() {
        let mut catalog = IdentifierCatalog::new();
        let frame = Frame::new(0x200, 0, &[]);

        assert!(catalog.observe(&frame));
        assert!(!catalog.observe(&frame));
        assert!(!catalog.observe(&frame));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_observe_tail_only_scans_new_frames() {
        let frames = vec![
            Frame::new(0x300, 0, &[]),
            Frame::new(0x100, 1, &[]),
            Frame::new(0x200, 2, &[]),
        ];
        let mut catalog = IdentifierCatalog::new();

        assert_eq!(catalog.observe_tail(&frames, 2), 2);
        assert!(!catalog.contains(0x300));
        assert_eq!(catalog.observe_tail(&frames, 10), 1);
        assert_eq!(catalog.iter().collect::<Vec<_>>(), vec![0x100, 0x200, 0x300]);
    }

    #[test]
    fn test_extended_flag_from_first_sighting() {
        let mut catalog = IdentifierCatalog::new();
        catalog.observe(&Frame::new(0x99, 0, &[]));
        catalog.rebuild(&[
            Frame::new(0x10, 0, &[]).with_extended(true),
            Frame::new(0x10, 1, &[]).with_extended(false),
        ]);
        assert_eq!(catalog.is_extended(0x10), Some(true));
        assert_eq!(catalog.is_extended(0x11), None);
        assert!(!catalog.contains(0x99));
    }
}
