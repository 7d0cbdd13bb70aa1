//! Frame store
//!
//! Owns the append-only capture history, the filtered subsequence shown to
//! viewers, the per-identifier filter table and the identifier catalog.
//!
//! # Complexity
//!
//! - append-mode ingest: O(1) amortized
//! - dedup-mode ingest: O(1), via a first-slot index keyed by identifier
//! - `compact_duplicates`: O(n)
//! - any filter change: O(n) rebuild of the filtered view
//! - `frame_index_at_or_before`: O(n) forward scan
//!
//! # Notifications
//!
//! Structural mutations (clear, compaction, filter rebuilds, time
//! normalization, dedup replacement) are bracketed by
//! [`StoreEvent::ResetBegin`] / [`StoreEvent::ResetEnd`]. Row indices held by
//! a consumer are invalid across that bracket. Appends are reported as
//! [`StoreEvent::RowsAppended`] and never move existing rows.

use crate::catalog::IdentifierCatalog;
use crate::config::{IngestMode, StoreConfig};
use crate::filters::FilterSet;
use crate::types::{Frame, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Change notification emitted by a [`FrameStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// A structural change is about to happen; drop cached row indices
    ResetBegin,
    /// The structural change is complete; re-read the views
    ResetEnd,
    /// `count` rows were appended to the filtered view starting at `first`
    RowsAppended { first: usize, count: usize },
    /// The set of known identifiers or their visibility changed
    FiltersChanged,
}

/// Receiver of [`StoreEvent`]s
///
/// Observers are called while the store is being mutated and must not call
/// back into it.
pub trait StoreObserver: Send + Sync {
    fn on_store_event(&self, event: &StoreEvent);
}

/// The capture store
pub struct FrameStore {
    history: Vec<Frame>,
    filtered: Vec<Frame>,
    filters: FilterSet,
    catalog: IdentifierCatalog,
    time_offset: u64,
    mode: IngestMode,

    /// First slot of each identifier in `history`
    history_slots: HashMap<u32, usize>,
    /// First slot of each identifier in `filtered`
    filtered_slots: HashMap<u32, usize>,

    /// Number of filtered rows already announced to observers
    reported_rows: usize,
    filters_changed: bool,

    observers: Vec<Arc<dyn StoreObserver>>,
}

impl FrameStore {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Create an empty store, pre-sized according to `config`
    pub fn with_config(config: &StoreConfig) -> Self {
        Self {
            history: Vec::with_capacity(config.capacity_hint),
            filtered: Vec::with_capacity(config.capacity_hint),
            filters: FilterSet::new(),
            catalog: IdentifierCatalog::new(),
            time_offset: 0,
            mode: config.ingest_mode,
            history_slots: HashMap::new(),
            filtered_slots: HashMap::new(),
            reported_rows: 0,
            filters_changed: false,
            observers: Vec::new(),
        }
    }

    /// Register an observer for store events
    pub fn add_observer(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    fn emit(&self, event: StoreEvent) {
        for observer in &self.observers {
            observer.on_store_event(&event);
        }
    }

    pub fn ingest_mode(&self) -> IngestMode {
        self.mode
    }

    /// Switch the ingest policy. Existing rows are untouched; call
    /// [`FrameStore::compact_duplicates`] to fold duplicates after enabling
    /// dedup mode.
    pub fn set_ingest_mode(&mut self, mode: IngestMode) {
        if self.mode != mode {
            log::debug!("Ingest mode changed to {:?}", mode);
            self.mode = mode;
        }
    }

    /// Ingest one frame.
    ///
    /// The frame is rebased by the current time offset. With `notify`, an
    /// append is announced as one row and a dedup replacement as a reset
    /// bracket.
    pub fn ingest(&mut self, frame: Frame, notify: bool) {
        let (frame, is_new) = self.admit(frame);
        let identifier = frame.identifier;

        if self.mode == IngestMode::Dedup {
            if let Some(&slot) = self.history_slots.get(&identifier) {
                if notify {
                    self.emit(StoreEvent::ResetBegin);
                }
                self.history[slot] = frame;
                if self.filters.is_visible(identifier) {
                    if let Some(&filtered_slot) = self.filtered_slots.get(&identifier) {
                        self.filtered[filtered_slot] = frame;
                    }
                }
                if notify {
                    self.emit(StoreEvent::ResetEnd);
                }
                return;
            }
        }

        self.append(frame, notify);

        if notify && is_new {
            self.emit(StoreEvent::FiltersChanged);
        }
    }

    /// Append-mode ingestion of a whole batch without per-frame events.
    ///
    /// Dedup mode is not applied here. Follow with
    /// [`FrameStore::flush_appended_rows`] to announce the new rows.
    pub fn ingest_batch(&mut self, frames: &[Frame]) {
        let known = self.filters.len();

        for frame in frames {
            let mut frame = *frame;
            frame.timestamp = frame.timestamp.saturating_sub(self.time_offset);
            if self.filters.observe(frame.identifier) {
                self.filters_changed = true;
            }
            self.append(frame, false);
        }

        let new_ids = self.catalog.observe_tail(&self.history, frames.len());
        log::trace!(
            "Batch ingested {} frames, {} new identifiers",
            frames.len(),
            new_ids
        );

        if self.filters.len() != known {
            self.emit(StoreEvent::FiltersChanged);
        }
    }

    /// Rebase a frame and register its identifier. The flag is true for a
    /// first sighting.
    fn admit(&mut self, mut frame: Frame) -> (Frame, bool) {
        frame.timestamp = frame.timestamp.saturating_sub(self.time_offset);
        let is_new = self.filters.observe(frame.identifier);
        if is_new {
            self.filters_changed = true;
        }
        self.catalog.observe(&frame);
        (frame, is_new)
    }

    fn append(&mut self, frame: Frame, notify: bool) {
        let identifier = frame.identifier;

        self.history_slots
            .entry(identifier)
            .or_insert(self.history.len());
        self.history.push(frame);

        if self.filters.is_visible(identifier) {
            let first = self.filtered.len();
            self.filtered_slots.entry(identifier).or_insert(first);
            self.filtered.push(frame);

            if notify {
                self.emit(StoreEvent::RowsAppended { first, count: 1 });
                self.reported_rows = self.filtered.len();
            }
        }
    }

    /// Announce rows appended since the last announcement as one event.
    ///
    /// In dedup mode rows may have been replaced in place, so the filtered
    /// view is rebuilt instead. Returns the number of rows announced.
    pub fn flush_appended_rows(&mut self) -> usize {
        if self.mode == IngestMode::Dedup {
            self.rebuild_filtered_view();
            return 0;
        }

        let total = self.filtered.len();
        if total <= self.reported_rows {
            self.reported_rows = total;
            return 0;
        }

        let first = self.reported_rows;
        let count = total - first;
        self.reported_rows = total;
        self.emit(StoreEvent::RowsAppended { first, count });
        count
    }

    /// Fold the history down to one frame per identifier.
    ///
    /// Each identifier keeps its latest frame, stored in the slot of its
    /// first occurrence. Only acts in dedup mode.
    pub fn compact_duplicates(&mut self) {
        if self.mode != IngestMode::Dedup {
            return;
        }

        self.emit(StoreEvent::ResetBegin);

        let before = self.history.len();
        let mut slots: HashMap<u32, usize> = HashMap::with_capacity(self.catalog.len());
        let mut write = 0;

        for read in 0..self.history.len() {
            let frame = self.history[read];
            match slots.get(&frame.identifier) {
                Some(&slot) => self.history[slot] = frame,
                None => {
                    slots.insert(frame.identifier, write);
                    self.history[write] = frame;
                    write += 1;
                }
            }
        }

        self.history.truncate(write);
        self.history_slots = slots;
        self.catalog.rebuild(&self.history);
        self.refilter();

        log::debug!("Compacted history from {} to {} frames", before, write);
        self.emit(StoreEvent::ResetEnd);
    }

    /// Rebase every stored timestamp so the first history frame sits at 0.
    ///
    /// The offset is remembered and subtracted from every later ingest.
    /// Intended to be called once per capture session.
    pub fn normalize_time(&mut self) {
        let Some(offset) = self.history.first().map(|frame| frame.timestamp) else {
            return;
        };

        self.emit(StoreEvent::ResetBegin);
        for frame in self.history.iter_mut().chain(self.filtered.iter_mut()) {
            frame.timestamp = frame.timestamp.saturating_sub(offset);
        }
        self.time_offset = self.time_offset.saturating_add(offset);
        log::info!("Normalized capture time, offset now {} us", self.time_offset);
        self.emit(StoreEvent::ResetEnd);
    }

    pub fn time_offset(&self) -> u64 {
        self.time_offset
    }

    /// Change one identifier's visibility and rebuild the filtered view.
    ///
    /// Unknown identifiers are ignored.
    pub fn set_filter_visible(&mut self, identifier: u32, visible: bool) {
        if self.filters.set(identifier, visible) {
            self.rebuild_filtered_view();
            self.emit(StoreEvent::FiltersChanged);
        }
    }

    /// Change every known identifier's visibility and rebuild
    pub fn set_all_filters_visible(&mut self, visible: bool) {
        self.filters.set_all(visible);
        self.rebuild_filtered_view();
        self.emit(StoreEvent::FiltersChanged);
    }

    /// Recompute the filtered view from the history and the filters
    pub fn rebuild_filtered_view(&mut self) {
        self.emit(StoreEvent::ResetBegin);
        self.refilter();
        log::debug!(
            "Rebuilt filtered view: {} of {} frames visible",
            self.filtered.len(),
            self.history.len()
        );
        self.emit(StoreEvent::ResetEnd);
    }

    fn refilter(&mut self) {
        self.filtered.clear();
        self.filtered_slots.clear();

        for frame in &self.history {
            if self.filters.is_visible(frame.identifier) {
                self.filtered_slots
                    .entry(frame.identifier)
                    .or_insert(self.filtered.len());
                self.filtered.push(*frame);
            }
        }

        self.reported_rows = self.filtered.len();
    }

    /// Drop all frames, filters and catalog entries
    pub fn clear(&mut self) {
        self.emit(StoreEvent::ResetBegin);
        self.history.clear();
        self.filtered.clear();
        self.filters.clear();
        self.catalog.clear();
        self.history_slots.clear();
        self.filtered_slots.clear();
        self.reported_rows = 0;
        self.filters_changed = false;
        self.emit(StoreEvent::ResetEnd);
        self.emit(StoreEvent::FiltersChanged);
        log::info!("Capture store cleared");
    }

    /// Replace the filter table with one read from `reader` and rebuild.
    ///
    /// The whole table is parsed before anything changes, so a read error
    /// leaves the store untouched. Identifiers already captured but absent
    /// from the table become hidden.
    pub fn load_filters<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut loaded = FilterSet::read_from(reader)?;

        for identifier in self.catalog.iter() {
            if !loaded.contains(identifier) {
                loaded.insert(identifier, false);
            }
        }

        log::info!("Loaded {} filter entries", loaded.len());
        self.filters = loaded;
        self.rebuild_filtered_view();
        self.emit(StoreEvent::FiltersChanged);
        Ok(())
    }

    /// Write the filter table to `writer`
    pub fn save_filters<W: Write>(&self, writer: W) -> Result<()> {
        self.filters.write_to(writer)?;
        Ok(())
    }

    /// Load a filter table from a file
    pub fn load_filter_file(&mut self, path: &Path) -> Result<()> {
        log::info!("Loading filter file: {:?}", path);
        let file = File::open(path)?;
        self.load_filters(BufReader::new(file))
    }

    /// Save the filter table to a file
    pub fn save_filter_file(&self, path: &Path) -> Result<()> {
        log::info!("Saving filter file: {:?}", path);
        let file = File::create(path)?;
        self.save_filters(BufWriter::new(file))
    }

    /// Returns and resets the "new identifier seen" flag
    pub fn take_filters_changed(&mut self) -> bool {
        std::mem::take(&mut self.filters_changed)
    }

    /// Index of the last `identifier` frame at or before `timestamp`.
    ///
    /// Scans forward and stops at the first frame of that identifier past
    /// the query, so frames of one identifier must be in timestamp order.
    pub fn frame_index_at_or_before(&self, identifier: u32, timestamp: u64) -> Option<usize> {
        let mut best = None;
        for (index, frame) in self.history.iter().enumerate() {
            if frame.identifier != identifier {
                continue;
            }
            if frame.timestamp <= timestamp {
                best = Some(index);
            } else {
                break;
            }
        }
        best
    }

    /// [`FrameStore::frame_index_at_or_before`] with the query in seconds
    pub fn frame_index_at_or_before_secs(&self, identifier: u32, seconds: f64) -> Option<usize> {
        self.frame_index_at_or_before(identifier, (seconds * 1_000_000.0) as u64)
    }

    /// Copy of the ordered history frames carrying `identifier`
    pub fn frames_for(&self, identifier: u32) -> Vec<Frame> {
        self.history
            .iter()
            .filter(|frame| frame.identifier == identifier)
            .copied()
            .collect()
    }

    pub fn history(&self) -> &[Frame] {
        &self.history
    }

    pub fn filtered(&self) -> &[Frame] {
        &self.filtered
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn catalog(&self) -> &IdentifierCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<StoreEvent>>,
    }

    impl StoreObserver for Recorder {
        fn on_store_event(&self, event: &StoreEvent) {
            self.events.lock().unwrap().push(*event);
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<StoreEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    fn frame(id: u32, ts: u64, byte: u8) -> Frame {
        Frame::new(id, ts, &[byte])
    }

    fn ids(frames: &[Frame]) -> Vec<u32> {
        frames.iter().map(|f| f.identifier).collect()
    }

    #[test]
    fn test_append_mode_keeps_every_frame() {
        let mut store = FrameStore::new();
        store.ingest(frame(0x100, 1, 0), false);
        store.ingest(frame(0x200, 2, 0), false);
        store.ingest(frame(0x100, 3, 0), false);

        assert_eq!(store.len(), 3);
        assert_eq!(ids(store.filtered()), vec![0x100, 0x200, 0x100]);
        assert_eq!(store.filters().get(0x200), Some(true));
        assert!(store.take_filters_changed());
        assert!(!store.take_filters_changed());
    }

    #[test]
    fn test_hidden_identifier_not_appended_to_filtered() {
        let mut store = FrameStore::new();
        store.ingest(frame(0x100, 1, 0), false);
        store.set_filter_visible(0x100, false);
        store.ingest(frame(0x100, 2, 0), false);
        store.ingest(frame(0x200, 3, 0), false);

        assert_eq!(store.len(), 3);
        assert_eq!(ids(store.filtered()), vec![0x200]);
    }

    #[test]
    fn test_dedup_mode_replaces_in_place() {
        let mut store = FrameStore::with_config(
            &StoreConfig::new().with_ingest_mode(IngestMode::Dedup),
        );
        store.ingest(frame(0x100, 1, 1), false);
        store.ingest(frame(0x200, 2, 2), false);
        store.ingest(frame(0x100, 3, 3), false);

        assert_eq!(ids(store.history()), vec![0x100, 0x200]);
        assert_eq!(store.history()[0].payload[0], 3);
        assert_eq!(store.filtered()[0].timestamp, 3);
    }

    #[test]
    fn test_dedup_replacement_of_hidden_identifier_leaves_filtered() {
        let mut store = FrameStore::new();
        store.set_ingest_mode(IngestMode::Dedup);
        store.ingest(frame(0x100, 1, 1), false);
        store.ingest(frame(0x200, 2, 2), false);
        store.set_filter_visible(0x200, false);
        store.ingest(frame(0x200, 5, 9), false);

        assert_eq!(store.history()[1].payload[0], 9);
        assert_eq!(ids(store.filtered()), vec![0x100]);
    }

    #[test]
    fn test_compact_keeps_latest_in_first_slot() {
        let mut store = FrameStore::new();
        for (id, ts) in [(0xA, 1), (0xB, 2), (0xA, 3), (0xC, 4), (0xB, 5), (0xA, 6)] {
            store.ingest(frame(id, ts, ts as u8), false);
        }

        store.compact_duplicates();
        assert_eq!(store.len(), 6, "append mode must not compact");

        store.set_ingest_mode(IngestMode::Dedup);
        store.compact_duplicates();

        assert_eq!(ids(store.history()), vec![0xA, 0xB, 0xC]);
        let stamps: Vec<u64> = store.history().iter().map(|f| f.timestamp).collect();
        assert_eq!(stamps, vec![6, 5, 4]);
        assert_eq!(store.filtered(), store.history());

        store.compact_duplicates();
        assert_eq!(ids(store.history()), vec![0xA, 0xB, 0xC]);
    }

    #[test]
    fn test_compact_empty_store() {
        let mut store = FrameStore::new();
        store.set_ingest_mode(IngestMode::Dedup);
        store.compact_duplicates();
        assert!(store.is_empty());
    }

    #[test]
    fn test_normalize_time_rebases_everything() {
        let mut store = FrameStore::new();
        store.ingest(frame(0x1, 1_000, 0), false);
        store.ingest(frame(0x2, 1_250, 0), false);

        store.normalize_time();
        assert_eq!(store.time_offset(), 1_000);
        assert_eq!(store.history()[0].timestamp, 0);
        assert_eq!(store.history()[1].timestamp, 250);
        assert_eq!(store.filtered()[1].timestamp, 250);

        store.ingest(frame(0x1, 2_000, 0), false);
        store.ingest_batch(&[frame(0x3, 3_000, 0)]);
        assert_eq!(store.history()[2].timestamp, 1_000);
        assert_eq!(store.history()[3].timestamp, 2_000);
    }

    #[test]
    fn test_normalize_time_empty_is_noop() {
        let mut store = FrameStore::new();
        store.normalize_time();
        assert_eq!(store.time_offset(), 0);
    }

    #[test]
    fn test_index_at_or_before() {
        let mut store = FrameStore::new();
        store.ingest(frame(0x1, 100, 0), false);
        store.ingest(frame(0x2, 150, 0), false);
        store.ingest(frame(0x1, 200, 0), false);
        store.ingest(frame(0x1, 300, 0), false);

        assert_eq!(store.frame_index_at_or_before(0x1, 50), None);
        assert_eq!(store.frame_index_at_or_before(0x1, 250), Some(2));
        assert_eq!(store.frame_index_at_or_before(0x1, 1_000), Some(3));
        assert_eq!(store.frame_index_at_or_before(0x2, 1_000), Some(1));
        assert_eq!(store.frame_index_at_or_before(0x3, 1_000), None);
        assert_eq!(store.frame_index_at_or_before_secs(0x1, 0.00025), Some(2));
    }

    #[test]
    fn test_notifications() {
        let recorder = Arc::new(Recorder::default());
        let mut store = FrameStore::new();
        store.add_observer(recorder.clone());

        store.ingest(frame(0x1, 1, 0), true);
        assert_eq!(
            recorder.take(),
            vec![
                StoreEvent::RowsAppended { first: 0, count: 1 },
                StoreEvent::FiltersChanged,
            ]
        );

        store.ingest_batch(&[frame(0x1, 2, 0), frame(0x2, 3, 0)]);
        assert_eq!(recorder.take(), vec![StoreEvent::FiltersChanged]);

        assert_eq!(store.flush_appended_rows(), 2);
        assert_eq!(
            recorder.take(),
            vec![StoreEvent::RowsAppended { first: 1, count: 2 }]
        );
        assert_eq!(store.flush_appended_rows(), 0);

        store.set_all_filters_visible(false);
        assert_eq!(
            recorder.take(),
            vec![
                StoreEvent::ResetBegin,
                StoreEvent::ResetEnd,
                StoreEvent::FiltersChanged,
            ]
        );
    }

    #[test]
    fn test_dedup_replace_notifies_reset() {
        let recorder = Arc::new(Recorder::default());
        let mut store = FrameStore::new();
        store.set_ingest_mode(IngestMode::Dedup);
        store.ingest(frame(0x1, 1, 0), false);
        store.add_observer(recorder.clone());

        store.ingest(frame(0x1, 2, 0), true);
        assert_eq!(
            recorder.take(),
            vec![StoreEvent::ResetBegin, StoreEvent::ResetEnd]
        );
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = FrameStore::new();
        store.ingest(frame(0x1, 1, 0), false);
        store.clear();

        assert!(store.is_empty());
        assert!(store.filtered().is_empty());
        assert!(store.filters().is_empty());
        assert!(store.catalog().is_empty());
        assert_eq!(store.flush_appended_rows(), 0);
    }

    #[test]
    fn test_load_filters_replaces_table() {
        let mut store = FrameStore::new();
        store.ingest(frame(0x10, 1, 0), false);
        store.ingest(frame(0x20, 2, 0), false);
        store.ingest(frame(0x30, 3, 0), false);

        store.load_filters("10,T\n20,F\n99,T\n".as_bytes()).unwrap();

        assert_eq!(ids(store.filtered()), vec![0x10]);
        assert_eq!(store.filters().get(0x30), Some(false));
        assert_eq!(store.filters().get(0x99), Some(true));
    }

    #[test]
    fn test_load_missing_file_leaves_state() {
        let mut store = FrameStore::new();
        store.ingest(frame(0x10, 1, 0), false);

        let result = store.load_filter_file(Path::new("/nonexistent/dir/filters.txt"));
        assert!(result.is_err());
        assert_eq!(store.filters().get(0x10), Some(true));
        assert_eq!(store.filtered_len(), 1);
    }
}
