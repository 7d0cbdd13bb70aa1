//! Per-identifier visibility filters
//!
//! Persisted as a line-oriented text table, one `<hex-id>,<T|F>` line per
//! identifier.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Identifier → visible map
///
/// Ordered so saved tables come out sorted by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    entries: BTreeMap<u32, bool>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `identifier` as visible if it has never been seen.
    ///
    /// Returns true when a new entry was created.
    pub fn observe(&mut self, identifier: u32) -> bool {
        match self.entries.entry(identifier) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(true);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Visibility of `identifier`; unknown identifiers are hidden
    pub fn is_visible(&self, identifier: u32) -> bool {
        self.entries.get(&identifier).copied().unwrap_or(false)
    }

    pub fn get(&self, identifier: u32) -> Option<bool> {
        self.entries.get(&identifier).copied()
    }

    /// Update an existing entry. Unknown identifiers are ignored.
    ///
    /// Returns true if the identifier was known.
    pub fn set(&mut self, identifier: u32, visible: bool) -> bool {
        match self.entries.get_mut(&identifier) {
            Some(entry) => {
                *entry = visible;
                true
            }
            None => false,
        }
    }

    pub fn set_all(&mut self, visible: bool) {
        for entry in self.entries.values_mut() {
            *entry = visible;
        }
    }

    pub fn insert(&mut self, identifier: u32, visible: bool) {
        self.entries.insert(identifier, visible);
    }

    pub fn contains(&self, identifier: u32) -> bool {
        self.entries.contains_key(&identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in ascending identifier order
    pub fn iter(&self) -> impl Iterator<Item = (u32, bool)> + '_ {
        self.entries.iter().map(|(id, visible)| (*id, *visible))
    }

    /// Parse a filter table. Malformed lines are skipped.
    pub fn read_from<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut filters = FilterSet::new();

        for (line_no, raw) in reader.split(b'\n').enumerate() {
            let raw = raw?;
            let parsed = std::str::from_utf8(&raw).ok().and_then(parse_line);
            match parsed {
                Some((identifier, visible)) => filters.insert(identifier, visible),
                None => {
                    if !raw.trim_ascii().is_empty() {
                        log::warn!(
                            "Skipping malformed filter line {}: {:?}",
                            line_no + 1,
                            String::from_utf8_lossy(&raw)
                        );
                    }
                }
            }
        }

        Ok(filters)
    }

    /// Write the filter table, one line per identifier
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for (identifier, visible) in self.iter() {
            writeln!(writer, "{:x},{}", identifier, if visible { 'T' } else { 'F' })?;
        }
        writer.flush()
    }
}

fn parse_line(line: &str) -> Option<(u32, bool)> {
    let line = line.trim();
    if line.len() < 3 {
        return None;
    }

    let (id_text, flag) = line.split_once(',')?;
    let id_text = id_text.trim();
    let id_text = id_text
        .strip_prefix("0x")
        .or_else(|| id_text.strip_prefix("0X"))
        .unwrap_or(id_text);
    let identifier = u32::from_str_radix(id_text, 16).ok()?;

    Some((identifier, flag.trim().eq_ignore_ascii_case("t")))
}
