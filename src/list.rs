//! File-list view state: the select-all tri-state and the per-column sort
//! cycle. Presentational state machines with no UI dependency.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::{FieldValue, TagRecord};

/// Rendered state of the select-all checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Selection over a record list, keyed by an identifier field.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    id_key: String,
    selected: HashSet<String>,
}

impl Selection {
    pub fn new(id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
            selected: HashSet::new(),
        }
    }

    fn record_id<'a>(&self, record: &'a TagRecord) -> Option<&'a str> {
        record.get(&self.id_key).and_then(FieldValue::as_text)
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Empty selection is unchecked, full is checked, anything in between
    /// is indeterminate. Only ids present in `records` are counted.
    pub fn state(&self, records: &[TagRecord]) -> SelectAllState {
        let selected = records
            .iter()
            .filter(|r| self.record_id(r).is_some_and(|id| self.is_selected(id)))
            .count();
        if selected == 0 {
            SelectAllState::Unchecked
        } else if selected == records.len() {
            SelectAllState::Checked
        } else {
            SelectAllState::Indeterminate
        }
    }

    /// Select-all click: from a full selection clears everything, from any
    /// other state selects every record.
    pub fn toggle_all(&mut self, records: &[TagRecord]) {
        if self.state(records) == SelectAllState::Checked {
            self.clear();
        } else {
            for record in records {
                if let Some(id) = self.record_id(record) {
                    self.selected.insert(id.to_string());
                }
            }
        }
    }

    /// Selected records, in record-list order.
    pub fn materialize<'a>(&self, records: &'a [TagRecord]) -> Vec<&'a TagRecord> {
        records
            .iter()
            .filter(|r| self.record_id(r).is_some_and(|id| self.is_selected(id)))
            .collect()
    }
}

/// Per-column sort cycle: none → ascending → descending → none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    key: Option<String>,
    descending: bool,
}

impl SortState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: Option<String>, descending: bool) -> Self {
        Self { key, descending }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    /// A header click on `key`. Clicking the active column advances the
    /// cycle; clicking a different column restarts it at ascending.
    pub fn cycle(&mut self, key: &str) {
        match (self.key.as_deref(), self.descending) {
            (Some(active), false) if active == key => self.descending = true,
            (Some(active), true) if active == key => {
                self.key = None;
                self.descending = false;
            }
            _ => {
                self.key = Some(key.to_string());
                self.descending = false;
            }
        }
    }

    /// Records arranged under the current sort. With no active column the
    /// original order is returned; otherwise a stable sort on the column
    /// key, so equal keys preserve original order in both directions.
    pub fn arrange(&self, records: &[TagRecord]) -> Vec<TagRecord> {
        let mut out = records.to_vec();
        if let Some(key) = self.key.as_deref() {
            if self.descending {
                out.sort_by(|a, b| compare_field(b.get(key), a.get(key)));
            } else {
                out.sort_by(|a, b| compare_field(a.get(key), b.get(key)));
            }
        }
        out
    }
}

/// Default ordering over field values: numeric for numbers, lexicographic
/// for text. Mixed or structured values fall back to their text rendering,
/// with missing values sorting first.
fn compare_field(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    match (a, b) {
        (Some(FieldValue::Number(x)), Some(FieldValue::Number(y))) => x.total_cmp(y),
        (Some(FieldValue::Text(x)), Some(FieldValue::Text(y))) => x.cmp(y),
        _ => sort_text(a).cmp(&sort_text(b)),
    }
}

fn sort_text(value: Option<&FieldValue>) -> String {
    value.and_then(FieldValue::display_text).unwrap_or_default()
}
