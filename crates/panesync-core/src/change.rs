//! Change units produced by the diff engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChangeListError {
    #[error("Failed to parse change list: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Change unit {0} is flagged both added and removed")]
    AmbiguousUnit(usize),
}

/// What a change unit does to the old text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    #[default]
    Unchanged,
    Added,
    Removed,
}

impl ChangeKind {
    /// True if the unit's text appears in the old input
    pub fn in_old(self) -> bool {
        !matches!(self, ChangeKind::Added)
    }

    /// True if the unit's text appears in the new input
    pub fn in_new(self) -> bool {
        !matches!(self, ChangeKind::Removed)
    }
}

/// A span of tokens that is common, added or removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeUnit {
    pub kind: ChangeKind,
    pub value: String,
    /// Number of tokens (chars, words, lines...) the unit covers
    pub count: usize,
}

impl ChangeUnit {
    pub fn new(kind: ChangeKind, value: impl Into<String>, count: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            count,
        }
    }

    pub fn unchanged(value: impl Into<String>) -> Self {
        Self::counted(ChangeKind::Unchanged, value)
    }

    pub fn added(value: impl Into<String>) -> Self {
        Self::counted(ChangeKind::Added, value)
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self::counted(ChangeKind::Removed, value)
    }

    /// Build a unit whose count is its number of lines
    fn counted(kind: ChangeKind, value: impl Into<String>) -> Self {
        let value = value.into();
        let count = line_count(&value);
        Self { kind, value, count }
    }

    /// Length of the value in chars
    pub fn char_len(&self) -> usize {
        self.value.chars().count()
    }
}

/// Lines spanned by a piece of text: one per newline, or one for a
/// non-empty fragment without a newline.
pub fn line_count(value: &str) -> usize {
    let newlines = value.bytes().filter(|&b| b == b'\n').count();
    if newlines > 0 {
        newlines
    } else if value.is_empty() {
        0
    } else {
        1
    }
}

/// Ordered sequence of change units
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeList {
    units: Vec<ChangeUnit>,
}

impl ChangeList {
    pub fn new(units: Vec<ChangeUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[ChangeUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeUnit> {
        self.units.iter()
    }

    /// Append a unit, merging it into the previous one when the kinds match
    pub fn push(&mut self, unit: ChangeUnit) {
        if unit.value.is_empty() {
            return;
        }
        match self.units.last_mut() {
            Some(last) if last.kind == unit.kind => {
                last.value.push_str(&unit.value);
                last.count += unit.count;
            }
            _ => self.units.push(unit),
        }
    }

    /// Swap each added unit that directly precedes a removed one, in a
    /// single forward sweep, so a replacement reads removal first
    pub fn removals_first(&mut self) {
        for idx in 1..self.units.len() {
            if self.units[idx - 1].kind == ChangeKind::Added
                && self.units[idx].kind == ChangeKind::Removed
            {
                self.units.swap(idx - 1, idx);
            }
        }
    }

    /// Reconstruct the old input (every unit that is not added)
    pub fn old_text(&self) -> String {
        self.collect(ChangeKind::in_old)
    }

    /// Reconstruct the new input (every unit that is not removed)
    pub fn new_text(&self) -> String {
        self.collect(ChangeKind::in_new)
    }

    /// Text of the rendered diff: removed text still renders
    pub fn result_text(&self) -> String {
        self.collect(|_| true)
    }

    /// Added and removed token counts
    pub fn stats(&self) -> (usize, usize) {
        self.units.iter().fold((0, 0), |(ins, del), u| match u.kind {
            ChangeKind::Added => (ins + u.count, del),
            ChangeKind::Removed => (ins, del + u.count),
            ChangeKind::Unchanged => (ins, del),
        })
    }

    fn collect(&self, keep: impl Fn(ChangeKind) -> bool) -> String {
        self.units
            .iter()
            .filter(|u| keep(u.kind))
            .map(|u| u.value.as_str())
            .collect()
    }

    /// Parse a jsdiff-style change list:
    /// `[{"value": "...", "added": true, "removed": false, "count": 1}, ...]`
    ///
    /// Units are reordered with [`ChangeList::removals_first`].
    pub fn from_json(json: &str) -> Result<Self, ChangeListError> {
        let raw: Vec<RawChange> = serde_json::from_str(json)?;
        let units = raw
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| raw.into_unit(idx))
            .collect::<Result<Vec<_>, _>>()?;
        let mut list = Self { units };
        list.removals_first();
        Ok(list)
    }

    /// Serialize in the jsdiff shape accepted by [`ChangeList::from_json`]
    pub fn to_json(&self) -> Result<String, ChangeListError> {
        let raw: Vec<RawChange> = self.units.iter().map(RawChange::from).collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}

impl<'a> IntoIterator for &'a ChangeList {
    type Item = &'a ChangeUnit;
    type IntoIter = std::slice::Iter<'a, ChangeUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

impl FromIterator<ChangeUnit> for ChangeList {
    fn from_iter<I: IntoIterator<Item = ChangeUnit>>(iter: I) -> Self {
        let mut list = ChangeList::default();
        for unit in iter {
            list.push(unit);
        }
        list
    }
}

/// Loosely typed wire shape with the added/removed flag pair
#[derive(Debug, Serialize, Deserialize)]
struct RawChange {
    #[serde(default)]
    value: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    added: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    removed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
}

impl RawChange {
    fn into_unit(self, idx: usize) -> Result<ChangeUnit, ChangeListError> {
        let kind = match (self.added, self.removed) {
            (true, true) => return Err(ChangeListError::AmbiguousUnit(idx)),
            (true, false) => ChangeKind::Added,
            (false, true) => ChangeKind::Removed,
            (false, false) => ChangeKind::Unchanged,
        };
        let count = self.count.unwrap_or_else(|| line_count(&self.value));
        Ok(ChangeUnit {
            kind,
            value: self.value,
            count,
        })
    }
}

impl From<&ChangeUnit> for RawChange {
    fn from(unit: &ChangeUnit) -> Self {
        Self {
            value: unit.value.clone(),
            added: unit.kind == ChangeKind::Added,
            removed: unit.kind == ChangeKind::Removed,
            count: Some(unit.count),
        }
    }
}
