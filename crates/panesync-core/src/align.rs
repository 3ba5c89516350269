//! Alignment between the rendered diff and both source texts
//!
//! Every change unit becomes one [`AlignmentEntry`] holding its half-open
//! range in the rendered result and in each source text it appears in.
//! Offsets count `char`s; line ranges are tracked for line-based
//! granularities only.

use crate::change::{line_count, ChangeKind, ChangeList};
use crate::patch;
use crate::position::LineStarts;
use crate::tokenize::Granularity;
use serde::Serialize;
use std::ops::Range;

/// Which source text a position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Old,
    New,
}

/// How the rendered diff is currently presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// Linear text rendering of the change list
    #[default]
    Text,
    /// Tree rendering (JSON structured view)
    Structured,
}

/// Line-index ranges of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRanges {
    pub result: Range<usize>,
    pub old: Option<Range<usize>>,
    pub new: Option<Range<usize>>,
}

/// One change unit placed in all three texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentEntry {
    /// Index of the unit in the change list
    pub index: usize,
    pub kind: ChangeKind,
    pub result: Range<usize>,
    pub old: Option<Range<usize>>,
    pub new: Option<Range<usize>>,
    pub lines: Option<LineRanges>,
}

impl AlignmentEntry {
    /// Char range in the given source, if the unit appears there
    pub fn source(&self, side: Side) -> Option<&Range<usize>> {
        match side {
            Side::Old => self.old.as_ref(),
            Side::New => self.new.as_ref(),
        }
    }

    /// Line range in the given source, if tracked and present
    pub fn source_lines(&self, side: Side) -> Option<&Range<usize>> {
        let lines = self.lines.as_ref()?;
        match side {
            Side::Old => lines.old.as_ref(),
            Side::New => lines.new.as_ref(),
        }
    }

    /// Source line matching `result_line`, clamped into this entry
    pub fn line_in(&self, side: Side, result_line: usize) -> Option<usize> {
        let lines = self.lines.as_ref()?;
        let source = self.source_lines(side)?;
        Some(offset_into(&lines.result, source, result_line))
    }

    /// Result line matching a source line, clamped into this entry
    pub fn result_line_for(&self, side: Side, source_line: usize) -> Option<usize> {
        let lines = self.lines.as_ref()?;
        let source = self.source_lines(side)?;
        Some(offset_into(source, &lines.result, source_line))
    }
}

/// Map `pos` from `from` onto the same relative offset in `to`
fn offset_into(from: &Range<usize>, to: &Range<usize>, pos: usize) -> usize {
    let relative = pos.saturating_sub(from.start);
    let span = to.end.saturating_sub(to.start);
    to.start + relative.min(span.saturating_sub(1))
}

/// Source lines for one rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineTarget {
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    pub kind: ChangeKind,
}

/// Dense lookup from rendered line index to source lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LineLookupTable {
    targets: Vec<LineTarget>,
}

impl LineLookupTable {
    fn from_entries(entries: &[AlignmentEntry]) -> Self {
        let mut targets = Vec::new();
        for entry in entries {
            let Some(lines) = &entry.lines else { continue };
            for (relative, _) in lines.result.clone().enumerate() {
                let at = |r: &Range<usize>| r.start + relative.min(r.len().saturating_sub(1));
                let old_line = lines.old.as_ref().map(at);
                let new_line = lines.new.as_ref().map(at);
                targets.push(LineTarget {
                    old_line,
                    new_line,
                    kind: entry.kind,
                });
            }
        }
        Self { targets }
    }

    pub fn get(&self, result_line: usize) -> Option<&LineTarget> {
        self.targets.get(result_line)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Char and line totals of one text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextExtent {
    pub chars: usize,
    pub lines: usize,
}

impl TextExtent {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            lines: line_count(text),
        }
    }
}

/// Alignment of one change list, rebuilt on each diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentTable {
    pub granularity: Granularity,
    pub entries: Vec<AlignmentEntry>,
    pub lines: Option<LineLookupTable>,
    pub old: TextExtent,
    pub new: TextExtent,
    pub result: TextExtent,
}

/// Builds [`AlignmentTable`]s from change lists
pub struct AlignmentBuilder;

impl AlignmentBuilder {
    /// Walk the change list once, placing each unit in all three texts.
    ///
    /// Returns `None` when the view is a structured JSON tree: there is no
    /// linear text to align against.
    pub fn build(
        changes: &ChangeList,
        old_text: &str,
        new_text: &str,
        granularity: Granularity,
        view: ViewKind,
    ) -> Option<AlignmentTable> {
        if granularity == Granularity::Json && view == ViewKind::Structured {
            return None;
        }

        let entries = if granularity == Granularity::Patch {
            patch_entries(changes, old_text, new_text)
        } else {
            text_entries(changes, granularity.is_line_based())
        };

        let result_lines = entries
            .last()
            .and_then(|e| e.lines.as_ref())
            .map_or(0, |l| l.result.end);
        let result_chars = entries.last().map_or(0, |e| e.result.end);
        let lines = granularity
            .is_line_based()
            .then(|| LineLookupTable::from_entries(&entries));
        let table = AlignmentTable {
            granularity,
            lines,
            old: TextExtent::of(old_text),
            new: TextExtent::of(new_text),
            result: TextExtent {
                chars: result_chars,
                lines: result_lines,
            },
            entries,
        };
        log::debug!(
            "alignment rebuilt: {} entries, {} result chars, granularity {}",
            table.entries.len(),
            table.result.chars,
            granularity
        );
        Some(table)
    }
}

/// Entries for a change list whose units are slices of the inputs
fn text_entries(changes: &ChangeList, line_mode: bool) -> Vec<AlignmentEntry> {
    let mut entries = Vec::with_capacity(changes.len());
    let (mut old_pos, mut new_pos, mut result_pos) = (0, 0, 0);
    let (mut old_line, mut new_line, mut result_line) = (0, 0, 0);

    for (index, unit) in changes.iter().enumerate() {
        let len = unit.char_len();
        let line_len = if line_mode { line_count(&unit.value) } else { 0 };

        let old = unit.kind.in_old().then(|| old_pos..old_pos + len);
        let new = unit.kind.in_new().then(|| new_pos..new_pos + len);
        let lines = line_mode.then(|| LineRanges {
            result: result_line..result_line + line_len,
            old: unit.kind.in_old().then(|| old_line..old_line + line_len),
            new: unit.kind.in_new().then(|| new_line..new_line + line_len),
        });

        entries.push(AlignmentEntry {
            index,
            kind: unit.kind,
            result: result_pos..result_pos + len,
            old,
            new,
            lines,
        });

        if unit.kind.in_old() {
            old_pos += len;
            old_line += line_len;
        }
        if unit.kind.in_new() {
            new_pos += len;
            new_line += line_len;
        }
        result_pos += len;
        result_line += line_len;
    }
    entries
}

/// Entries for a unified patch: units are patch lines, placed in the inputs
/// through the hunk headers
fn patch_entries(changes: &ChangeList, old_text: &str, new_text: &str) -> Vec<AlignmentEntry> {
    let old_starts = LineStarts::new(old_text);
    let new_starts = LineStarts::new(new_text);
    let (mut result_pos, mut result_line) = (0, 0);

    changes
        .iter()
        .zip(patch::source_lines(changes))
        .enumerate()
        .map(|(index, (unit, source))| {
            let len = unit.char_len();
            let line_len = line_count(&unit.value);
            let entry = AlignmentEntry {
                index,
                kind: unit.kind,
                result: result_pos..result_pos + len,
                old: source.old.as_ref().map(|r| old_starts.char_range(r)),
                new: source.new.as_ref().map(|r| new_starts.char_range(r)),
                lines: Some(LineRanges {
                    result: result_line..result_line + line_len,
                    old: source.old,
                    new: source.new,
                }),
            };
            result_pos += len;
            result_line += line_len;
            entry
        })
        .collect()
}

impl AlignmentTable {
    pub fn is_line_based(&self) -> bool {
        self.lines.is_some()
    }

    /// Entry whose result range contains `pos`, else the nearest by start
    pub fn entry_at_result_char(&self, pos: usize) -> Option<&AlignmentEntry> {
        let pos = pos.min(self.result.chars.saturating_sub(1));
        self.entries
            .iter()
            .find(|e| e.result.contains(&pos))
            .or_else(|| nearest_by_start(self.entries.iter().map(|e| (e, &e.result)), pos))
    }

    /// Entry whose result line range contains `line`, else the nearest
    pub fn entry_at_result_line(&self, line: usize) -> Option<&AlignmentEntry> {
        let ranges = self
            .entries
            .iter()
            .filter_map(|e| e.lines.as_ref().map(|l| (e, &l.result)));
        find_or_nearest_line(ranges, line)
    }

    /// Entry whose range in `side` contains `pos`, else the nearest by start
    pub fn entry_at_source_char(&self, side: Side, pos: usize) -> Option<&AlignmentEntry> {
        let extent = self.extent(side);
        let pos = pos.min(extent.chars.saturating_sub(1));
        let ranges = || self.entries.iter().filter_map(|e| e.source(side).map(|r| (e, r)));
        ranges()
            .find(|(_, r)| r.contains(&pos))
            .map(|(e, _)| e)
            .or_else(|| nearest_by_start(ranges(), pos))
    }

    /// Entry whose line range in `side` contains `line`, else the nearest
    pub fn entry_at_source_line(&self, side: Side, line: usize) -> Option<&AlignmentEntry> {
        let ranges = self
            .entries
            .iter()
            .filter_map(|e| e.source_lines(side).map(|r| (e, r)));
        find_or_nearest_line(ranges, line)
    }

    /// Source lines for a rendered line.
    ///
    /// Uses the lookup table when the line is in it; otherwise maps through
    /// the nearest entry with the relative line clamped into that entry.
    pub fn line_target(&self, result_line: usize) -> Option<LineTarget> {
        if let Some(target) = self.lines.as_ref().and_then(|t| t.get(result_line)) {
            return Some(*target);
        }
        let entry = self.entry_at_result_line(result_line)?;
        Some(LineTarget {
            old_line: entry.line_in(Side::Old, result_line),
            new_line: entry.line_in(Side::New, result_line),
            kind: entry.kind,
        })
    }

    pub fn extent(&self, side: Side) -> TextExtent {
        match side {
            Side::Old => self.old,
            Side::New => self.new,
        }
    }
}

fn nearest_by_start<'a>(
    ranges: impl Iterator<Item = (&'a AlignmentEntry, &'a Range<usize>)>,
    pos: usize,
) -> Option<&'a AlignmentEntry> {
    ranges
        .min_by_key(|(_, r)| r.start.abs_diff(pos))
        .map(|(e, _)| e)
}

fn find_or_nearest_line<'a>(
    ranges: impl Iterator<Item = (&'a AlignmentEntry, &'a Range<usize>)> + Clone,
    line: usize,
) -> Option<&'a AlignmentEntry> {
    if let Some((entry, _)) = ranges.clone().find(|(_, r)| r.contains(&line)) {
        return Some(entry);
    }
    ranges
        .min_by_key(|(_, r)| r.start.abs_diff(line).min(r.end.abs_diff(line)))
        .map(|(e, _)| e)
}
