//! Unified patch rendering for the patch granularity

use crate::change::{ChangeKind, ChangeList, ChangeUnit};
use imara_diff::{BasicLineDiffPrinter, Diff, InternedInput, UnifiedDiffConfig};
use std::ops::Range;

pub const DEFAULT_CONTEXT: usize = 3;

const SEPARATOR: &str = "===================================================================";

/// Render a unified patch of a computed line diff
pub(crate) fn unified_patch(
    old_name: &str,
    new_name: &str,
    input: &InternedInput<&str>,
    diff: &Diff,
    context: usize,
) -> String {
    let mut config = UnifiedDiffConfig::default();
    config.context_len(context as u32);
    let printer = BasicLineDiffPrinter(&input.interner);
    let hunks = diff.unified_diff(&printer, config, input);
    format!("{SEPARATOR}\n--- {old_name}\n+++ {new_name}\n{hunks}")
}

/// Turn patch text into change units, one per patch line: after the first
/// hunk header, `-` lines are removed and `+` lines are added.
pub fn patch_change_list(patch: &str) -> ChangeList {
    let mut past_hunk_header = false;
    let units = patch
        .split_inclusive('\n')
        .map(|line| {
            let kind = if line.starts_with("@@") {
                past_hunk_header = true;
                ChangeKind::Unchanged
            } else if past_hunk_header && line.starts_with('-') {
                ChangeKind::Removed
            } else if past_hunk_header && line.starts_with('+') {
                ChangeKind::Added
            } else {
                ChangeKind::Unchanged
            };
            ChangeUnit::new(kind, line, 1)
        })
        .collect();
    ChangeList::new(units)
}

/// Source lines a patch unit stands for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PatchLines {
    pub old: Option<Range<usize>>,
    pub new: Option<Range<usize>>,
}

/// Zero-based line index of each source, advanced while reading hunks
#[derive(Debug, Default)]
struct HunkCursor {
    old: usize,
    new: usize,
}

/// Place every unit of a patch change list in the old and new texts.
///
/// Line numbers come from the hunk headers: context lines advance both
/// sources, `-` lines the old one and `+` lines the new one. File headers,
/// hunk headers and `\` markers stand for no source text.
pub(crate) fn source_lines(changes: &ChangeList) -> Vec<PatchLines> {
    let mut cursor: Option<HunkCursor> = None;
    changes
        .iter()
        .map(|unit| {
            let mut lines = PatchLines::default();
            for line in unit.value.split_inclusive('\n') {
                if line.starts_with("@@") {
                    cursor = Some(parse_hunk_header(line).unwrap_or_default());
                    continue;
                }
                let Some(at) = cursor.as_mut() else { continue };
                let (in_old, in_new) = match line.as_bytes().first() {
                    Some(b' ') => (true, true),
                    Some(b'-') => (true, false),
                    Some(b'+') => (false, true),
                    _ => (false, false),
                };
                if in_old {
                    extend(&mut lines.old, at.old);
                    at.old += 1;
                }
                if in_new {
                    extend(&mut lines.new, at.new);
                    at.new += 1;
                }
            }
            lines
        })
        .collect()
}

fn extend(range: &mut Option<Range<usize>>, line: usize) {
    match range {
        Some(range) => range.end = line + 1,
        None => *range = Some(line..line + 1),
    }
}

/// Zero-based starts from `@@ -a,b +c,d @@`
fn parse_hunk_header(line: &str) -> Option<HunkCursor> {
    let mut fields = line.split_whitespace().skip(1);
    let start = |field: Option<&str>, marker: char| -> Option<usize> {
        let field = field?.strip_prefix(marker)?;
        let first = field.split(',').next()?;
        Some(first.parse::<usize>().ok()?.saturating_sub(1))
    };
    Some(HunkCursor {
        old: start(fields.next(), '-')?,
        new: start(fields.next(), '+')?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffEngine;
    use crate::tokenize::Granularity;

    fn patch(old: &str, new: &str, context: usize) -> String {
        DiffEngine::new()
            .with_granularity(Granularity::Patch)
            .with_patch_context(context)
            .diff(old, new)
            .unwrap()
            .unwrap()
            .result_text()
    }

    #[test]
    fn test_unified_patch_single_hunk() {
        let text = patch("a\nb\nc\n", "a\nB\nc\n", 3);
        let expected = "===================================================================\n\
                        --- a.txt\n\
                        +++ b.txt\n\
                        @@ -1,3 +1,3 @@\n \
                        a\n\
                        -b\n\
                        +B\n \
                        c\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_distant_hunks_split() {
        let without = |skip: [usize; 2]| -> String {
            (0..20)
                .filter(|i| !skip.contains(i))
                .map(|i| format!("{i}\n"))
                .collect()
        };
        let old = without([99, 99]);
        assert_eq!(patch(&old, &without([1, 15]), 2).matches("@@ -").count(), 2);
        assert_eq!(patch(&old, &without([1, 4]), 2).matches("@@ -").count(), 1);
    }

    #[test]
    fn test_identical_inputs_have_no_hunks() {
        let text = patch("same\n", "same\n", 3);
        assert!(!text.contains("@@"));
        assert!(text.ends_with("+++ b.txt\n"));
    }

    #[test]
    fn test_patch_change_list_ignores_file_headers() {
        let list = patch_change_list("--- a\n+++ b\n@@ -1 +1 @@\n-x\n+y\n");
        let kinds: Vec<_> = list.iter().map(|u| u.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Unchanged,
                ChangeKind::Unchanged,
                ChangeKind::Unchanged,
                ChangeKind::Removed,
                ChangeKind::Added
            ]
        );
        assert_eq!(list.stats(), (1, 1));
    }

    #[test]
    fn test_source_lines_follow_hunk_headers() {
        let list = patch_change_list(
            "--- a\n+++ b\n@@ -78,3 +78,4 @@\n line 77\n-line 78\n+line seventy-eight\n+extra\n line 79\n",
        );
        let lines = source_lines(&list);
        let placed: Vec<_> = lines.iter().map(|l| (l.old.clone(), l.new.clone())).collect();
        assert_eq!(
            placed,
            vec![
                (None, None),
                (None, None),
                (None, None),
                (Some(77..78), Some(77..78)),
                (Some(78..79), None),
                (None, Some(78..79)),
                (None, Some(79..80)),
                (Some(79..80), Some(80..81)),
            ]
        );
    }

    #[test]
    fn test_source_lines_of_merged_units() {
        let list = ChangeList::new(vec![
            ChangeUnit::unchanged("@@ -5,2 +5,2 @@\n a\n b\n"),
            ChangeUnit::removed("-c\n-d\n"),
        ]);
        let lines = source_lines(&list);
        assert_eq!(lines[0].old, Some(4..6));
        assert_eq!(lines[0].new, Some(4..6));
        assert_eq!(lines[1].old, Some(6..8));
        assert_eq!(lines[1].new, None);
    }

    #[test]
    fn test_empty_side_hunk_header() {
        // imara-diff prints one-based starts even for empty ranges
        let list = patch_change_list("@@ -1,0 +1,1 @@\n+x\n");
        assert_eq!(source_lines(&list)[1].new, Some(0..1));
    }
}
