//! Diff engine adapter: tokenizes both inputs and runs imara-diff over them

use crate::change::{ChangeKind, ChangeList, ChangeUnit};
use crate::json;
use crate::patch;
use crate::tokenize::{tokenize, Granularity};
use imara_diff::{Diff, InternedInput, TokenSource};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Invalid JSON in {side} input: {source}")]
    InvalidJson {
        side: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Diff algorithm handed to imara-diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Histogram,
    Myers,
    /// Myers without the heuristics that bound its runtime
    MyersMinimal,
}

impl From<DiffAlgorithm> for imara_diff::Algorithm {
    fn from(algorithm: DiffAlgorithm) -> Self {
        match algorithm {
            DiffAlgorithm::Histogram => imara_diff::Algorithm::Histogram,
            DiffAlgorithm::Myers => imara_diff::Algorithm::Myers,
            DiffAlgorithm::MyersMinimal => imara_diff::Algorithm::MyersMinimal,
        }
    }
}

/// A pair of token ranges that differ: `old` tokens were replaced by `new`
#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenHunk {
    pub old: Range<usize>,
    pub new: Range<usize>,
}

/// Pre-split tokens fed to the interner
struct Tokens<'a>(&'a [&'a str]);

impl<'a> TokenSource for Tokens<'a> {
    type Token = &'a str;
    type Tokenizer = std::iter::Copied<std::slice::Iter<'a, &'a str>>;

    fn tokenize(&self) -> Self::Tokenizer {
        self.0.iter().copied()
    }

    fn estimate_tokens(&self) -> u32 {
        self.0.len() as u32
    }
}

/// Computes change lists between two texts
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    granularity: Granularity,
    algorithm: DiffAlgorithm,
    /// Give up when more tokens than this were added plus removed
    max_edit_length: Option<usize>,
    /// Discard results that took longer than this to compute
    timeout: Option<Duration>,
    /// Context lines around patch hunks
    patch_context: usize,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self {
            patch_context: patch::DEFAULT_CONTEXT,
            ..Self::default()
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_algorithm(mut self, algorithm: DiffAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_max_edit_length(mut self, max: Option<usize>) -> Self {
        self.max_edit_length = max;
        self
    }

    /// Treat a diff that took longer than `timeout` as aborted.
    ///
    /// The elapsed time is checked once the engine returns; a slow diff
    /// still runs to completion, its result is just dropped. Use
    /// [`with_max_edit_length`](Self::with_max_edit_length) to bound the
    /// work itself.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_patch_context(mut self, lines: usize) -> Self {
        self.patch_context = lines;
        self
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Diff two texts at the configured granularity.
    ///
    /// Returns `Ok(None)` when an abort threshold was exceeded.
    pub fn diff(&self, old: &str, new: &str) -> Result<Option<ChangeList>, DiffError> {
        match self.granularity {
            Granularity::Json => {
                let old = json::canonicalize(old).map_err(|source| DiffError::InvalidJson {
                    side: "old",
                    source,
                })?;
                let new = json::canonicalize(new).map_err(|source| DiffError::InvalidJson {
                    side: "new",
                    source,
                })?;
                Ok(self.diff_tokens(&old, &new, Granularity::Json))
            }
            Granularity::Patch => {
                let old_lines = tokenize(old, Granularity::Line);
                let new_lines = tokenize(new, Granularity::Line);
                let Some((input, diff)) = self.compute(&old_lines, &new_lines, true) else {
                    return Ok(None);
                };
                let text =
                    patch::unified_patch("a.txt", "b.txt", &input, &diff, self.patch_context);
                Ok(Some(patch::patch_change_list(&text)))
            }
            granularity => Ok(self.diff_tokens(old, new, granularity)),
        }
    }

    fn diff_tokens(&self, old: &str, new: &str, granularity: Granularity) -> Option<ChangeList> {
        let old_tokens = tokenize(old, granularity);
        let new_tokens = tokenize(new, granularity);
        let line_tokens = matches!(granularity, Granularity::Line | Granularity::Json);
        let (_, diff) = self.compute(&old_tokens, &new_tokens, line_tokens)?;
        let hunks: Vec<TokenHunk> = diff
            .hunks()
            .map(|hunk| TokenHunk {
                old: hunk.before.start as usize..hunk.before.end as usize,
                new: hunk.after.start as usize..hunk.after.end as usize,
            })
            .collect();
        Some(build_change_list(&old_tokens, &new_tokens, &hunks))
    }

    /// Run the engine and apply the abort thresholds
    fn compute<'a>(
        &self,
        old: &'a [&'a str],
        new: &'a [&'a str],
        line_tokens: bool,
    ) -> Option<(InternedInput<&'a str>, Diff)> {
        let started = Instant::now();
        let input = InternedInput::new(Tokens(old), Tokens(new));
        let mut diff = Diff::compute(self.algorithm.into(), &input);
        if line_tokens {
            diff.postprocess_lines(&input);
        }

        if let Some(timeout) = self.timeout {
            let elapsed = started.elapsed();
            if elapsed > timeout {
                log::debug!("diff aborted after {elapsed:?} (timeout {timeout:?})");
                return None;
            }
        }

        let edit_length = (diff.count_additions() + diff.count_removals()) as usize;
        if let Some(max) = self.max_edit_length {
            if edit_length > max {
                log::debug!("diff aborted: edit length {edit_length} exceeds {max}");
                return None;
            }
        }

        Some((input, diff))
    }
}

/// Interleave common runs with the hunks, removals before additions
fn build_change_list(old: &[&str], new: &[&str], hunks: &[TokenHunk]) -> ChangeList {
    let mut list = ChangeList::default();
    let mut old_pos = 0;

    let run = |kind: ChangeKind, tokens: &[&str]| ChangeUnit::new(kind, tokens.concat(), tokens.len());

    for hunk in hunks {
        if hunk.old.start > old_pos {
            list.push(run(ChangeKind::Unchanged, &old[old_pos..hunk.old.start]));
        }
        if !hunk.old.is_empty() {
            list.push(run(ChangeKind::Removed, &old[hunk.old.clone()]));
        }
        if !hunk.new.is_empty() {
            list.push(run(ChangeKind::Added, &new[hunk.new.clone()]));
        }
        old_pos = hunk.old.end;
    }
    if old_pos < old.len() {
        list.push(run(ChangeKind::Unchanged, &old[old_pos..]));
    }
    list
}
