//! Splitting input text into diff tokens

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;

/// Token unit the diff operates over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Char,
    Word,
    #[default]
    Line,
    Sentence,
    /// Canonicalized JSON, diffed line by line
    Json,
    /// Unified patch lines
    Patch,
}

impl Granularity {
    pub const ALL: [Granularity; 6] = [
        Granularity::Char,
        Granularity::Word,
        Granularity::Line,
        Granularity::Sentence,
        Granularity::Json,
        Granularity::Patch,
    ];

    /// Whether alignment tracks line ranges
    pub fn is_line_based(self) -> bool {
        matches!(self, Granularity::Line | Granularity::Patch)
    }

    pub fn name(self) -> &'static str {
        match self {
            Granularity::Char => "char",
            Granularity::Word => "word",
            Granularity::Line => "line",
            Granularity::Sentence => "sentence",
            Granularity::Json => "json",
            Granularity::Patch => "patch",
        }
    }

    /// Next granularity in display order, wrapping around
    pub fn cycle(self) -> Self {
        let idx = Self::ALL.iter().position(|&g| g == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "char" | "chars" | "character" => Ok(Granularity::Char),
            "word" | "words" => Ok(Granularity::Word),
            "line" | "lines" => Ok(Granularity::Line),
            "sentence" | "sentences" => Ok(Granularity::Sentence),
            "json" => Ok(Granularity::Json),
            "patch" => Ok(Granularity::Patch),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

/// Split `text` into tokens whose concatenation is `text`.
///
/// `Json` and `Patch` tokenize by line; their inputs are rewritten
/// before tokenizing.
pub fn tokenize(text: &str, granularity: Granularity) -> Vec<&str> {
    match granularity {
        Granularity::Char => text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect(),
        Granularity::Word => text.split_word_bounds().collect(),
        Granularity::Line | Granularity::Json | Granularity::Patch => {
            text.split_inclusive('\n').collect()
        }
        Granularity::Sentence => text.split_sentence_bounds().collect(),
    }
}
