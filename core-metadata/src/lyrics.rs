//! # Lyrics Sanitizing Module
//!
//! Separates sung lyric lines from informational header lines (credits such as
//! lyricist, composer, mixing engineer) inside a synchronized lyrics block.
//!
//! ## Classification rule
//!
//! A line is a header line only when both hold:
//! 1. it starts with a `[minutes:seconds.fraction]` timestamp, and
//! 2. the text after that timestamp, trimmed, starts with a header keyword
//!    (exact prefix, case-sensitive).
//!
//! Untimed lines are always kept, even when they look like credits. Plain
//! (unsynchronized) lyrics therefore pass through untouched.
//!
//! ## Usage
//!
//! ```rust
//! use core_metadata::lyrics::LyricsSanitizer;
//!
//! let sanitizer = LyricsSanitizer::new();
//! let result = sanitizer.sanitize("[00:00.00]作词：张三\n[00:12.34]我爱你");
//!
//! assert_eq!(result.cleaned, "[00:12.34]我爱你");
//! assert_eq!(result.removed_lines, vec!["[00:00.00]作词：张三".to_string()]);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Credit labels recognized as header content by default.
pub const DEFAULT_HEADER_KEYWORDS: &[&str] = &[
    "作词",
    "作曲",
    "编曲",
    "演唱",
    "制作",
    "作品",
    "提供",
    "制作人",
    "Produced by",
    "和声",
    "配唱",
    "录音",
    "录音师",
    "混音",
    "混音师",
    "母带",
    "母带工程师",
    "文案",
    "制片",
    "监制",
    "OP",
    "SP",
    "发行",
    "出品",
    "出品人",
    "策划",
    "统筹",
    "推广",
    "鸣谢",
    "詞：",
];

static TIMESTAMP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\d+:\d+\.\d+\]").expect("timestamp pattern is valid"));

static DEFAULT_SANITIZER: Lazy<LyricsSanitizer> = Lazy::new(LyricsSanitizer::new);

// =============================================================================
// Lines and blocks
// =============================================================================

/// One line of a lyrics block, borrowed from the raw tag text.
///
/// A trailing `\r` (CRLF input) stays part of the raw line so the block can be
/// rebuilt byte-for-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LyricLine<'a> {
    raw: &'a str,
}

impl<'a> LyricLine<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// The line exactly as it appeared in the block.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The leading `[mm:ss.xx]` marker, if any.
    pub fn timestamp(&self) -> Option<&'a str> {
        TIMESTAMP_PREFIX.find(self.raw).map(|m| m.as_str())
    }

    pub fn has_timestamp(&self) -> bool {
        self.timestamp().is_some()
    }

    /// Text following the timestamp marker, trimmed. `None` for untimed lines.
    pub fn content_after_timestamp(&self) -> Option<&'a str> {
        let raw = self.raw;
        self.timestamp().map(|marker| raw[marker.len()..].trim())
    }
}

/// Ordered lines of a lyrics block, in playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsBlock<'a> {
    lines: Vec<LyricLine<'a>>,
}

impl<'a> LyricsBlock<'a> {
    /// Splits raw tag text on `\n`.
    pub fn parse(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').map(LyricLine::new).collect(),
        }
    }

    pub fn lines(&self) -> &[LyricLine<'a>] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Joins lines back with `\n`.
    pub fn join<'b, I>(lines: I) -> String
    where
        I: IntoIterator<Item = &'b LyricLine<'a>>,
        'a: 'b,
    {
        lines
            .into_iter()
            .map(LyricLine::raw)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Keywords and classification
// =============================================================================

/// Set of header keywords matched as exact, case-sensitive prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderKeywords {
    keywords: Vec<String>,
}

impl HeaderKeywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the first keyword that `content` starts with.
    pub fn matching(&self, content: &str) -> Option<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|keyword| content.starts_with(keyword))
    }
}

impl Default for HeaderKeywords {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_KEYWORDS.iter().copied())
    }
}

/// Classification of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Timed credit/metadata line, removed by sanitizing
    Header,
    /// Everything else, kept
    Lyric,
}

/// Classifies a line with the default keyword list.
pub fn is_header_line(line: &str) -> bool {
    DEFAULT_SANITIZER.classify(line) == LineKind::Header
}

// =============================================================================
// Sanitizer
// =============================================================================

/// Result of sanitizing one lyrics block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedLyrics {
    /// Kept lines joined with the input's line-break convention
    pub cleaned: String,
    /// Removed header lines in original order
    pub removed_lines: Vec<String>,
}

impl SanitizedLyrics {
    pub fn removed_count(&self) -> usize {
        self.removed_lines.len()
    }

    pub fn has_changes(&self) -> bool {
        !self.removed_lines.is_empty()
    }
}

/// Removes header lines from lyrics blocks.
#[derive(Debug, Clone, Default)]
pub struct LyricsSanitizer {
    keywords: HeaderKeywords,
}

impl LyricsSanitizer {
    /// Sanitizer using [`DEFAULT_HEADER_KEYWORDS`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords(keywords: HeaderKeywords) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &HeaderKeywords {
        &self.keywords
    }

    pub fn classify(&self, line: &str) -> LineKind {
        self.classify_line(&LyricLine::new(line))
    }

    fn classify_line(&self, line: &LyricLine<'_>) -> LineKind {
        match line.content_after_timestamp() {
            Some(content) if self.keywords.matching(content).is_some() => LineKind::Header,
            _ => LineKind::Lyric,
        }
    }

    /// Splits `raw` into lines, drops header lines and rejoins the rest.
    ///
    /// Empty input yields an empty result. The operation is idempotent:
    /// sanitizing the cleaned text again removes nothing.
    pub fn sanitize(&self, raw: &str) -> SanitizedLyrics {
        if raw.is_empty() {
            return SanitizedLyrics::default();
        }

        let block = LyricsBlock::parse(raw);
        let (headers, kept): (Vec<_>, Vec<_>) = block
            .lines()
            .iter()
            .partition(|line| self.classify_line(line) == LineKind::Header);

        SanitizedLyrics {
            cleaned: LyricsBlock::join(kept),
            removed_lines: headers
                .into_iter()
                .map(|line| line.raw().to_string())
                .collect(),
        }
    }
}
