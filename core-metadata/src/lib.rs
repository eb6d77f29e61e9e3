//! # Metadata & Lyrics Module
//!
//! Reads, cleans and writes the embedded lyrics of audio files.
//!
//! ## Overview
//!
//! This module handles:
//! - Header line classification for synchronized (LRC style) lyrics
//! - Lyrics sanitizing that keeps line order and line-break convention
//! - Lyrics tag access for ID3v2 (MP3), Vorbis comments (FLAC) and MP4 ilst (M4A)
//! - Collision-safe backups taken before a file is modified

pub mod backup;
pub mod error;
pub mod lyrics;
pub mod tags;

pub use backup::BackupManager;
pub use error::{MetadataError, Result};
pub use lyrics::{
    is_header_line, HeaderKeywords, LineKind, LyricLine, LyricsBlock, LyricsSanitizer,
    SanitizedLyrics, DEFAULT_HEADER_KEYWORDS,
};
pub use tags::{is_supported_audio_file, AudioContainer, LyricsStore, TagAccessor};
