//! Lyrics Tag Access
//!
//! Reads and writes the single lyrics field of an audio file using the
//! `lofty` crate. Each supported container keeps lyrics somewhere different:
//!
//! | Container | Extension | Tag format      | Lyrics field |
//! |-----------|-----------|-----------------|--------------|
//! | MPEG      | `.mp3`    | ID3v2           | `USLT` frame |
//! | FLAC      | `.flac`   | Vorbis comments | `LYRICS`     |
//! | MP4       | `.m4a`    | iTunes ilst     | `©lyr` atom  |
//!
//! Files are parsed through their concrete `lofty` file types rather than the
//! generic tag model, so a write only touches the lyrics field and every other
//! frame, comment, atom and picture is written back as it was read.
//!
//! All operations are synchronous; async callers should run them inside
//! `tokio::task::spawn_blocking`.

use core_runtime::logging::strip_path;
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::flac::FlacFile;
use lofty::id3::v2::{Frame, FrameId, Id3v2Tag, UnsynchronizedTextFrame};
use lofty::mp4::{Atom, AtomData, AtomIdent, Ilst, Mp4File};
use lofty::mpeg::MpegFile;
use lofty::ogg::VorbisComments;
use lofty::TextEncoding;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{MetadataError, Result};

const USLT_FRAME_ID: &str = "USLT";
const VORBIS_LYRICS_KEY: &str = "LYRICS";
const MP4_LYRICS_ATOM: [u8; 4] = *b"\xa9lyr";
const DEFAULT_USLT_LANGUAGE: [u8; 3] = *b"chi";

/// Supported audio container kinds, fixed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioContainer {
    /// MP3 with ID3v2 tags
    Mpeg,
    /// FLAC with Vorbis comments
    Flac,
    /// M4A with an iTunes-style ilst
    Mp4,
}

impl AudioContainer {
    /// Lowercase extensions accepted by the cleaner.
    pub const SUPPORTED_EXTENSIONS: [&'static str; 3] = ["mp3", "flac", "m4a"];

    /// Matches an extension case-insensitively, with or without a leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        match extension.to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mpeg),
            "flac" => Some(Self::Flac),
            "m4a" => Some(Self::Mp4),
            _ => None,
        }
    }

    /// Determines the container from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::UnsupportedFormat` for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                MetadataError::UnsupportedFormat(format!(
                    "{} (supported: .mp3, .flac, .m4a)",
                    file_label(path)
                ))
            })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mpeg => "mp3",
            Self::Flac => "flac",
            Self::Mp4 => "m4a",
        }
    }

    /// Name of the field holding lyrics inside this container's tag.
    pub fn lyrics_field(&self) -> &'static str {
        match self {
            Self::Mpeg => USLT_FRAME_ID,
            Self::Flac => VORBIS_LYRICS_KEY,
            Self::Mp4 => "©lyr",
        }
    }
}

impl fmt::Display for AudioContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mpeg => f.write_str("MP3"),
            Self::Flac => f.write_str("FLAC"),
            Self::Mp4 => f.write_str("M4A"),
        }
    }
}

/// Whether the path has one of the supported audio extensions.
pub fn is_supported_audio_file(path: &Path) -> bool {
    AudioContainer::from_path(path).is_ok()
}

/// Read/write access to the lyrics field of audio files.
///
/// `Ok(None)` means the file is readable but carries no lyrics; errors are
/// reserved for unsupported, missing, unreadable or unwritable files.
pub trait LyricsStore: Send + Sync {
    fn read_lyrics(&self, path: &Path) -> Result<Option<String>>;

    /// Creates the lyrics field if absent, otherwise replaces its value.
    fn write_lyrics(&self, path: &Path, lyrics: &str) -> Result<()>;
}

/// `lofty`-backed [`LyricsStore`].
#[derive(Debug, Clone, Copy)]
pub struct TagAccessor {
    parse_options: ParseOptions,
    write_options: WriteOptions,
}

impl TagAccessor {
    pub fn new() -> Self {
        Self {
            // Audio properties are irrelevant here; pictures must still be
            // read so they survive a rewrite.
            parse_options: ParseOptions::new().read_properties(false),
            write_options: WriteOptions::default(),
        }
    }

    pub fn with_options(parse_options: ParseOptions, write_options: WriteOptions) -> Self {
        Self {
            parse_options,
            write_options,
        }
    }

    fn open<F: LyricsField>(&self, path: &Path) -> Result<F> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MetadataError::FileNotFound(file_label(path)),
            _ => MetadataError::ReadFailed(format!("{}: {}", file_label(path), e)),
        })?;

        F::read_from(&mut file, self.parse_options)
            .map_err(|e| MetadataError::ReadFailed(format!("{}: {}", file_label(path), e)))
    }

    fn read_with<F: LyricsField>(&self, path: &Path) -> Result<Option<String>> {
        let audio = self.open::<F>(path)?;
        Ok(audio.lyrics().filter(|text| !text.is_empty()))
    }

    fn write_with<F: LyricsField>(&self, path: &Path, lyrics: &str) -> Result<()> {
        let mut audio = self.open::<F>(path)?;
        audio.set_lyrics(lyrics);

        // lofty can panic on unusual block layouts instead of returning an error
        let saved = panic::catch_unwind(AssertUnwindSafe(|| {
            audio.save_to_path(path, self.write_options)
        }));
        match saved {
            Ok(result) => result
                .map_err(|e| MetadataError::WriteFailed(format!("{}: {}", file_label(path), e))),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(file = %file_label(path), reason = %reason, "Tag writer panicked");
                Err(MetadataError::WriteFailed(format!(
                    "{}: tag writer failed: {}",
                    file_label(path),
                    reason
                )))
            }
        }
    }
}

impl Default for TagAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl LyricsStore for TagAccessor {
    fn read_lyrics(&self, path: &Path) -> Result<Option<String>> {
        let container = AudioContainer::from_path(path)?;
        let lyrics = match container {
            AudioContainer::Mpeg => self.read_with::<MpegFile>(path)?,
            AudioContainer::Flac => self.read_with::<FlacFile>(path)?,
            AudioContainer::Mp4 => self.read_with::<Mp4File>(path)?,
        };

        debug!(
            file = %file_label(path),
            container = %container,
            has_lyrics = lyrics.is_some(),
            "Read lyrics field"
        );
        Ok(lyrics)
    }

    fn write_lyrics(&self, path: &Path, lyrics: &str) -> Result<()> {
        let container = AudioContainer::from_path(path)?;
        match container {
            AudioContainer::Mpeg => self.write_with::<MpegFile>(path, lyrics)?,
            AudioContainer::Flac => self.write_with::<FlacFile>(path, lyrics)?,
            AudioContainer::Mp4 => self.write_with::<Mp4File>(path, lyrics)?,
        }

        debug!(
            file = %file_label(path),
            container = %container,
            bytes = lyrics.len(),
            "Wrote lyrics field"
        );
        Ok(())
    }
}

/// Per-container access to the lyrics field of a parsed file.
trait LyricsField: AudioFile {
    fn lyrics(&self) -> Option<String>;
    fn set_lyrics(&mut self, lyrics: &str);
}

impl LyricsField for MpegFile {
    fn lyrics(&self) -> Option<String> {
        self.id3v2()?
            .unsync_text()
            .next()
            .map(|frame| frame.content.clone())
    }

    fn set_lyrics(&mut self, lyrics: &str) {
        if self.id3v2().is_none() {
            self.set_id3v2(Id3v2Tag::default());
        }
        if let Some(tag) = self.id3v2_mut() {
            replace_uslt(tag, lyrics);
        }
    }
}

/// Replaces the first `USLT` frame, keeping its language and description.
/// Additional `USLT` frames (other languages) are kept after it.
fn replace_uslt(tag: &mut Id3v2Tag, lyrics: &str) {
    let existing: Vec<Frame<'static>> = tag
        .remove(&FrameId::Valid(Cow::Borrowed(USLT_FRAME_ID)))
        .collect();

    let mut others = existing.into_iter().filter_map(|frame| match frame {
        Frame::UnsynchronizedText(uslt) => Some(uslt),
        _ => None,
    });

    let (language, description) = match others.next() {
        Some(primary) => (primary.language, primary.description),
        None => (DEFAULT_USLT_LANGUAGE, String::new()),
    };

    let rest: Vec<_> = others
        .filter(|frame| frame.language != language || frame.description != description)
        .collect();

    tag.insert(Frame::UnsynchronizedText(UnsynchronizedTextFrame::new(
        TextEncoding::UTF8,
        language,
        description,
        lyrics.to_string(),
    )));
    for frame in rest {
        tag.insert(Frame::UnsynchronizedText(frame));
    }
}

impl LyricsField for FlacFile {
    fn lyrics(&self) -> Option<String> {
        self.vorbis_comments()?
            .get(VORBIS_LYRICS_KEY)
            .map(str::to_string)
    }

    fn set_lyrics(&mut self, lyrics: &str) {
        if self.vorbis_comments().is_none() {
            self.set_vorbis_comments(VorbisComments::default());
        }
        if let Some(comments) = self.vorbis_comments_mut() {
            comments.insert(VORBIS_LYRICS_KEY.to_string(), lyrics.to_string());
        }
    }
}

impl LyricsField for Mp4File {
    fn lyrics(&self) -> Option<String> {
        let atom = self.ilst()?.get(&AtomIdent::Fourcc(MP4_LYRICS_ATOM))?;
        atom.data().find_map(|data| match data {
            AtomData::UTF8(text) => Some(text.clone()),
            _ => None,
        })
    }

    fn set_lyrics(&mut self, lyrics: &str) {
        if self.ilst().is_none() {
            self.set_ilst(Ilst::default());
        }
        if let Some(ilst) = self.ilst_mut() {
            ilst.replace_atom(Atom::new(
                AtomIdent::Fourcc(MP4_LYRICS_ATOM),
                AtomData::UTF8(lyrics.to_string()),
            ));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn file_label(path: &Path) -> String {
    strip_path(&path.to_string_lossy()).to_string()
}
