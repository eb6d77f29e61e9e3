//! Shared fixtures: synthetic audio and lyric blocks.
#![allow(dead_code)]

use core_metadata::{LyricsStore, TagAccessor};
use std::fs;
use std::path::{Path, PathBuf};

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, joint stereo, no padding.
const MP3_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
const MP3_FRAME_LEN: usize = 417;

/// Ten timed lines, two of them credits.
pub const TEN_LINES_TWO_HEADERS: &str = "[00:00.00]作词：张三\n\
[00:01.00]作曲：李四\n\
[00:12.00]第一句\n\
[00:15.00]第二句\n\
[00:18.00]第三句\n\
[00:21.00]第四句\n\
[00:24.00]第五句\n\
[00:27.00]第六句\n\
[00:30.00]第七句\n\
[00:33.00]第八句";

pub const TEN_LINES_CLEANED: &str = "[00:12.00]第一句\n\
[00:15.00]第二句\n\
[00:18.00]第三句\n\
[00:21.00]第四句\n\
[00:24.00]第五句\n\
[00:27.00]第六句\n\
[00:30.00]第七句\n\
[00:33.00]第八句";

pub const HEADER_FREE: &str = "[00:01.00]hello\n[00:02.00]world";

/// A run of silent MPEG frames with no tags at all.
pub fn minimal_mp3() -> Vec<u8> {
    let mut data = Vec::with_capacity(MP3_FRAME_LEN * 8);
    for _ in 0..8 {
        data.extend_from_slice(&MP3_FRAME_HEADER);
        data.resize(data.len() + MP3_FRAME_LEN - MP3_FRAME_HEADER.len(), 0);
    }
    data
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Writes a synthetic MP3 at `dir/name`, tagged with `lyrics` if given.
pub fn write_mp3(dir: &Path, name: &str, lyrics: Option<&str>) -> PathBuf {
    let path = write_file(dir, name, &minimal_mp3());
    if let Some(lyrics) = lyrics {
        TagAccessor::new().write_lyrics(&path, lyrics).unwrap();
    }
    path
}

/// Bytes of a synthetic MP3 carrying `lyrics`.
pub fn mp3_bytes_with_lyrics(lyrics: &str) -> Vec<u8> {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_mp3(dir.path(), "fixture.mp3", Some(lyrics));
    fs::read(path).unwrap()
}

pub fn read_lyrics(path: &Path) -> Option<String> {
    TagAccessor::new().read_lyrics(path).unwrap()
}
