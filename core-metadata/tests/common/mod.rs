//! Synthetic audio files small enough to build in memory.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, joint stereo, no padding.
const MP3_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
const MP3_FRAME_LEN: usize = 417;

/// A run of silent MPEG frames with no tags at all.
pub fn minimal_mp3() -> Vec<u8> {
    let mut data = Vec::with_capacity(MP3_FRAME_LEN * 8);
    for _ in 0..8 {
        data.extend_from_slice(&MP3_FRAME_HEADER);
        data.resize(data.len() + MP3_FRAME_LEN - MP3_FRAME_HEADER.len(), 0);
    }
    data
}

const FLAC_STREAMINFO: u8 = 0x00;
const FLAC_PADDING: u8 = 0x01;
const FLAC_LAST_BLOCK: u8 = 0x80;

/// STREAMINFO body: 44.1 kHz, stereo, 16 bit, no samples.
fn flac_streaminfo() -> Vec<u8> {
    let mut body = Vec::with_capacity(34);
    // min/max block size 4096
    body.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
    // min/max frame size unknown
    body.extend_from_slice(&[0x00; 6]);
    // sample rate 44100, 2 channels, 16 bits per sample, 0 total samples
    body.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
    // MD5 signature
    body.extend_from_slice(&[0x00; 16]);
    body
}

/// A FLAC stream with STREAMINFO followed by a 16 byte PADDING block and no
/// audio frames.
pub fn minimal_flac() -> Vec<u8> {
    let mut data = b"fLaC".to_vec();
    data.extend_from_slice(&[FLAC_STREAMINFO, 0x00, 0x00, 0x22]);
    data.extend_from_slice(&flac_streaminfo());
    data.extend_from_slice(&[FLAC_LAST_BLOCK | FLAC_PADDING, 0x00, 0x00, 0x10]);
    data.extend_from_slice(&[0x00; 16]);
    data
}

/// A FLAC stream whose only metadata block is STREAMINFO.
pub fn streaminfo_only_flac() -> Vec<u8> {
    let mut data = b"fLaC".to_vec();
    data.extend_from_slice(&[FLAC_LAST_BLOCK | FLAC_STREAMINFO, 0x00, 0x00, 0x22]);
    data.extend_from_slice(&flac_streaminfo());
    data
}

fn mp4_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut data = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(kind);
    data.extend_from_slice(body);
    data
}

/// An M4A with `ftyp`, a `moov` holding only `mvhd`, and an empty-ish `mdat`.
pub fn minimal_m4a() -> Vec<u8> {
    let mut ftyp = b"M4A ".to_vec();
    ftyp.extend_from_slice(&[0x00; 4]);
    ftyp.extend_from_slice(b"M4A isom");

    // version 0 mvhd body, 100 bytes
    let mut mvhd = vec![0x00; 4]; // version, flags
    mvhd.extend_from_slice(&[0x00; 8]); // creation, modification time
    mvhd.extend_from_slice(&1000u32.to_be_bytes()); // timescale
    mvhd.extend_from_slice(&0u32.to_be_bytes()); // duration
    mvhd.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    mvhd.extend_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    mvhd.extend_from_slice(&[0x00; 10]); // reserved
    for value in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
        mvhd.extend_from_slice(&value.to_be_bytes()); // unity matrix
    }
    mvhd.extend_from_slice(&[0x00; 24]); // pre-defined
    mvhd.extend_from_slice(&1u32.to_be_bytes()); // next track id

    let mut data = mp4_box(b"ftyp", &ftyp);
    data.extend_from_slice(&mp4_box(b"moov", &mp4_box(b"mvhd", &mvhd)));
    data.extend_from_slice(&mp4_box(b"mdat", &[0x00; 8]));
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
