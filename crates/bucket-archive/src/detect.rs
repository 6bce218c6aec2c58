//! Content classification from magic bytes.
//!
//! Filenames and declared content types are advisory only and never
//! consulted here; dispatch is driven entirely by a peeked signature window.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::codec;
use crate::error::Result;

/// Single-stream compression codecs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

/// Directory container formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    Zip,
}

/// Classification of an upload or extracted unit.
///
/// The orchestrator pattern-matches on this; adding a format touches only
/// this enumeration and [`classify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Plain,
    Compressed(Codec),
    Archive(ArchiveFormat),
    CompressedArchive(Codec, ArchiveFormat),
}

/// Bytes to peek from the head of a stream. Large enough to cover the tar
/// magic at offset 257 plus checksum slack.
pub const SIGNATURE_WINDOW: usize = 4096;

/// How much decompressed head to probe when deciding whether a compressed
/// stream wraps a container.
const PROBE_WINDOW: usize = 4096;

/// Classify a peeked signature window. Never consumes the source stream.
pub fn classify(window: &[u8]) -> ContentKind {
    match window {
        [0x50, 0x4B, 0x03, 0x04, ..] | [0x50, 0x4B, 0x05, 0x06, ..] => {
            ContentKind::Archive(ArchiveFormat::Zip)
        }
        [0x1F, 0x8B, ..] => ContentKind::Compressed(Codec::Gzip),
        [b'B', b'Z', b'h', b'1'..=b'9', ..] => ContentKind::Compressed(Codec::Bzip2),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => ContentKind::Compressed(Codec::Xz),
        [0x28, 0xB5, 0x2F, 0xFD, ..] => ContentKind::Compressed(Codec::Zstd),
        _ => {
            if is_tar_header(window) {
                ContentKind::Archive(ArchiveFormat::Tar)
            } else {
                ContentKind::Plain
            }
        }
    }
}

fn is_tar_header(data: &[u8]) -> bool {
    data.len() >= 263 && (data[257..263] == *b"ustar\0" || data[257..263] == *b"ustar ")
}

/// Classify a staged file.
///
/// For compressed input, a bounded in-memory decode of the head upgrades
/// `Compressed(codec)` to `CompressedArchive(codec, format)` when the inner
/// bytes carry a container signature. An inconclusive probe (truncated or
/// slow-starting codec frame) leaves the kind as `Compressed`; the caller
/// re-classifies after full decompression, so both paths converge.
pub fn classify_file(path: &Path) -> Result<ContentKind> {
    let mut file = File::open(path)?;
    let window = read_window(&mut file, SIGNATURE_WINDOW)?;

    let kind = classify(&window);
    if let ContentKind::Compressed(codec) = kind {
        let file = File::open(path)?;
        if let Some(format) = probe_compressed_head(file, codec) {
            return Ok(ContentKind::CompressedArchive(codec, format));
        }
    }
    Ok(kind)
}

fn probe_compressed_head<R: Read + 'static>(reader: R, codec: Codec) -> Option<ArchiveFormat> {
    let decoder = codec::decoder(Box::new(reader), codec).ok()?;
    let mut head = Vec::with_capacity(PROBE_WINDOW);
    // A decode error here is not a verdict; the unit fails later with a
    // proper CorruptStream if the whole stream is bad.
    let _ = decoder.take(PROBE_WINDOW as u64).read_to_end(&mut head);

    match classify(&head) {
        ContentKind::Archive(format) => Some(format),
        _ => None,
    }
}

fn read_window<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut window = Vec::with_capacity(len);
    reader.take(len as u64).read_to_end(&mut window)?;
    Ok(window)
}

/// Best-effort content-type guess from the same signature window.
///
/// Coarse by design: known container/codec signatures, a printable-text
/// heuristic, and an octet-stream fallback.
pub fn guess_content_type(window: &[u8]) -> &'static str {
    match classify(window) {
        ContentKind::Archive(ArchiveFormat::Zip) => "application/zip",
        ContentKind::Archive(ArchiveFormat::Tar) => "application/x-tar",
        ContentKind::Compressed(Codec::Gzip) | ContentKind::CompressedArchive(Codec::Gzip, _) => {
            "application/gzip"
        }
        ContentKind::Compressed(Codec::Bzip2) | ContentKind::CompressedArchive(Codec::Bzip2, _) => {
            "application/x-bzip2"
        }
        ContentKind::Compressed(Codec::Xz) | ContentKind::CompressedArchive(Codec::Xz, _) => {
            "application/x-xz"
        }
        ContentKind::Compressed(Codec::Zstd) | ContentKind::CompressedArchive(Codec::Zstd, _) => {
            "application/zstd"
        }
        ContentKind::Plain => {
            if looks_textual(window) {
                "text/plain"
            } else {
                "application/octet-stream"
            }
        }
    }
}

fn looks_textual(window: &[u8]) -> bool {
    if window.is_empty() {
        return false;
    }
    let printable = window
        .iter()
        .filter(|b| b.is_ascii_graphic() || b.is_ascii_whitespace() || **b >= 0x80)
        .count();
    !window.contains(&0) && printable * 100 >= window.len() * 95
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_zip() {
        let window = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00];
        assert_eq!(classify(&window), ContentKind::Archive(ArchiveFormat::Zip));
    }

    #[test]
    fn classify_gzip() {
        let window = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(classify(&window), ContentKind::Compressed(Codec::Gzip));
    }

    #[test]
    fn classify_bzip2() {
        assert_eq!(classify(b"BZh91AY&SY"), ContentKind::Compressed(Codec::Bzip2));
    }

    #[test]
    fn classify_xz() {
        let window = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00];
        assert_eq!(classify(&window), ContentKind::Compressed(Codec::Xz));
    }

    #[test]
    fn classify_zstd() {
        let window = [0x28, 0xB5, 0x2F, 0xFD, 0x00];
        assert_eq!(classify(&window), ContentKind::Compressed(Codec::Zstd));
    }

    #[test]
    fn classify_plain_tar() {
        let mut window = vec![0u8; 512];
        window[257..263].copy_from_slice(b"ustar\0");
        assert_eq!(classify(&window), ContentKind::Archive(ArchiveFormat::Tar));
    }

    #[test]
    fn unknown_signature_is_plain() {
        assert_eq!(classify(&[0xDE, 0xAD, 0xBE, 0xEF]), ContentKind::Plain);
        assert_eq!(classify(b"hello world"), ContentKind::Plain);
        assert_eq!(classify(&[]), ContentKind::Plain);
    }

    #[test]
    fn truncated_tar_header_is_plain() {
        assert_eq!(classify(&[0u8; 256]), ContentKind::Plain);
    }

    #[test]
    fn extension_never_consulted() {
        // Content says gzip even if a caller believes it is a .txt
        let window = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(classify(&window), ContentKind::Compressed(Codec::Gzip));
    }

    #[test]
    fn content_type_guesses() {
        assert_eq!(guess_content_type(b"plain notes\n"), "text/plain");
        assert_eq!(guess_content_type(&[0x00, 0x01, 0x02]), "application/octet-stream");
        assert_eq!(guess_content_type(&[0x1F, 0x8B, 0x08]), "application/gzip");
        assert_eq!(
            guess_content_type(&[0x50, 0x4B, 0x03, 0x04]),
            "application/zip"
        );
    }

    #[test]
    fn classify_file_upgrades_gzipped_tar() {
        use std::io::Write;

        // Build a small tar, gzip it, classify from disk.
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let mut header = tar::Header::new_gnu();
            header.set_size(5);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "a.txt", &b"hello"[..]).unwrap();
            builder.finish().unwrap();
        }
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(&tar_bytes).unwrap();
        let gz_bytes = gz.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged");
        std::fs::write(&path, &gz_bytes).unwrap();

        assert_eq!(
            classify_file(&path).unwrap(),
            ContentKind::CompressedArchive(Codec::Gzip, ArchiveFormat::Tar)
        );
    }

    #[test]
    fn classify_file_plain_gzip_stays_compressed() {
        use std::io::Write;

        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(b"just some text, no container inside").unwrap();
        let gz_bytes = gz.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged");
        std::fs::write(&path, &gz_bytes).unwrap();

        assert_eq!(
            classify_file(&path).unwrap(),
            ContentKind::Compressed(Codec::Gzip)
        );
    }
}
