//! Bounded artwork extraction helpers.
//!
//! Thumbnails come from untrusted player apps; reads are hard-capped and
//! the destination file is replaced atomically so `/artwork` never serves
//! a half-written image.

use crate::backend::ProviderError;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Hard cap on thumbnail size. Streams larger than this are treated as
/// "no artwork" rather than read to completion.
pub const MAX_ARTWORK_BYTES: usize = 10 * 1024 * 1024;

/// Read at most [`MAX_ARTWORK_BYTES`] from `reader`. A stream that exceeds
/// the cap is an error, not a truncation.
pub fn read_bounded(reader: impl Read, cap: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut limited = reader.take(cap as u64 + 1);
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > cap {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("artwork stream exceeds {cap} byte cap"),
        ));
    }
    Ok(bytes)
}

/// Replace `dest` with `bytes` atomically: write a sibling temp file, then
/// rename over the destination.
pub fn write_artwork_atomic(dest: &Path, bytes: &[u8]) -> Result<(), ProviderError> {
    if bytes.is_empty() {
        return Err(ProviderError::ArtworkExtraction(
            "refusing to write empty artwork file".to_string(),
        ));
    }
    let tmp = dest.with_extension("jpg.tmp");
    fs::write(&tmp, bytes)
        .and_then(|_| fs::rename(&tmp, dest))
        .map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ProviderError::ArtworkExtraction(format!(
                "failed to write {}: {}",
                dest.display(),
                e
            ))
        })
}

/// Copy a local image file into place, bounded and atomic. Used by
/// backends whose platform hands out artwork as a file path or file URL.
pub fn copy_artwork_file(src: &Path, dest: &Path) -> Result<bool, ProviderError> {
    let file = match fs::File::open(src) {
        Ok(file) => file,
        Err(_) => return Ok(false),
    };
    let bytes = read_bounded(file, MAX_ARTWORK_BYTES)
        .map_err(|e| ProviderError::ArtworkExtraction(e.to_string()))?;
    if bytes.is_empty() {
        return Ok(false);
    }
    write_artwork_atomic(dest, &bytes)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bounded_accepts_small_streams() {
        let data = vec![7u8; 1024];
        let bytes = read_bounded(&data[..], MAX_ARTWORK_BYTES).unwrap();
        assert_eq!(bytes, data);
    }

    #[test]
    fn read_bounded_rejects_oversized_streams() {
        let data = vec![0u8; 64];
        assert!(read_bounded(&data[..], 63).is_err());
        assert!(read_bounded(&data[..], 64).is_ok());
    }

    #[test]
    fn atomic_write_replaces_previous_artwork() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cover.jpg");
        write_artwork_atomic(&dest, b"first").unwrap();
        write_artwork_atomic(&dest, b"second").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"second");
        assert!(!dest.with_extension("jpg.tmp").exists());
    }

    #[test]
    fn atomic_write_rejects_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cover.jpg");
        assert!(write_artwork_atomic(&dest, b"").is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn copy_artwork_file_missing_source_is_no_artwork() {
        let dir = tempfile::tempdir().unwrap();
        let copied = copy_artwork_file(
            &dir.path().join("missing.png"),
            &dir.path().join("cover.jpg"),
        )
        .unwrap();
        assert!(!copied);
    }

    #[test]
    fn copy_artwork_file_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("art.png");
        let dest = dir.path().join("cover.jpg");
        fs::write(&src, b"png bytes").unwrap();
        assert!(copy_artwork_file(&src, &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"png bytes");
    }
}
