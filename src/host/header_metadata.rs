//! Metadata from the first bytes of a file: MIME type and EXIF thumbnail.

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use lzthumb::{ListEntry, Metadata, MetadataError, MetadataProvider, ThumbnailRef};

/// Size of the leading range read for metadata.
const HEADER_BYTES: usize = 64 * 1024;

pub struct HeaderMetadata;

#[async_trait]
impl MetadataProvider for HeaderMetadata {
    async fn metadata(&self, entry: &ListEntry) -> Result<Metadata, MetadataError> {
        let mut file = File::open(&entry.source_id)
            .await
            .map_err(|e| MetadataError::Unavailable(format!("could not open file: {}", e)))?;

        let mut header = vec![0u8; HEADER_BYTES];
        let mut filled = 0;
        while filled < header.len() {
            match file.read(&mut header[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    return Err(MetadataError::TransientRead {
                        offset: filled as u64,
                        reason: e.to_string(),
                    });
                }
            }
        }
        header.truncate(filled);

        // A file still being written can read back empty.
        if header.is_empty() {
            return Err(MetadataError::TransientRead {
                offset: 0,
                reason: "unexpected eof".to_string(),
            });
        }

        Ok(Metadata {
            embedded_thumbnail: exif_thumbnail(&header).map(ThumbnailRef::Bytes),
            external_thumbnail: None,
            content_type: sniff_content_type(&header).map(str::to_string),
        })
    }
}

fn sniff_content_type(header: &[u8]) -> Option<&'static str> {
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if header.starts_with(b"GIF8") {
        Some("image/gif")
    } else if header.starts_with(b"BM") {
        Some("image/bmp")
    } else if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// JPEG thumbnail embedded in the APP1 (EXIF) segment of a JPEG header.
fn exif_thumbnail(header: &[u8]) -> Option<Vec<u8>> {
    if !header.starts_with(&[0xFF, 0xD8, 0xFF, 0xE1]) || header.len() < 6 {
        return None;
    }
    let segment_len = u16::from_be_bytes([header[4], header[5]]) as usize;
    let segment = header.get(4..4 + segment_len)?;

    let start = find(segment, &[0xFF, 0xD8, 0xFF])?;
    let end = find(&segment[start..], &[0xFF, 0xD9])? + start + 2;
    Some(segment[start..end].to_vec())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn jpeg_with_thumbnail(thumb: &[u8]) -> Vec<u8> {
        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(thumb);
        let len = (app1.len() + 2) as u16;

        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1];
        data.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(&app1);
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);
        data
    }

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(b"\x89PNG\r\n"), Some("image/png"));
        assert_eq!(sniff_content_type(b"GIF89a"), Some("image/gif"));
        assert_eq!(sniff_content_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_content_type(b"hello"), None);
    }

    #[test]
    fn test_exif_thumbnail() {
        let thumb = [0xFF, 0xD8, 0xFF, 0xDB, 1, 2, 3, 0xFF, 0xD9];
        let data = jpeg_with_thumbnail(&thumb);
        assert_eq!(exif_thumbnail(&data).as_deref(), Some(&thumb[..]));

        assert!(exif_thumbnail(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 4, 0, 0]).is_none());
    }

    #[tokio::test]
    async fn test_empty_file_is_inconclusive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.jpg");
        fs::write(&path, b"").unwrap();

        let err = HeaderMetadata
            .metadata(&ListEntry::file(path.to_string_lossy()))
            .await
            .unwrap_err();
        assert!(err.is_inconclusive());
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.jpg");

        let err = HeaderMetadata
            .metadata(&ListEntry::file(path.to_string_lossy()))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_jpeg_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let thumb = [0xFF, 0xD8, 0xFF, 0xDB, 9, 0xFF, 0xD9];
        fs::write(&path, jpeg_with_thumbnail(&thumb)).unwrap();

        let meta = HeaderMetadata
            .metadata(&ListEntry::file(path.to_string_lossy()))
            .await
            .unwrap();
        assert_eq!(meta.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(meta.embedded_thumbnail, Some(ThumbnailRef::Bytes(thumb.to_vec())));
    }
}
