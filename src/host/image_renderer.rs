//! Thumbnail renderer backed by the `image` crate.
//!
//! Decoding runs on the blocking pool; results are PNG `data:` URLs.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::PathBuf;

use lzthumb::{ListEntry, RenderError, RenderedThumbnail, ThumbnailRef, ThumbnailRenderer, ThumbnailSource};

pub struct ImageRenderer {
    /// Longest edge of produced thumbnails, in pixels.
    size: u32,
}

impl ImageRenderer {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }
}

/// Where the pixels come from, resolved before moving to the blocking pool.
enum Input {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[async_trait]
impl ThumbnailRenderer for ImageRenderer {
    async fn render(
        &self,
        entry: &ListEntry,
        source: &ThumbnailSource,
    ) -> Result<RenderedThumbnail, RenderError> {
        let input = match source {
            ThumbnailSource::Embedded(thumb) | ThumbnailSource::External(thumb) => resolve_ref(thumb)?,
            ThumbnailSource::RawFile => Input::File(PathBuf::from(&entry.source_id)),
        };
        let size = self.size;

        tokio::task::spawn_blocking(move || {
            let img = decode(input)?;
            if img.width() > size || img.height() > size {
                encode_thumbnail(&img.thumbnail(size, size))
            } else {
                encode_thumbnail(&img)
            }
        })
        .await
        .map_err(|e| RenderError::Io(format!("task join error: {}", e)))?
    }
}

fn resolve_ref(thumb: &ThumbnailRef) -> Result<Input, RenderError> {
    match thumb {
        ThumbnailRef::Bytes(bytes) => Ok(Input::Bytes(bytes.clone())),
        ThumbnailRef::Url(url) => {
            if let Some(rest) = url.strip_prefix("data:") {
                let (_, payload) = rest.split_once(";base64,").ok_or(RenderError::Unsupported)?;
                general_purpose::STANDARD
                    .decode(payload)
                    .map(Input::Bytes)
                    .map_err(|e| RenderError::Decode(e.to_string()))
            } else if let Some(path) = url.strip_prefix("file://") {
                Ok(Input::File(PathBuf::from(path)))
            } else {
                Err(RenderError::Unsupported)
            }
        }
    }
}

fn decode(input: Input) -> Result<DynamicImage, RenderError> {
    match input {
        Input::Bytes(bytes) => {
            image::load_from_memory(&bytes).map_err(|e| RenderError::Decode(e.to_string()))
        }
        Input::File(path) => {
            let reader = ImageReader::open(&path)
                .and_then(|r| r.with_guessed_format())
                .map_err(|e| RenderError::Io(e.to_string()))?;
            if reader.format().is_none() {
                return Err(RenderError::Unsupported);
            }
            reader.decode().map_err(|e| RenderError::Decode(e.to_string()))
        }
    }
}

fn encode_thumbnail(img: &DynamicImage) -> Result<RenderedThumbnail, RenderError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| RenderError::Decode(e.to_string()))?;
    Ok(RenderedThumbnail {
        data_url: format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(&buf)),
        width: img.width(),
        height: img.height(),
    })
}
