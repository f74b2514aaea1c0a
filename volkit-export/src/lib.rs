//! Vologram Frame Export
//!
//! Emits one Wavefront OBJ + MTL + still image per frame, for external
//! mesh viewers. Geometry comes from the frame store; textures are either
//! transcoded from the frame's BASIS payload (v13) or pulled from the
//! legacy texture video.

pub mod export;
pub mod obj;
pub mod video;

pub use export::{export, ExportInput, ExportOptions, ExportSummary};
pub use video::TextureVideo;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Result type for volkit-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for volkit-export operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] volkit_core::Error),

    #[error("Texture error: {0}")]
    Texture(#[from] volkit_texture::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("No video stream found in texture video")]
    NoVideoStream,

    #[error("Decoded video frame has unexpected geometry")]
    InvalidVideo,

    #[error("Mesh has {vertex_count} vertices; only 16-bit indices are supported")]
    UnsupportedIndexWidth { vertex_count: usize },
}

/// Narrow interface over the still-image writer. Any library satisfying
/// this is a drop-in.
pub trait ImageWriter {
    /// Write packed `channels`-per-pixel rows to `path`.
    fn write(&self, path: &Path, pixels: &[u8], width: u32, height: u32, channels: u8)
        -> Result<()>;
}

/// JPEG writer used for exported texture frames.
pub struct JpegWriter {
    pub quality: u8,
}

impl Default for JpegWriter {
    fn default() -> Self {
        // Slightly above common defaults; texture detail matters more
        // than file size here.
        Self { quality: 97 }
    }
}

impl ImageWriter for JpegWriter {
    fn write(
        &self,
        path: &Path,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<()> {
        // JPEG carries no alpha; four-channel input is flattened to RGB.
        let rgb: std::borrow::Cow<[u8]> = match channels {
            3 => pixels.into(),
            4 => pixels
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect::<Vec<u8>>()
                .into(),
            _ => return Err(Error::InvalidVideo),
        };
        let file = File::create(path)?;
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(BufWriter::new(file), self.quality);
        encoder.encode(&rgb, width, height, image::ExtendedColorType::Rgb8)?;
        Ok(())
    }
}
