//! Vologram Texture Pipeline
//!
//! Given a frame's compressed texture payload and an optional target size,
//! produce either pass-through bytes or decoded-then-re-encoded bytes
//! preserving the source container format. Only BASIS payloads (ETC1S or
//! UASTC) can be resized; anything else falls back to pass-through with a
//! warning.

pub mod basis;

pub use basis::BasisCodec;

use std::time::Instant;
use volkit_core::{TextureCompression, TextureContainer};

/// Result type for volkit-texture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for volkit-texture operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Texture dimensions {0}x{1} outside supported range 1..={max}", max = MAX_TEXTURE_DIM)]
    InvalidDimensions(u32, u32),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    #[error("Allocation failed for {0} bytes")]
    AllocationFailed(usize),
}

/// Largest texture edge the pipeline will produce or decode.
pub const MAX_TEXTURE_DIM: u32 = 8192;

/// Which BASIS encoding variant a payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisVariant {
    Etc1s,
    Uastc,
}

/// A texture decoded to RGBA8.
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Narrow interface over the external transcoder/encoder. Any library
/// satisfying this is a drop-in.
pub trait TextureCodec {
    /// Decode a compressed payload to RGBA8 at its source dimensions.
    fn transcode_rgba(&self, payload: &[u8]) -> Result<DecodedImage>;

    /// Encode RGBA8 pixels into a BASIS-container payload of the given
    /// variant.
    fn encode(&self, rgba: &[u8], width: u32, height: u32, variant: BasisVariant)
        -> Result<Vec<u8>>;
}

/// Wall-clock cost of one frame's resize, reported upstream for the
/// end-of-run averages.
#[derive(Debug, Clone, Copy)]
pub struct FrameTiming {
    pub transcode_ms: f64,
    pub encode_ms: f64,
}

/// Output of one `process` call.
pub struct ProcessedTexture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// True when the payload was actually re-encoded at new dimensions.
    pub resized: bool,
    pub timing: Option<FrameTiming>,
}

/// Per-frame texture processor bound to a codec and an optional target
/// size. Stateless between frames.
pub struct TexturePipeline<'a> {
    codec: &'a dyn TextureCodec,
    target: Option<(u32, u32)>,
}

impl<'a> TexturePipeline<'a> {
    /// Validates the target dimensions up front; out-of-range requests are
    /// rejected before any payload is touched.
    pub fn new(codec: &'a dyn TextureCodec, target: Option<(u32, u32)>) -> Result<Self> {
        if let Some((w, h)) = target {
            if w == 0 || h == 0 || w > MAX_TEXTURE_DIM || h > MAX_TEXTURE_DIM {
                return Err(Error::InvalidDimensions(w, h));
            }
        }
        Ok(Self { codec, target })
    }

    /// Processes one frame's payload. `src_dims` and the codec tags come
    /// from the container header.
    pub fn process(
        &self,
        payload: &[u8],
        src_dims: (u32, u32),
        compression: TextureCompression,
        container: TextureContainer,
    ) -> Result<ProcessedTexture> {
        let target = match self.target {
            Some(t) if t != src_dims => t,
            _ => {
                return Ok(ProcessedTexture {
                    data: payload.to_vec(),
                    width: src_dims.0,
                    height: src_dims.1,
                    resized: false,
                    timing: None,
                });
            }
        };

        let variant = match (container, compression) {
            (TextureContainer::Basis, TextureCompression::Uastc) => BasisVariant::Uastc,
            (TextureContainer::Basis, TextureCompression::Etc1s) => BasisVariant::Etc1s,
            _ => {
                eprintln!(
                    "WARNING: texture resizing is only supported for BASIS payloads; passing through"
                );
                return Ok(ProcessedTexture {
                    data: payload.to_vec(),
                    width: src_dims.0,
                    height: src_dims.1,
                    resized: false,
                    timing: None,
                });
            }
        };

        let t0 = Instant::now();
        let decoded = self.codec.transcode_rgba(payload)?;
        let transcode_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        let resampled = resample_rgba(&decoded, target.0, target.1)?;
        let data = self
            .codec
            .encode(&resampled, target.0, target.1, variant)?;
        let encode_ms = t1.elapsed().as_secs_f64() * 1000.0;

        Ok(ProcessedTexture {
            data,
            width: target.0,
            height: target.1,
            resized: true,
            timing: Some(FrameTiming {
                transcode_ms,
                encode_ms,
            }),
        })
    }
}

/// Lanczos resample of an RGBA8 buffer to new dimensions.
fn resample_rgba(decoded: &DecodedImage, width: u32, height: u32) -> Result<Vec<u8>> {
    if decoded.width == width && decoded.height == height {
        return Ok(decoded.rgba.clone());
    }
    let img = image::RgbaImage::from_raw(decoded.width, decoded.height, decoded.rgba.clone())
        .ok_or_else(|| {
            Error::TranscodeFailed(format!(
                "decoded payload is {} bytes, expected {}x{}x4",
                decoded.rgba.len(),
                decoded.width,
                decoded.height
            ))
        })?;
    let resized = image::imageops::resize(&img, width, height, image::imageops::FilterType::Lanczos3);
    Ok(resized.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Codec stub: "decodes" to a solid color and "encodes" to a tagged
    /// byte string so the pipeline's plumbing is observable.
    struct StubCodec;

    impl TextureCodec for StubCodec {
        fn transcode_rgba(&self, _payload: &[u8]) -> Result<DecodedImage> {
            Ok(DecodedImage {
                rgba: vec![0x80; 16 * 16 * 4],
                width: 16,
                height: 16,
            })
        }

        fn encode(
            &self,
            rgba: &[u8],
            width: u32,
            height: u32,
            variant: BasisVariant,
        ) -> Result<Vec<u8>> {
            assert_eq!(rgba.len(), (width * height * 4) as usize);
            let tag = match variant {
                BasisVariant::Etc1s => 1u8,
                BasisVariant::Uastc => 2u8,
            };
            Ok(vec![tag, width as u8, height as u8])
        }
    }

    #[test]
    fn test_no_target_is_passthrough() {
        let pipeline = TexturePipeline::new(&StubCodec, None).unwrap();
        let out = pipeline
            .process(
                &[1, 2, 3],
                (16, 16),
                TextureCompression::Uastc,
                TextureContainer::Basis,
            )
            .unwrap();
        assert_eq!(out.data, vec![1, 2, 3]);
        assert!(!out.resized);
        assert!(out.timing.is_none());
    }

    #[test]
    fn test_equal_dims_is_passthrough() {
        let pipeline = TexturePipeline::new(&StubCodec, Some((16, 16))).unwrap();
        let out = pipeline
            .process(
                &[9, 9],
                (16, 16),
                TextureCompression::Etc1s,
                TextureContainer::Basis,
            )
            .unwrap();
        assert_eq!(out.data, vec![9, 9]);
        assert!(!out.resized);
    }

    #[test]
    fn test_basis_resize_preserves_variant() {
        let pipeline = TexturePipeline::new(&StubCodec, Some((8, 8))).unwrap();
        let out = pipeline
            .process(
                &[0],
                (16, 16),
                TextureCompression::Uastc,
                TextureContainer::Basis,
            )
            .unwrap();
        assert!(out.resized);
        assert_eq!(out.data, vec![2, 8, 8]);
        assert_eq!((out.width, out.height), (8, 8));
        assert!(out.timing.is_some());

        let out = pipeline
            .process(
                &[0],
                (16, 16),
                TextureCompression::Etc1s,
                TextureContainer::Basis,
            )
            .unwrap();
        assert_eq!(out.data[0], 1);
    }

    #[test]
    fn test_raw_resize_falls_back_to_passthrough() {
        let pipeline = TexturePipeline::new(&StubCodec, Some((8, 8))).unwrap();
        let out = pipeline
            .process(
                &[7, 7, 7],
                (16, 16),
                TextureCompression::Raw,
                TextureContainer::Raw,
            )
            .unwrap();
        assert_eq!(out.data, vec![7, 7, 7]);
        assert!(!out.resized);
        assert_eq!((out.width, out.height), (16, 16));
    }

    #[test]
    fn test_dimension_limits() {
        assert!(matches!(
            TexturePipeline::new(&StubCodec, Some((0, 8))),
            Err(Error::InvalidDimensions(0, 8))
        ));
        assert!(matches!(
            TexturePipeline::new(&StubCodec, Some((8, 8193))),
            Err(Error::InvalidDimensions(8, 8193))
        ));
        assert!(TexturePipeline::new(&StubCodec, Some((8192, 1))).is_ok());
    }
}
