//! Basis Universal transcoder/encoder backing for the texture pipeline.

use crate::{BasisVariant, DecodedImage, Error, Result, TextureCodec};
use basis_universal::{
    BasisTextureFormat, Compressor, CompressorParams, TranscodeParameters, Transcoder,
    TranscoderTextureFormat,
};
use std::sync::Once;

static BASIS_INIT: Once = Once::new();

/// Initialize the Basis Universal transcoder and encoder (once per process)
fn init_basis() {
    BASIS_INIT.call_once(|| {
        basis_universal::transcoder_init();
        basis_universal::encoder_init();
    });
}

/// ETC1S quality used for re-encoded textures, mid-range.
const ETC1S_QUALITY: u32 = 128;

/// `TextureCodec` backed by the Basis Universal library.
pub struct BasisCodec {
    threads: u32,
}

impl BasisCodec {
    pub fn new() -> Self {
        init_basis();
        Self {
            threads: num_cpus::get().max(1) as u32,
        }
    }
}

impl Default for BasisCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureCodec for BasisCodec {
    fn transcode_rgba(&self, payload: &[u8]) -> Result<DecodedImage> {
        let mut transcoder = Transcoder::new();
        if !transcoder.validate_header(payload) {
            return Err(Error::TranscodeFailed(
                "payload is not a valid BASIS file".to_string(),
            ));
        }
        let info = transcoder
            .image_info(payload, 0)
            .ok_or_else(|| Error::TranscodeFailed("no image in BASIS payload".to_string()))?;
        let (width, height) = (info.m_orig_width, info.m_orig_height);
        if width > crate::MAX_TEXTURE_DIM || height > crate::MAX_TEXTURE_DIM {
            return Err(Error::AllocationFailed(
                width as usize * height as usize * 4,
            ));
        }

        transcoder
            .prepare_transcoding(payload)
            .map_err(|_| Error::TranscodeFailed("transcoder rejected payload".to_string()))?;
        let rgba = transcoder
            .transcode_image_level(
                payload,
                TranscoderTextureFormat::RGBA32,
                TranscodeParameters {
                    image_index: 0,
                    level_index: 0,
                    ..TranscodeParameters::default()
                },
            )
            .map_err(|e| Error::TranscodeFailed(format!("{:?}", e)))?;
        transcoder.end_transcoding();

        Ok(DecodedImage {
            rgba,
            width,
            height,
        })
    }

    fn encode(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        variant: BasisVariant,
    ) -> Result<Vec<u8>> {
        let mut params = CompressorParams::new();
        params.set_generate_mipmaps(false);
        match variant {
            BasisVariant::Uastc => {
                params.set_basis_format(BasisTextureFormat::UASTC4x4);
                params.set_uastc_quality_level(basis_universal::UASTC_QUALITY_DEFAULT);
            }
            BasisVariant::Etc1s => {
                params.set_basis_format(BasisTextureFormat::ETC1S);
                params.set_etc1s_quality_level(ETC1S_QUALITY);
            }
        }
        params
            .source_image_mut(0)
            .init(rgba, width, height, 4);

        let mut compressor = Compressor::new(self.threads);
        // SAFETY: params outlive the compressor and the source image was
        // initialized with matching dimensions.
        unsafe {
            if !compressor.init(&params) {
                return Err(Error::EncodeFailed("compressor init rejected params".to_string()));
            }
            compressor
                .process()
                .map_err(|e| Error::EncodeFailed(format!("{:?}", e)))?;
        }
        Ok(compressor.basis_file().to_vec())
    }
}
