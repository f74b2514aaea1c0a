//! Legacy texture-video reading via FFmpeg.
//!
//! Volograms below v13 keep their textures in a sibling video file, one
//! video frame per mesh frame. This reader decodes them sequentially to
//! packed RGB rows for the image writer.

use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use std::path::Path;
use std::sync::Once;

static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg (call once per application)
fn init_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        ffmpeg::init().expect("Failed to initialize FFmpeg");
    });
}

/// Sequential decoder over a vologram's texture video.
pub struct TextureVideo {
    input: ffmpeg::format::context::Input,
    video_stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<ffmpeg::software::scaling::Context>,
}

impl TextureVideo {
    /// Opens a texture video file.
    pub fn open(path: &Path) -> Result<Self> {
        init_ffmpeg();

        let input = ffmpeg::format::input(&path)?;

        let video_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(Error::NoVideoStream)?;
        let video_stream_index = video_stream.index();

        let context =
            ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = context.decoder().video()?;

        Ok(Self {
            input,
            video_stream_index,
            decoder,
            scaler: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /// Declared frame count of the video stream, falling back to a
    /// duration-based estimate when the container does not say.
    pub fn frame_count(&self) -> u64 {
        let stream = match self.input.stream(self.video_stream_index) {
            Some(s) => s,
            None => return 0,
        };
        let declared = stream.frames();
        if declared > 0 {
            return declared as u64;
        }
        let duration = stream.duration() as f64 * f64::from(stream.time_base());
        let rate = f64::from(stream.rate());
        (duration * rate).round().max(0.0) as u64
    }

    fn ensure_scaler(&mut self) -> Result<()> {
        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg::software::scaling::Context::get(
                self.decoder.format(),
                self.decoder.width(),
                self.decoder.height(),
                ffmpeg::format::Pixel::RGB24,
                self.decoder.width(),
                self.decoder.height(),
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?);
        }
        Ok(())
    }

    /// Converts a decoded frame to tightly packed RGB rows.
    fn frame_to_rgb(
        scaler: &mut ffmpeg::software::scaling::Context,
        decoded: &ffmpeg::frame::Video,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        scaler.run(decoded, &mut rgb_frame)?;

        let src = rgb_frame.data(0);
        let stride = rgb_frame.stride(0);
        let row_bytes = width as usize * 3;
        if stride < row_bytes {
            return Err(Error::InvalidVideo);
        }
        let mut rgb = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let row = &src[y * stride..y * stride + row_bytes];
            rgb.extend_from_slice(row);
        }
        Ok(rgb)
    }

    /// Decodes frames in order, handing each to `callback` as
    /// `(index, rgb, width, height)`. Decoding stops early when the
    /// callback returns `false`.
    pub fn decode_frames<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(usize, &[u8], u32, u32) -> Result<bool>,
    {
        let width = self.decoder.width();
        let height = self.decoder.height();
        self.ensure_scaler()?;

        let mut frame_index = 0usize;

        // Split the borrows so packets can stream from `input` while
        // frames drain from `decoder`.
        let TextureVideo {
            input,
            video_stream_index,
            decoder,
            scaler,
        } = self;
        let stream_idx = *video_stream_index;

        for (stream, packet) in input.packets() {
            if stream.index() != stream_idx {
                continue;
            }
            decoder.send_packet(&packet)?;

            let mut decoded = ffmpeg::frame::Video::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                if let Some(sc) = scaler.as_mut() {
                    let rgb = Self::frame_to_rgb(sc, &decoded, width, height)?;
                    if !callback(frame_index, &rgb, width, height)? {
                        return Ok(());
                    }
                    frame_index += 1;
                }
            }
        }

        // Flush decoder
        decoder.send_eof()?;
        let mut decoded = ffmpeg::frame::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            if let Some(sc) = scaler.as_mut() {
                let rgb = Self::frame_to_rgb(sc, &decoded, width, height)?;
                if !callback(frame_index, &rgb, width, height)? {
                    return Ok(());
                }
                frame_index += 1;
            }
        }

        Ok(())
    }
}
