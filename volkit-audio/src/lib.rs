//! Vologram Audio Trimmer
//!
//! Cuts a `[t0, t1]` window out of a muxed elementary stream (MP3 in
//! practice) by copying packets and rebasing their timestamps to zero.
//! Codec, channel layout and sample rate pass through untouched.

pub mod remux;

pub use remux::{trim_media_file, FfmpegRemuxer};

/// Result type for volkit-audio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for volkit-audio operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("No audio stream found in payload")]
    NoAudioStream,

    #[error("No video stream found in file")]
    NoVideoStream,

    #[error("No audio packets inside the requested window")]
    EmptyAudioSlice,
}

/// Narrow interface over the external demux/remux library. Any library
/// satisfying this is a drop-in.
pub trait AudioRemuxer {
    /// Produce a self-contained stream holding the `[t0, t1]` slice of
    /// `data`, timestamps rebased to zero.
    fn trim(&self, data: &[u8], t0: f64, t1: f64) -> Result<Vec<u8>>;
}

/// Seconds window covering frames `start..=end` at the given rate. The
/// end bound includes the last frame's full display time.
pub fn frame_window(start_frame: u32, end_frame: u32, fps: f32) -> (f64, f64) {
    let fps = f64::from(fps);
    (
        f64::from(start_frame) / fps,
        f64::from(end_frame + 1) / fps,
    )
}
