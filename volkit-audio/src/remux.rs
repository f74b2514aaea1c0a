//! FFmpeg-backed packet-copy trimming.
//!
//! Both entry points do stream copy only: packets inside the window are
//! forwarded with PTS/DTS rebased so the output starts at zero, and the
//! muxer rewrites whatever container headers the format needs.

use crate::{AudioRemuxer, Error, Result};
use ffmpeg_next as ffmpeg;
use std::io::Write;
use std::path::Path;
use std::sync::Once;

static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg (call once per application)
fn init_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        ffmpeg::init().expect("Failed to initialize FFmpeg");
    });
}

/// `AudioRemuxer` backed by FFmpeg's demuxer/muxer pair.
///
/// FFmpeg's format layer wants seekable inputs, so the in-memory stream is
/// staged through temporary files for the duration of the call.
pub struct FfmpegRemuxer;

impl AudioRemuxer for FfmpegRemuxer {
    fn trim(&self, data: &[u8], t0: f64, t1: f64) -> Result<Vec<u8>> {
        init_ffmpeg();

        let mut in_file = tempfile::Builder::new()
            .prefix("volkit-audio-in-")
            .suffix(".mp3")
            .tempfile()?;
        in_file.write_all(data)?;
        in_file.flush()?;

        let out_file = tempfile::Builder::new()
            .prefix("volkit-audio-out-")
            .suffix(".mp3")
            .tempfile()?;

        let copied = trim_audio_stream(in_file.path(), out_file.path(), t0, t1)?;
        if copied == 0 {
            return Err(Error::EmptyAudioSlice);
        }
        Ok(std::fs::read(out_file.path())?)
    }
}

fn trim_audio_stream(input: &Path, output: &Path, t0: f64, t1: f64) -> Result<u64> {
    let mut ictx = ffmpeg::format::input(&input)?;
    let (ist_index, ist_time_base) = {
        let ist = ictx
            .streams()
            .best(ffmpeg::media::Type::Audio)
            .ok_or(Error::NoAudioStream)?;
        (ist.index(), ist.time_base())
    };
    let parameters = ictx
        .stream(ist_index)
        .ok_or(Error::NoAudioStream)?
        .parameters();

    let mut octx = ffmpeg::format::output(&output)?;
    {
        let mut ost = octx.add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))?;
        ost.set_parameters(parameters);
        // Stream copy: let the muxer pick its own tag.
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
    }
    octx.write_header()?;
    let ost_time_base = octx
        .stream(0)
        .ok_or(Error::NoAudioStream)?
        .time_base();

    seek_to(&mut ictx, t0);

    let mut first_pts: Option<i64> = None;
    let mut first_dts: Option<i64> = None;
    let mut copied = 0u64;
    for (stream, mut packet) in ictx.packets() {
        if stream.index() != ist_index {
            continue;
        }
        let Some(pts) = packet.pts() else { continue };
        let t = pts as f64 * f64::from(ist_time_base);
        if t < t0 {
            continue;
        }
        if t > t1 {
            break;
        }

        let base_pts = *first_pts.get_or_insert(pts);
        let base_dts = *first_dts.get_or_insert(packet.dts().unwrap_or(pts));
        packet.set_pts(Some(pts - base_pts));
        if let Some(dts) = packet.dts() {
            packet.set_dts(Some(dts - base_dts));
        }
        packet.rescale_ts(ist_time_base, ost_time_base);
        packet.set_position(-1);
        packet.set_stream(0);
        packet.write_interleaved(&mut octx)?;
        copied += 1;
    }

    octx.write_trailer()?;
    Ok(copied)
}

/// Trims a media file (legacy texture videos) to the frame window
/// `[first_frame, last_frame]`, deriving the time window from the file's
/// own video frame rate. All audio/video/subtitle streams are copied.
pub fn trim_media_file(
    input: &Path,
    output: &Path,
    first_frame: u32,
    last_frame: u32,
) -> Result<()> {
    init_ffmpeg();

    let mut ictx = ffmpeg::format::input(&input)?;
    let fps = {
        let vs = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(Error::NoVideoStream)?;
        f64::from(vs.rate())
    };
    let t0 = f64::from(first_frame) / fps;
    let t1 = f64::from(last_frame + 1) / fps;

    let n_streams = ictx.nb_streams() as usize;
    let mut stream_mapping: Vec<i32> = vec![-1; n_streams];
    let mut ist_time_bases = vec![ffmpeg::Rational(0, 1); n_streams];

    let mut octx = ffmpeg::format::output(&output)?;
    let mut out_index = 0i32;
    for (i, ist) in ictx.streams().enumerate() {
        let medium = ist.parameters().medium();
        if medium != ffmpeg::media::Type::Audio
            && medium != ffmpeg::media::Type::Video
            && medium != ffmpeg::media::Type::Subtitle
        {
            continue;
        }
        stream_mapping[i] = out_index;
        ist_time_bases[i] = ist.time_base();
        let mut ost = octx.add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))?;
        ost.set_parameters(ist.parameters());
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        out_index += 1;
    }
    octx.write_header()?;
    let ost_time_bases: Vec<ffmpeg::Rational> = octx.streams().map(|s| s.time_base()).collect();

    seek_to(&mut ictx, t0);

    // Packets interleave by rough file order, not per-stream timeline, so
    // one stream crossing the window end must not cut the others short.
    let mapped_count = out_index as usize;
    let mut finished: Vec<bool> = vec![false; n_streams];
    let mut finished_count = 0usize;
    let mut first_pts: Vec<Option<i64>> = vec![None; n_streams];
    let mut first_dts: Vec<Option<i64>> = vec![None; n_streams];
    for (stream, mut packet) in ictx.packets() {
        let i = stream.index();
        let ost_index = stream_mapping[i];
        if ost_index < 0 || finished[i] {
            continue;
        }
        let Some(pts) = packet.pts() else { continue };
        let t = pts as f64 * f64::from(ist_time_bases[i]);
        if t < t0 {
            continue;
        }
        if t > t1 {
            finished[i] = true;
            finished_count += 1;
            if finished_count == mapped_count {
                break;
            }
            continue;
        }

        let base_pts = *first_pts[i].get_or_insert(pts);
        let base_dts = *first_dts[i].get_or_insert(packet.dts().unwrap_or(pts));
        packet.set_pts(Some(pts - base_pts));
        if let Some(dts) = packet.dts() {
            packet.set_dts(Some(dts - base_dts));
        }
        packet.rescale_ts(ist_time_bases[i], ost_time_bases[ost_index as usize]);
        packet.set_position(-1);
        packet.set_stream(ost_index as usize);
        packet.write_interleaved(&mut octx)?;
    }

    octx.write_trailer()?;
    Ok(())
}

/// Seeks to the nearest keyframe at or before `t0`. Seek failure is not
/// fatal; trimming then walks from the start of the stream.
fn seek_to(ictx: &mut ffmpeg::format::context::Input, t0: f64) {
    let ts = (t0 * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
    if ictx.seek(ts, ..ts).is_err() {
        eprintln!("WARNING: failed to seek to window start, trimming from the beginning");
    }
}
