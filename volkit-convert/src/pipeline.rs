//! CONVERT: rewrite a container applying range, normals, texture and
//! audio modifications.

use crate::progress::Progress;
use crate::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use volkit_audio::{frame_window, AudioRemuxer};
use volkit_core::frame::{write_frame, FrameArrays, Keyframe};
use volkit_core::{FrameStore, TextureCompression, TextureContainer};
use volkit_texture::{ProcessedTexture, TextureCodec, TexturePipeline};

/// Conversion knobs. Defaults are a full-range identity rewrite.
#[derive(Default, Clone)]
pub struct ConvertOptions {
    /// First input frame to keep (default 0).
    pub start_frame: Option<u32>,
    /// Last input frame to keep, inclusive (default last).
    pub end_frame: Option<u32>,
    pub strip_normals: bool,
    /// Target texture dimensions; BASIS payloads only.
    pub texture_size: Option<(u32, u32)>,
    /// Checked after each written frame; set to abort cooperatively.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// What a finished conversion did, for the caller's summary line.
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub frames_written: u32,
    pub normals_removed: bool,
    pub texture_resized: bool,
    pub audio_trimmed: bool,
    pub avg_transcode_ms: Option<f64>,
    pub avg_encode_ms: Option<f64>,
}

/// Runs the conversion, streaming frames from `store` into a new
/// container at `output`. On error the partial output file is left on
/// disk but must be treated as invalid.
pub fn convert(
    store: &mut FrameStore,
    codec: &dyn TextureCodec,
    remuxer: &dyn AudioRemuxer,
    output: &Path,
    opts: &ConvertOptions,
) -> Result<ConvertSummary> {
    let src_hdr = store.header().clone();
    if src_hdr.frame_count == 0 {
        return Err(Error::EmptyContainer);
    }

    let last = src_hdr.frame_count - 1;
    let end = opts.end_frame.unwrap_or(last).min(last);
    let start = opts.start_frame.unwrap_or(0).min(end);
    let export_count = end - start + 1;
    let range_trim = start > 0 || end < last;

    // Bounds are checked even when the resize cannot apply.
    TexturePipeline::new(codec, opts.texture_size)?;

    let resizable = src_hdr.version >= 13
        && src_hdr.texture_container_format == TextureContainer::Basis
        && matches!(
            src_hdr.texture_compression,
            TextureCompression::Etc1s | TextureCompression::Uastc
        );
    let wants_resize = match opts.texture_size {
        Some(dims) => {
            src_hdr.has_frame_textures()
                && dims != (src_hdr.texture_width, src_hdr.texture_height)
        }
        None => false,
    };
    if wants_resize && !resizable {
        eprintln!(
            "WARNING: texture resizing is only supported for BASIS textures in version 13+ volograms"
        );
    }
    let resize_applies = wants_resize && resizable;
    let tex_pipeline =
        TexturePipeline::new(codec, if resize_applies { opts.texture_size } else { None })?;

    // Header mutation. The BASIS container format and compression variant
    // survive a resize; only the dimensions change.
    let strip = opts.strip_normals && src_hdr.has_normals();
    let mut out_hdr = src_hdr.clone();
    out_hdr.frame_count = export_count;
    if opts.strip_normals {
        out_hdr.normals = false;
    }
    if resize_applies {
        let (w, h) = opts.texture_size.unwrap_or_default();
        out_hdr.texture_width = w;
        out_hdr.texture_height = h;
    }

    // Audio is emitted exactly once, immediately after the header. A
    // range cut trims the stream to the matching time window.
    let mut audio_trimmed = false;
    let audio_out: Option<Vec<u8>> = if src_hdr.version >= 13 && src_hdr.audio {
        let data = store.audio_data().unwrap_or(&[]).to_vec();
        if range_trim && !data.is_empty() {
            let (t0, t1) = frame_window(start, end, src_hdr.fps);
            println!(
                "Trimming audio from {:.3} to {:.3} seconds (frames {} to {})",
                t0, t1, start, end
            );
            audio_trimmed = true;
            Some(remuxer.trim(&data, t0, t1)?)
        } else {
            Some(data)
        }
    } else {
        None
    };

    if out_hdr.version >= 13 {
        out_hdr.audio = audio_out.is_some();
        out_hdr.audio_start = out_hdr.serialized_size();
        out_hdr.frame_body_start = out_hdr.audio_start
            + audio_out.as_ref().map_or(0, |a| 4 + a.len() as u32);
    }

    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    out_hdr.write(&mut writer)?;
    if let Some(audio) = &audio_out {
        writer.write_u32::<LittleEndian>(audio.len() as u32)?;
        writer.write_all(audio)?;
    }

    let mut transcode_total = 0.0f64;
    let mut encode_total = 0.0f64;
    let mut timed_frames = 0u32;
    let mut progress = Progress::new(u64::from(export_count), "Converting frames:");

    for j in 0..export_count {
        let i = start + j;
        let in_hdr = store.frame_header(i)?;
        let is_kf = in_hdr.keyframe.is_key();

        // The emitted range must open on a keyframe and close on an end
        // keyframe; interior frames keep their flags. When both endpoints
        // are one and the same reconstituted frame, it opens the range.
        let out_kf = if is_kf {
            in_hdr.keyframe
        } else if j == 0 {
            Keyframe::Key
        } else if j == export_count - 1 {
            Keyframe::EndKey
        } else {
            Keyframe::Inter
        };

        if out_kf.is_key() && !is_kf {
            let k = store.previous_keyframe_index(i)?;
            println!(
                "Frame {} is not a keyframe. Copying indices and uvs from keyframe {}.",
                i, k
            );
            store.load_keyframe(k)?;
        }
        store.read_frame(i)?;
        let corrupt = || volkit_core::Error::CorruptFrame { frame: i };
        let cur = store.current_view().ok_or_else(corrupt)?;

        let mut processed: Option<ProcessedTexture> = None;
        if src_hdr.has_frame_textures() {
            if let Some(tex) = cur.texture() {
                if !tex.is_empty() {
                    let p = tex_pipeline.process(
                        tex,
                        (src_hdr.texture_width, src_hdr.texture_height),
                        src_hdr.texture_compression,
                        src_hdr.texture_container_format,
                    )?;
                    if let Some(t) = p.timing {
                        transcode_total += t.transcode_ms;
                        encode_total += t.encode_ms;
                        timed_frames += 1;
                    }
                    processed = Some(p);
                }
            }
        }
        let texture: Option<&[u8]> = if src_hdr.has_frame_textures() {
            match &processed {
                Some(p) => Some(&p.data),
                None => cur.texture(),
            }
        } else {
            None
        };

        let (indices, uvs) = if out_kf.is_key() {
            let source = if is_kf {
                cur
            } else {
                store.keyframe_view().ok_or_else(corrupt)?
            };
            (
                Some(source.indices().ok_or_else(corrupt)?),
                Some(source.uvs().ok_or_else(corrupt)?),
            )
        } else {
            (None, None)
        };

        let arrays = FrameArrays {
            vertices: cur.vertices(),
            normals: if strip { None } else { cur.normals() },
            indices,
            uvs,
            texture,
        };
        write_frame(&mut writer, out_hdr.version, j, out_kf, &arrays)?;

        progress.step(10);

        if let Some(flag) = &opts.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
        }
    }

    writer.flush()?;

    let (avg_transcode_ms, avg_encode_ms) = if timed_frames > 0 {
        (
            Some(transcode_total / f64::from(timed_frames)),
            Some(encode_total / f64::from(timed_frames)),
        )
    } else {
        (None, None)
    };

    Ok(ConvertSummary {
        frames_written: export_count,
        normals_removed: strip,
        texture_resized: resize_applies,
        audio_trimmed,
        avg_transcode_ms,
        avg_encode_ms,
    })
}
