//! CUT: extract a frame range from a legacy split-file vologram.
//!
//! Reads `header.vols` + `sequence_0.vols` from the input directory and
//! writes the same pair, restricted to `[first, last]`, into the output
//! directory. Frames are renumbered from zero and the first emitted frame
//! is reconstituted into a keyframe when the range opens on an
//! inter-frame. Texture videos sitting next to the sequence are trimmed
//! to the same window.

use crate::{Error, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use volkit_core::frame::{write_frame, FrameArrays, Keyframe};
use volkit_core::FrameStore;

/// What a finished cut produced.
#[derive(Debug, Clone)]
pub struct CutSummary {
    pub frames_written: u32,
    pub videos_trimmed: u32,
}

/// Cuts frames `[first, last]` (inclusive, clamped to the sequence) out
/// of the vologram in `input_dir` into `output_dir`.
pub fn cut_split(input_dir: &Path, output_dir: &Path, first: u32, last: u32) -> Result<CutSummary> {
    let header_path = input_dir.join("header.vols");
    let sequence_path = input_dir.join("sequence_0.vols");
    let mut store = FrameStore::open_split(&header_path, &sequence_path)?;

    let src_hdr = store.header().clone();
    if src_hdr.frame_count == 0 {
        return Err(Error::EmptyContainer);
    }
    let last = last.min(src_hdr.frame_count - 1);
    let first = first.min(last);
    let export_count = last - first + 1;

    std::fs::create_dir_all(output_dir)?;

    println!("Updating the header file...");
    let mut out_hdr = src_hdr.clone();
    out_hdr.frame_count = export_count;
    let mut header_file = File::create(output_dir.join("header.vols"))?;
    out_hdr.write(&mut header_file)?;

    println!(
        "Writing frames between {} and {} to sequence_0.vols...",
        first, last
    );
    let file = File::create(output_dir.join("sequence_0.vols"))?;
    let mut writer = BufWriter::new(file);

    for j in 0..export_count {
        let i = first + j;
        let in_hdr = store.frame_header(i)?;
        let is_kf = in_hdr.keyframe.is_key();

        let out_kf = if j == 0 && !is_kf {
            Keyframe::Key
        } else {
            in_hdr.keyframe
        };

        if j == 0 && !is_kf {
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
            normals: cur.normals(),
            indices,
            uvs,
            texture: cur.texture(),
        };
        write_frame(&mut writer, out_hdr.version, j, out_kf, &arrays)?;
    }
    drop(writer);

    let videos_trimmed = trim_texture_videos(input_dir, output_dir, first, last)?;

    Ok(CutSummary {
        frames_written: export_count,
        videos_trimmed,
    })
}

/// Trims every `.mp4` texture video found next to the sequence into the
/// output directory, named `<stem>_<first>_<last>.mp4`. A video that
/// fails to trim is reported and skipped.
fn trim_texture_videos(
    input_dir: &Path,
    output_dir: &Path,
    first: u32,
    last: u32,
) -> Result<u32> {
    let mut trimmed = 0u32;
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("mp4") {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s,
            None => continue,
        };
        let out_path = output_dir.join(format!("{}_{}_{}.mp4", stem, first, last));
        println!("Trimming video texture file {}", path.display());
        match volkit_audio::trim_media_file(&path, &out_path, first, last) {
            Ok(()) => trimmed += 1,
            Err(e) => eprintln!(
                "WARNING: failed to trim texture video `{}`: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(trimmed)
}
