//! Per-frame export loop: OBJ + MTL + still image.

use crate::obj::{write_mtl_file, write_obj_file};
use crate::video::TextureVideo;
use crate::{Error, ImageWriter, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use volkit_core::{FrameStore, TextureCompression};
use volkit_texture::TextureCodec;

/// Where the frames come from.
pub enum ExportInput {
    /// Single-file vologram.
    Single(PathBuf),
    /// Legacy split files plus the texture video.
    Split {
        header: PathBuf,
        sequence: PathBuf,
        video: PathBuf,
    },
}

/// Export knobs, mirroring the command-line surface.
pub struct ExportOptions {
    pub first: u32,
    pub last: u32,
    /// Export every frame; `first`/`last` are ignored.
    pub all: bool,
    pub no_normals: bool,
    pub output_dir: PathBuf,
    pub prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            first: 0,
            last: 0,
            all: false,
            no_normals: false,
            output_dir: PathBuf::from("."),
            prefix: "output_frame_".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub frames_exported: u32,
    pub images_written: u32,
}

/// Exports the requested frame range as OBJ + MTL (+ image) triples into
/// `output_dir`, plus a `list_key_frames.txt` naming the exported frames
/// that were keyframes in the source.
pub fn export(
    input: &ExportInput,
    codec: &dyn TextureCodec,
    images: &dyn ImageWriter,
    opts: &ExportOptions,
) -> Result<ExportSummary> {
    let mut store = match input {
        ExportInput::Single(path) => FrameStore::open_single(path)?,
        ExportInput::Split {
            header, sequence, ..
        } => FrameStore::open_split(header, sequence)?,
    };

    std::fs::create_dir_all(&opts.output_dir)?;

    // Losing the keyframe list is not worth failing the export over.
    let keyframes_path = opts.output_dir.join("list_key_frames.txt");
    let mut keyframes_file = match File::create(&keyframes_path) {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!(
                "WARNING: cannot open `{}` for writing: {}",
                keyframes_path.display(),
                e
            );
            None
        }
    };

    let n_frames = store.frame_count();
    if n_frames == 0 || opts.first >= n_frames {
        return Err(Error::Container(volkit_core::Error::FrameOutOfRange {
            index: opts.first,
            count: n_frames,
        }));
    }
    let first = if opts.all { 0 } else { opts.first };
    let last = if opts.all {
        n_frames - 1
    } else {
        opts.last.max(first).min(n_frames - 1)
    };

    let header = store.header().clone();
    let mut images_written = 0u32;

    for i in first..=last {
        let mesh_name = format!("{}{:05}.obj", opts.prefix, i);
        let mtl_name = format!("{}{:05}.mtl", opts.prefix, i);
        let img_name = format!("{}{:05}.jpg", opts.prefix, i);
        let material_name = format!("vol_mtl_{:05}", i);

        let key_idx = store.previous_keyframe_index(i)?;
        store.load_keyframe(key_idx)?;
        store.read_frame(i)?;

        if key_idx == i {
            if let Some(f) = keyframes_file.as_mut() {
                let _ = writeln!(f, "{}{:05}", opts.prefix, i);
            }
        }

        let corrupt = || volkit_core::Error::CorruptFrame { frame: i };
        let cur = store.current_view().ok_or_else(corrupt)?;
        let key = store.keyframe_view().ok_or_else(corrupt)?;
        let indices = key.indices().ok_or_else(corrupt)?;
        let texcoords = key.uvs().ok_or_else(corrupt)?;
        let normals = if opts.no_normals { None } else { cur.normals() };

        write_obj_file(
            &opts.output_dir.join(&mesh_name),
            Some(&mtl_name),
            &material_name,
            cur.vertices(),
            texcoords,
            normals,
            indices,
        )?;
        write_mtl_file(
            &opts.output_dir.join(&mtl_name),
            &material_name,
            &img_name,
        )?;
        println!("Wrote mesh file `{}`", mesh_name);

        // v13 embeds a compressed texture per frame; transcode and save.
        if header.has_frame_textures() && header.texture_compression != TextureCompression::Raw {
            if let Some(payload) = cur.texture() {
                if !payload.is_empty() {
                    let decoded = codec.transcode_rgba(payload)?;
                    images.write(
                        &opts.output_dir.join(&img_name),
                        &decoded.rgba,
                        decoded.width,
                        decoded.height,
                        4,
                    )?;
                    images_written += 1;
                }
            }
        }
    }

    // Legacy volograms pull texture frames from the sibling video.
    if header.version < 13 {
        if let ExportInput::Split { video, .. } = input {
            images_written += export_video_frames(video, images, opts, first, last)?;
        }
    }

    Ok(ExportSummary {
        frames_exported: last - first + 1,
        images_written,
    })
}

fn export_video_frames(
    video: &Path,
    images: &dyn ImageWriter,
    opts: &ExportOptions,
    first: u32,
    last: u32,
) -> Result<u32> {
    let mut reader = TextureVideo::open(video)?;
    let n_video_frames = reader.frame_count();
    if n_video_frames > 0 && u64::from(first) >= n_video_frames {
        return Err(Error::Container(volkit_core::Error::FrameOutOfRange {
            index: first,
            count: n_video_frames as u32,
        }));
    }

    let mut written = 0u32;
    reader.decode_frames(|idx, rgb, w, h| {
        let idx = idx as u32;
        if idx < first {
            return Ok(true);
        }
        if idx > last {
            return Ok(false);
        }
        let img_name = format!("{}{:05}.jpg", opts.prefix, idx);
        images.write(&opts.output_dir.join(&img_name), rgb, w, h, 3)?;
        println!("Wrote image file `{}`", img_name);
        written += 1;
        Ok(true)
    })?;
    Ok(written)
}
