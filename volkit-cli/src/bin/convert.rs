//! Vologram converter with modifications.
//!
//! Rewrites a vologram container, optionally cutting a frame range,
//! stripping normals, resizing the texture, and trimming the audio track
//! to match the cut.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use volkit_audio::FfmpegRemuxer;
use volkit_convert::{convert, ConvertOptions};
use volkit_core::FrameStore;
use volkit_texture::BasisCodec;

#[derive(Parser)]
#[command(name = "convert")]
#[command(about = "Vologram to vologram converter with modifications")]
#[command(version)]
struct Cli {
    /// Input vols file (for single-file volograms)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Header file (for multi-file volograms)
    #[arg(long)]
    header: Option<PathBuf>,

    /// Sequence file (for multi-file volograms)
    #[arg(short, long)]
    sequence: Option<PathBuf>,

    /// Video texture file (for multi-file volograms)
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Output vols file path
    #[arg(short, long)]
    output: PathBuf,

    /// Remove normals from the output vologram
    #[arg(short = 'n', long)]
    no_normals: bool,

    /// Resize texture to the given resolution (BASIS textures only)
    #[arg(short = 't', long, value_name = "WxH", value_parser = parse_texture_size)]
    texture_size: Option<(u32, u32)>,

    /// First frame to keep (frames start at 0)
    #[arg(long)]
    start_frame: Option<u32>,

    /// Last frame to keep, inclusive
    #[arg(long)]
    end_frame: Option<u32>,
}

fn parse_texture_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("invalid texture size '{}', use WIDTHxHEIGHT (e.g. 512x512)", s))?;
    let w: u32 = w
        .parse()
        .map_err(|_| format!("invalid texture width '{}'", w))?;
    let h: u32 = h
        .parse()
        .map_err(|_| format!("invalid texture height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err("texture dimensions must be positive integers".to_string());
    }
    if w > 8192 || h > 8192 {
        return Err("texture dimensions cannot exceed 8192x8192".to_string());
    }
    Ok((w, h))
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    if let Err(e) = run(cli) {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let (Some(start), Some(end)) = (cli.start_frame, cli.end_frame) {
        if start > end {
            bail!("--start-frame ({}) is after --end-frame ({})", start, end);
        }
    }

    let mut store = if let Some(input) = &cli.input {
        FrameStore::open_single(input)
            .with_context(|| format!("Failed to open combined vologram file {}", input.display()))?
    } else {
        let header = cli
            .header
            .as_deref()
            .context("either --input or --header/--sequence/--video is required")?;
        let sequence = cli
            .sequence
            .as_deref()
            .context("--sequence is required for multi-file volograms")?;
        if cli.video.is_none() {
            bail!("--video is required for multi-file volograms");
        }
        FrameStore::open_split(header, sequence).with_context(|| {
            format!(
                "Failed to open geometry files header={} sequence={}",
                header.display(),
                sequence.display()
            )
        })?
    };

    if let Some((w, h)) = cli.texture_size {
        println!("Texture will be resized to {}x{}", w, h);
    }

    let codec = BasisCodec::new();
    let remuxer = FfmpegRemuxer;
    let opts = ConvertOptions {
        start_frame: cli.start_frame,
        end_frame: cli.end_frame,
        strip_normals: cli.no_normals,
        texture_size: cli.texture_size,
        cancel: None,
    };
    let summary = convert(&mut store, &codec, &remuxer, &cli.output, &opts)
        .context("Failed to process vologram")?;

    // Legacy volograms keep textures in a sibling video; when the range
    // shrank, cut a matching slice of it next to the output file.
    let frame_count = store.frame_count();
    if store.header().version < 13 && frame_count > 0 {
        if let Some(video) = &cli.video {
            let last = frame_count - 1;
            let end = cli.end_frame.unwrap_or(last).min(last);
            let start = cli.start_frame.unwrap_or(0).min(end);
            if start > 0 || end < last {
                trim_legacy_video(video, &cli.output, start, end)?;
            }
        }
    }

    print!(
        "Successfully converted vologram to {}",
        cli.output.display()
    );
    if summary.normals_removed {
        print!(" (normals removed)");
    }
    println!();
    if let (Some(t), Some(e)) = (summary.avg_transcode_ms, summary.avg_encode_ms) {
        println!(
            "Texture resize averages: {:.1} ms transcode, {:.1} ms encode per frame",
            t, e
        );
    }
    Ok(())
}

fn trim_legacy_video(video: &Path, output: &Path, first: u32, last: u32) -> Result<()> {
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("texture");
    let out_dir = output.parent().unwrap_or_else(|| Path::new("."));
    let out_video = out_dir.join(format!("{}_{}_{}.mp4", stem, first, last));
    volkit_audio::trim_media_file(video, &out_video, first, last)
        .with_context(|| format!("Failed to trim texture video {}", video.display()))?;
    println!("Wrote trimmed texture video {}", out_video.display());
    Ok(())
}
