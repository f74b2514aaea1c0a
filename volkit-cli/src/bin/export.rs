//! Vologram frame to OBJ + image exporter.
//!
//! Writes one Wavefront OBJ, one MTL and one JPEG per frame so the mesh
//! sequence can be inspected in external viewers.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use volkit_export::{export, ExportInput, ExportOptions, JpegWriter};
use volkit_texture::BasisCodec;

#[derive(Parser)]
#[command(name = "export")]
#[command(about = "Vologram frame to OBJ+image converter")]
#[command(version)]
struct Cli {
    /// Single-file vologram path
    #[arg(short, long)]
    combined: Option<PathBuf>,

    /// Header file (for multi-file volograms)
    #[arg(long)]
    header: Option<PathBuf>,

    /// Sequence file (for multi-file volograms)
    #[arg(short, long)]
    sequence: Option<PathBuf>,

    /// Video texture file (for multi-file volograms)
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Frame number of the first frame to process (frames start at 0)
    #[arg(short, long, default_value_t = 0)]
    first: u32,

    /// Frame number of the last frame to process, inclusive
    #[arg(short, long)]
    last: Option<u32>,

    /// Process all frames in the sequence
    #[arg(short, long)]
    all: bool,

    /// Strip normals from the mesh before exporting
    #[arg(short = 'n', long)]
    no_normals: bool,

    /// Directory to write output files into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Prefix for output filenames
    #[arg(short, long, default_value = "output_frame_")]
    prefix: String,
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
    let input = if let Some(combined) = cli.combined {
        ExportInput::Single(combined)
    } else {
        let header = cli
            .header
            .context("either --combined or --header/--sequence/--video is required")?;
        let sequence = cli
            .sequence
            .context("--sequence is required for multi-file volograms")?;
        let video = cli
            .video
            .context("--video is required for multi-file volograms")?;
        ExportInput::Split {
            header,
            sequence,
            video,
        }
    };

    let last = cli.last.unwrap_or(cli.first);
    if cli.first > last {
        bail!("first frame ({}) cannot be greater than the last frame ({})", cli.first, last);
    }
    if cli.all {
        println!("Converting all frames");
    } else {
        println!("Converting frames {}-{}", cli.first, last);
    }

    let codec = BasisCodec::new();
    let images = JpegWriter::default();
    let opts = ExportOptions {
        first: cli.first,
        last,
        all: cli.all,
        no_normals: cli.no_normals,
        output_dir: cli.output_dir,
        prefix: cli.prefix,
    };
    let summary =
        export(&input, &codec, &images, &opts).context("Vologram processing failed")?;

    println!(
        "Vologram processing completed ({} frames, {} images).",
        summary.frames_exported, summary.images_written
    );
    Ok(())
}
