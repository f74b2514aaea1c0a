//! Legacy split-file vologram cutter.
//!
//! Takes a directory holding `header.vols`, `sequence_0.vols` and texture
//! videos, cuts the requested frame range, and writes a new vologram into
//! the output directory. The first frame of the cut is turned into a
//! keyframe when the range opens on an inter-frame.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use volkit_convert::cut_split;

#[derive(Parser)]
#[command(name = "cut")]
#[command(about = "Cut a frame range out of a split-file vologram")]
#[command(version)]
struct Cli {
    /// Input directory containing header.vols and sequence_0.vols
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory (created if absent)
    #[arg(short, long)]
    output: PathBuf,

    /// First frame of the cut (the first frame in a sequence is 0)
    #[arg(short, long)]
    first: u32,

    /// Last frame of the cut, inclusive
    #[arg(short, long)]
    last: u32,
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
    if cli.first > cli.last {
        bail!("first frame ({}) cannot be greater than the last frame ({})", cli.first, cli.last);
    }

    let summary = cut_split(&cli.input, &cli.output, cli.first, cli.last)
        .with_context(|| format!("Failed to cut vologram in {}", cli.input.display()))?;

    println!(
        "Successfully wrote {} frames to {}",
        summary.frames_written,
        cli.output.display()
    );
    if summary.videos_trimmed > 0 {
        println!("Trimmed {} texture video(s)", summary.videos_trimmed);
    }
    Ok(())
}
