//! Reads a raw VP8 keyframe partition blob (control partition + residual
//! partitions, as stripped from a WebP `VP8 ` chunk by the caller) and
//! writes the decoded picture as a Y4M file.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use log::error;

use vp8dec::emit::FrameBuffer;
use vp8dec::header::{FrameTag, PictureDimensions};
use vp8dec::y4m::Y4MWriter;
use vp8dec::{decode, DecodeOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode a raw VP8 keyframe partition into a Y4M file")]
struct Cli {
    /// Path to the raw VP8 partition blob (control partition first)
    input: PathBuf,

    /// Path to write the decoded Y4M file to
    output: PathBuf,

    #[arg(long)]
    width: u16,

    #[arg(long)]
    height: u16,

    /// Length in bytes of the control (first) partition
    #[arg(long)]
    partition_length: u32,

    /// VP8 profile/version (0-3); only affects loop-filter selection here
    #[arg(long, default_value_t = 0)]
    version: u8,

    #[arg(long)]
    no_loop_filter: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let frame_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to read {:?}: {e}", cli.input);
            std::process::exit(1);
        }
    };

    let tag = FrameTag {
        key_frame: true,
        show_frame: true,
        version: cli.version,
        partition_length: cli.partition_length,
    };
    let picture = PictureDimensions {
        width: cli.width,
        height: cli.height,
        x_scale: 0,
        y_scale: 0,
    };
    let options = DecodeOptions {
        apply_loop_filter: !cli.no_loop_filter,
    };

    let mut fb = FrameBuffer {
        width: cli.width as usize,
        height: cli.height as usize,
        ..FrameBuffer::default()
    };

    if let Err(e) = decode(&frame_bytes, tag, picture, options, &mut fb) {
        error!("decode failed: {e}");
        std::process::exit(1);
    }

    let out = match File::create(&cli.output) {
        Ok(f) => f,
        Err(e) => {
            error!("failed to create {:?}: {e}", cli.output);
            std::process::exit(1);
        }
    };
    let mut writer = match Y4MWriter::new(BufWriter::new(out), fb.width, fb.height) {
        Ok(w) => w,
        Err(e) => {
            error!("failed to write Y4M header: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = writer.write_frame(&fb) {
        error!("failed to write Y4M frame: {e}");
        std::process::exit(1);
    }
}
