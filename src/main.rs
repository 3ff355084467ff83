// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "photo-booth")]
#[command(about = "Four-cut photo booth: timed webcam shots composed into a strip")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Shoot four timed photos and save the composite (default)
    Shoot {
        /// Camera index to use (from 'photo-booth list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Use image files or directories as the camera instead of a device
        #[arg(short, long)]
        source: Vec<PathBuf>,

        /// Keep shots unmirrored
        #[arg(long)]
        no_mirror: bool,

        #[command(flatten)]
        style: cli::StyleArgs,

        /// Output file or directory (default: ~/Pictures/PhotoBooth/ascii-4-cuts-MILLIS.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compose existing images into a composite
    Compose {
        /// Image files or directories (the first four images are used)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        style: cli::StyleArgs,

        /// Output file or directory (default: ~/Pictures/PhotoBooth/ascii-4-cuts-MILLIS.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=photo_booth=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Shoot {
            camera,
            source,
            no_mirror,
            style,
            output,
        }) => cli::shoot(cli::ShootOptions {
            camera,
            source,
            no_mirror,
            style,
            output,
        }),
        Some(Commands::Compose {
            inputs,
            style,
            output,
        }) => cli::compose_images(inputs, style, output),
        None => cli::shoot(cli::ShootOptions::default()),
    }
}
