use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod check;
mod config;
mod detect;
mod monitor;
mod report;
mod setup;

use config::{Config, OutputFormat, PolicyKind};

#[derive(Parser)]
#[command(name = "blinkcheck", version, about = "Blink-based liveness demo on a live camera feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the camera and print a liveness verdict per frame (default)
    Run(RunArgs),
    /// Verify the cascade files and load them
    Check {
        /// Cascade directory (default: $BLINKCHECK_CASCADE_DIR or the data dir)
        #[arg(long)]
        cascade_dir: Option<PathBuf>,
    },
    /// Outline the faces in an image file and write an annotated copy
    Detect {
        /// Image to scan
        image: PathBuf,
        /// Where to write the annotated image
        #[arg(long, default_value = detect::DEFAULT_OUTPUT)]
        output: PathBuf,
        /// Cascade directory (default: $BLINKCHECK_CASCADE_DIR or the data dir)
        #[arg(long)]
        cascade_dir: Option<PathBuf>,
    },
    /// Download the face and eye cascades
    Setup {
        /// Target directory (default: $BLINKCHECK_CASCADE_DIR or the data dir)
        #[arg(long)]
        cascade_dir: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Camera device index
    #[arg(long)]
    camera: Option<i32>,
    /// Requested frame width
    #[arg(long)]
    width: Option<i32>,
    /// Requested frame height
    #[arg(long)]
    height: Option<i32>,
    /// Directory holding the cascade XML files
    #[arg(long)]
    cascade_dir: Option<PathBuf>,
    /// Liveness policy
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,
    /// Blink window in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,
    /// Blinks (window policy) or frames (consecutive policy) required
    #[arg(long)]
    count: Option<usize>,
    /// Verdict output format
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,
    /// Stop after this many evaluated frames
    #[arg(long)]
    max_frames: Option<u64>,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(v) = self.camera {
            config.camera_index = v;
        }
        if let Some(v) = self.width {
            config.frame_width = v;
        }
        if let Some(v) = self.height {
            config.frame_height = v;
        }
        if let Some(v) = &self.cascade_dir {
            config.cascade_dir = v.clone();
        }
        if let Some(v) = self.policy {
            config.policy = v;
        }
        if let Some(v) = self.window_ms {
            config.blink_window_ms = v;
        }
        if let Some(v) = self.count {
            config.blink_count = v;
        }
        if let Some(v) = self.output {
            config.output = v;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => {
            args.apply(&mut config);
            monitor::run(&config, args.max_frames)
        }
        Command::Check { cascade_dir } => check::run(&cascade_dir.unwrap_or(config.cascade_dir)),
        Command::Detect {
            image,
            output,
            cascade_dir,
        } => {
            if let Some(dir) = cascade_dir {
                config.cascade_dir = dir;
            }
            detect::run(&config.face_cascade_path(), &image, &output).map(|_| ())
        }
        Command::Setup { cascade_dir } => setup::run(&cascade_dir.unwrap_or(config.cascade_dir)),
    }
}
