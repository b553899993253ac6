//! kinect_body_view: interactive entry point.

use std::path::PathBuf;

use clap::Parser;
use kinect_body_view::app::run;
use kinect_body_view::config::{ReferenceBody, ViewConfig};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "kinect_body_view", version, about = "Skeletal overlay with posture calibration")]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which tracked body the calibration assistant follows.
    #[arg(long, value_enum)]
    reference: Option<ReferenceBody>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Kinect Body View : skeleton + posture calibration     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Mode: simulated sensor (keyboard)");
    println!();

    let mut cfg = match &args.config {
        Some(path) => match ViewConfig::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        },
        None => ViewConfig::default(),
    };
    if let Some(reference) = args.reference {
        cfg.reference_body = reference;
    }
    if let Some(path) = &args.config {
        info!("configuration loaded from {}", path.display());
    }

    println!("  Opening viewer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
