//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use soundstage::visualizer::VisualMode;

#[derive(Parser, Debug)]
#[command(name = "soundstage")]
#[command(about = "Terminal player with equalizer, dynamics and 3D positioning", long_about = None)]
pub struct Args {
    /// WAV files to play, in order. A generated test signal is used when none are given.
    #[arg(long = "wav", value_name = "FILE")]
    pub wav: Vec<PathBuf>,

    /// User whose settings are loaded and saved
    #[arg(long, value_name = "ID")]
    pub user: Option<String>,

    /// Config file (defaults to <config dir>/soundstage/config.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Visualizer mode: bars (default), waveform, circular
    #[arg(long, value_name = "MODE", default_value = "bars")]
    pub mode: String,

    /// Start with the network marked unreachable
    #[arg(long)]
    pub offline: bool,
}

impl Args {
    pub fn visual_mode(&self) -> VisualMode {
        match self.mode.to_lowercase().as_str() {
            "waveform" => VisualMode::Waveform,
            "circular" => VisualMode::Circular,
            _ => VisualMode::Bars,
        }
    }
}
