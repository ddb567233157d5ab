//! soundstage - terminal player with live enhancement
//!
//! Run with: cargo run -- --wav track.wav --user ada

mod app;
mod cli;
mod ui;

use clap::Parser;

use app::Player;
use cli::Args;
use ui::UiApp;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // stderr shares the terminal with the TUI, so only warnings by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let player = Player::from_args(&args)?;

    let terminal = ratatui::init();
    let res = UiApp::new(player).run(terminal);
    ratatui::restore();
    res
}
