//! Transport bar widget - track, play state, volume, sync and features

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use soundstage::{platform::Connectivity, SyncStatus};

use crate::app::Player;

fn sync_label(status: SyncStatus) -> (&'static str, Color) {
    match status {
        SyncStatus::Idle => ("idle", Color::DarkGray),
        SyncStatus::Pending => ("pending", Color::Yellow),
        SyncStatus::Saving => ("saving", Color::Cyan),
        SyncStatus::Saved => ("saved", Color::Green),
        SyncStatus::Error => ("error", Color::Red),
    }
}

fn feature(name: &'static str, on: bool) -> Span<'static> {
    let color = if on { Color::Green } else { Color::DarkGray };
    Span::styled(format!("{} ", name), Style::default().fg(color))
}

/// Render the transport bar
pub fn render_transport(frame: &mut Frame, area: Rect, player: &Player) {
    let block = Block::default().title(" soundstage ").borders(Borders::ALL);

    let playing = player.playback.is_playing();
    let play_symbol = if playing { "▶" } else { "⏸" };
    let title = player
        .playback
        .current()
        .map(|track| track.title.as_str())
        .unwrap_or("no track");
    let position = player.playback.state().position_secs;

    let enhancer = &player.enhancer;
    let (sync, sync_color) = sync_label(enhancer.sync_status());
    let online = player.connectivity.is_online();
    let user = enhancer.user_id().unwrap_or("signed out");

    let status = Line::from(vec![
        Span::styled(
            format!(" {} {}  ", play_symbol, title),
            Style::default().fg(if playing { Color::Green } else { Color::Yellow }),
        ),
        Span::styled(
            format!("{:02}:{:04.1}  ", (position / 60.0) as u32, position % 60.0),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Vol {}  ", enhancer.master_volume()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(format!("{}  ", user), Style::default().fg(Color::Magenta)),
        Span::styled(format!("sync: {}  ", sync), Style::default().fg(sync_color)),
        Span::styled(
            if online { "online" } else { "offline" },
            Style::default().fg(if online { Color::Green } else { Color::Red }),
        ),
    ]);

    let caps = enhancer.capabilities();
    let spatial = enhancer.spatial();
    let compression = spatial.compression();
    let mut details = vec![
        Span::raw(" "),
        feature("EQ", caps.has_equalizer),
        feature("COMP", caps.has_compression),
        feature("3D", caps.has_spatial_audio),
        feature("VIS", caps.has_visualizer),
        Span::styled(
            format!(
                " {} ({:.1}, {:.1}, {:.1})  {:.0} dB {:.0}:1",
                spatial.spatial_preset(),
                spatial.position().x,
                spatial.position().y,
                spatial.position().z,
                compression.threshold_db,
                compression.ratio
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(message) = &player.message {
        details.push(Span::styled(format!("  {}", message), Style::default().fg(Color::Red)));
    }

    let paragraph = Paragraph::new(vec![status, Line::from(details)]).block(block);
    frame.render_widget(paragraph, area);
}
