//! Equalizer widget - one horizontal slider per band

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use soundstage::{equalizer::BAND_FREQUENCIES, graph::equalizer::MAX_GAIN_DB};

use crate::app::Player;

const SLIDER_HALF_WIDTH: usize = 12;

fn label(frequency: f32) -> String {
    if frequency >= 1_000.0 {
        format!("{:>4.0}k", frequency / 1_000.0)
    } else {
        format!("{:>4.0} ", frequency)
    }
}

/// Centered slider: left of the mark is cut, right is boost
fn slider(gain_db: f32) -> String {
    let steps = ((gain_db / MAX_GAIN_DB) * SLIDER_HALF_WIDTH as f32).round() as isize;
    let half = SLIDER_HALF_WIDTH as isize;
    (-half..=half)
        .map(|i| {
            if i == 0 {
                '┃'
            } else if (steps < 0 && i >= steps && i < 0) || (steps > 0 && i <= steps && i > 0) {
                '█'
            } else {
                '─'
            }
        })
        .collect()
}

pub fn render_equalizer(frame: &mut Frame, area: Rect, player: &Player) {
    let equalizer = player.enhancer.equalizer();
    let block = Block::default()
        .title(format!(" Equalizer: {} ", equalizer.selected_preset()))
        .borders(Borders::ALL);

    let lines: Vec<Line> = BAND_FREQUENCIES
        .iter()
        .enumerate()
        .map(|(i, &frequency)| {
            let gain = equalizer.gain(i).unwrap_or(0.0);
            let style = if i == player.selected_band {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!(" {}Hz ", label(frequency)), style),
                Span::styled(slider(gain), style),
                Span::styled(format!(" {:+5.1} dB", gain), style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
