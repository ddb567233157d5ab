//! TUI module for soundstage
//!
//! Shows the transport, the live visualizer and the equalizer, and maps keys
//! onto the player.

mod equalizer;
mod transport;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use soundstage::visualizer::terminal::SceneWidget;
use std::time::Duration;

use crate::app::Player;
use equalizer::render_equalizer;
use transport::render_transport;

pub struct UiApp {
    player: Player,
    should_quit: bool,
}

impl UiApp {
    pub fn new(player: Player) -> Self {
        Self {
            player,
            should_quit: false,
        }
    }

    /// Run the UI event loop until quit, then tear the session down
    pub fn run(mut self, mut terminal: DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.player.tick();

            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.player.shutdown();
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        let player = &mut self.player;
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => player.toggle_play(),
            KeyCode::Char('n') => player.next_track(),
            KeyCode::Char('p') => player.previous_track(),
            KeyCode::Char('[') => player.seek_by(-1.0),
            KeyCode::Char(']') => player.seek_by(1.0),
            KeyCode::Left => player.select_band(-1),
            KeyCode::Right => player.select_band(1),
            KeyCode::Up => player.nudge_band(1.0),
            KeyCode::Down => player.nudge_band(-1.0),
            KeyCode::Char('e') => player.cycle_eq_preset(),
            KeyCode::Char('r') => player.reset_eq(),
            KeyCode::Char('s') => player.cycle_spatial_preset(),
            KeyCode::Char('a') => player.move_source(-0.5),
            KeyCode::Char('d') => player.move_source(0.5),
            KeyCode::Char('c') => player.cycle_compression(),
            KeyCode::Char('-') => player.change_volume(false),
            KeyCode::Char('+') | KeyCode::Char('=') => player.change_volume(true),
            KeyCode::Char('v') => player.cycle_visual_mode(),
            KeyCode::Char('o') => player.toggle_online(),
            KeyCode::Char('u') => player.toggle_sign_in(),
            KeyCode::Char('f') => player.flush(),
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),  // Transport bar
                Constraint::Min(8),     // Visualizer
                Constraint::Length(12), // Equalizer
                Constraint::Length(1),  // Help bar
            ])
            .split(area);

        render_transport(frame, chunks[0], &self.player);

        let block = Block::default()
            .title(format!(" {:?} ", self.player.mode))
            .borders(Borders::ALL);
        let inner = block.inner(chunks[1]);
        // braille cells are 2x4 dots
        self.player
            .canvas
            .set_size(inner.width as f32 * 2.0, inner.height as f32 * 4.0);
        let scene = self.player.canvas.latest();
        frame.render_widget(SceneWidget::new(&scene).block(block), chunks[1]);

        render_equalizer(frame, chunks[2], &self.player);

        let help = Paragraph::new(
            " [Q] Quit  [Space] Play/Pause  [N/P] Track  [←→] Band  [↑↓] Gain  [E] Preset  [R] Reset  [S] Space  [A/D] Pan  [C] Comp  [+/-] Vol  [V] Mode  [O] Online  [U] User  [F] Save",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
