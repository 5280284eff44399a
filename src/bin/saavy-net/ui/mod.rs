//! TUI for saavy-net
//!
//! Shows the rendered output and drives the demo tree with control messages.

mod meter;
mod scope;
mod status;

use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use tracing::{debug, warn};

use saavy_net::{graph::Network, ControlMessage, MessageSender, StreamSpec};

use crate::app::{MASTER, PAN, TONE};
use meter::{render_meter, AudioStats};
use scope::render_scope;
use status::render_status;

/// Samples shown in the scope
const SCOPE_LEN: usize = 1024;
const GAIN_STEP: f32 = 0.05;
const PAN_STEP: f32 = 0.1;

/// Static facts shown in the header
pub struct UiInit {
    pub spec: StreamSpec,
    pub backend: &'static str,
    pub paths: Vec<&'static str>,
}

/// Control-side view of the demo tree. The UI only knows what it sent.
pub struct Controls {
    pub gain: f32,
    pub pan: f32,
    pub playing: bool,
    pub muted: bool,
    pub tone_removed: bool,
    pub last_action: String,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            gain: 0.5,
            pan: 0.0,
            playing: true,
            muted: false,
            tone_removed: false,
            last_action: String::from("ready"),
        }
    }
}

pub struct UiApp<'a> {
    network: &'a mut Network,
    sender: MessageSender,
    tap: Consumer<f32>,
    init: UiInit,
    controls: Controls,
    scope: Vec<f32>,
    should_quit: bool,
}

impl<'a> UiApp<'a> {
    pub fn new(network: &'a mut Network, tap: Consumer<f32>, init: UiInit) -> Self {
        Self {
            sender: network.sender(),
            network,
            tap,
            init,
            controls: Controls::default(),
            scope: vec![0.0; SCOPE_LEN],
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_tap();
            // Stop and free whatever the render side let go of
            self.network.collect();

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    /// Keep the newest `SCOPE_LEN` samples.
    fn poll_tap(&mut self) {
        let available = self.tap.slots();
        if available == 0 {
            return;
        }
        let keep = available.min(SCOPE_LEN);
        let skip = available - keep;

        for _ in 0..skip {
            let _ = self.tap.pop();
        }
        self.scope.drain(..keep);
        while let Ok(sample) = self.tap.pop() {
            self.scope.push(sample);
            if self.scope.len() == SCOPE_LEN {
                break;
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up => self.nudge_gain(GAIN_STEP),
            KeyCode::Down => self.nudge_gain(-GAIN_STEP),
            KeyCode::Left => self.nudge_pan(-PAN_STEP),
            KeyCode::Right => self.nudge_pan(PAN_STEP),
            KeyCode::Char('m') => {
                self.controls.muted = !self.controls.muted;
                let muted = self.controls.muted;
                self.post(ControlMessage::to(MASTER, "mute").with_bool(muted));
            }
            KeyCode::Char(' ') => {
                self.controls.playing = !self.controls.playing;
                let command = if self.controls.playing { "play" } else { "pause" };
                self.post(ControlMessage::to(TONE, command));
            }
            KeyCode::Char('r') => self.post(ControlMessage::to(TONE, "rewind")),
            KeyCode::Char('x') if !self.controls.tone_removed => {
                match self.sender.remove_item(TONE) {
                    Ok(()) => {
                        self.controls.tone_removed = true;
                        self.controls.last_action = format!("remove {TONE}");
                    }
                    Err(err) => self.controls.last_action = format!("remove failed: {err}"),
                }
            }
            _ => {}
        }
    }

    fn nudge_gain(&mut self, delta: f32) {
        self.controls.gain = (self.controls.gain + delta).clamp(0.0, 1.0);
        let gain = self.controls.gain;
        self.post(ControlMessage::to(MASTER, "setgain").with_f32(gain));
    }

    fn nudge_pan(&mut self, delta: f32) {
        self.controls.pan = (self.controls.pan + delta).clamp(-1.0, 1.0);
        let pan = self.controls.pan;
        self.post(ControlMessage::to(PAN, "setpan").with_f32(pan));
    }

    fn post(&mut self, msg: ControlMessage) {
        let address = msg.address().to_owned();
        match self.sender.send(msg) {
            Ok(()) => {
                debug!(address, "sent");
                self.controls.last_action = address;
            }
            Err(err) => {
                warn!(address, error = %err, "message dropped");
                self.controls.last_action = format!("{address}: {err}");
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Status
                Constraint::Length(4), // Meter
                Constraint::Min(8),    // Scope
                Constraint::Length(1), // Help
            ])
            .split(frame.area());

        render_status(frame, chunks[0], &self.init, &self.controls);
        render_meter(frame, chunks[1], &AudioStats::from_buffer(&self.scope));
        render_scope(frame, chunks[2], &self.scope);

        let help = Paragraph::new(
            " [Q] Quit  [Up/Down] Gain  [Left/Right] Pan  [Space] Play/Pause  [R] Rewind  [M] Mute  [X] Remove tone",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
