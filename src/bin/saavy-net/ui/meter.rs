//! Peak and RMS meters

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Gauge},
    Frame,
};

use saavy_net::dsp::gain::{gain_to_db, MIN_DB};

/// Levels of the most recent scope window
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

/// Map a linear level onto 0..1 of a dB scale.
fn meter_ratio(level: f32) -> f64 {
    let db = gain_to_db(level);
    ((db - MIN_DB) / -MIN_DB).clamp(0.0, 1.0) as f64
}

fn level_color(level: f32) -> Color {
    match gain_to_db(level) {
        db if db > -1.0 => Color::Red,
        db if db > -12.0 => Color::Yellow,
        _ => Color::Green,
    }
}

pub fn render_meter(frame: &mut Frame, area: Rect, stats: &AudioStats) {
    let block = Block::default().title(" Level ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    for (row, (name, level)) in rows.iter().zip([("Peak", stats.peak), ("RMS ", stats.rms)]) {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(level_color(level)))
            .ratio(meter_ratio(level))
            .label(format!("{name} {:>6.1} dB", gain_to_db(level)));
        frame.render_widget(gauge, *row);
    }
}
