//! Header: stream layout, item paths, and the control state

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{Controls, UiInit};

pub fn render_status(frame: &mut Frame, area: Rect, init: &UiInit, controls: &Controls) {
    let block = Block::default().title(" saavy-net ").borders(Borders::ALL);

    let transport = if controls.tone_removed {
        ("removed", Color::DarkGray)
    } else if controls.playing {
        ("▶ playing", Color::Green)
    } else {
        ("⏸ paused", Color::Yellow)
    };

    let stream = Line::from(vec![
        Span::styled(
            format!(" {:.1}kHz  ", init.spec.sample_rate / 1000.0),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} out  ", init.spec.output_channels),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("[{}]  ", init.backend),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            init.paths.join("  "),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let state = Line::from(vec![
        Span::styled(format!(" {}  ", transport.0), Style::default().fg(transport.1)),
        Span::styled(
            format!("gain {:.2}{}  ", controls.gain, if controls.muted { " (muted)" } else { "" }),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("pan {:+.1}  ", controls.pan),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("last: {}", controls.last_action),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    frame.render_widget(Paragraph::new(vec![stream, state]).block(block), area);
}
