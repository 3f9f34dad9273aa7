use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::audio::SAMPLE_RATE;
use crate::looper::MeterReading;

/// Render the loop panel: buffer map, play position and punch state
pub fn render(frame: &mut Frame, area: Rect, reading: &MeterReading, underruns: u64) {
    let (status, color) = if reading.recording {
        ("RECORDING", Color::Red)
    } else if reading.rec_envelope > 0.0 {
        ("PUNCH OUT", Color::Yellow)
    } else if reading.empty {
        ("EMPTY", Color::Gray)
    } else {
        ("PLAYING", Color::Green)
    };

    let block = Block::default()
        .title(format!(" Loop [{}] ", status))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let bar_width = area.width.saturating_sub(4) as usize;
    let seconds = |samples: f32| samples / SAMPLE_RATE as f32;

    let lines = vec![
        Line::from(Span::styled(loop_bar(bar_width, reading), Style::default().fg(Color::Cyan))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Position: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.2}s / {:.2}s", seconds(reading.play_head), seconds(reading.loop_length)),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Punch:    ", Style::default().fg(Color::Gray)),
            Span::styled(meter_bar(20, reading.rec_envelope), Style::default().fg(color)),
        ]),
        Line::from(vec![
            Span::styled("Peak:     ", Style::default().fg(Color::Gray)),
            Span::styled(meter_bar(20, reading.peak), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("Underruns: ", Style::default().fg(Color::Gray)),
            Span::styled(
                underruns.to_string(),
                Style::default().fg(if underruns > 0 { Color::Yellow } else { Color::DarkGray }),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

/// Map of the whole buffer: the loop window in heavy line, the play head as a marker.
///
/// The window may wrap past the end of the buffer.
pub fn loop_bar(width: usize, reading: &MeterReading) -> String {
    if width == 0 {
        return String::new();
    }

    let start = reading.loop_start_fraction();
    let length = reading.loop_length_fraction();
    let head = (start + length * reading.progress()).fract();
    let head_cell = ((head * width as f32) as usize).min(width - 1);

    (0..width)
        .map(|cell| {
            let centre = (cell as f32 + 0.5) / width as f32;
            let offset = (centre - start).rem_euclid(1.0);
            if cell == head_cell {
                '|'
            } else if offset < length {
                '━'
            } else {
                '─'
            }
        })
        .collect()
}

/// Horizontal level bar for a value in 0.0 to 1.0
fn meter_bar(width: usize, level: f32) -> String {
    let filled = ((level.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
