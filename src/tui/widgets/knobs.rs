use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge};

use crate::app::{Knob, Knobs};
use crate::audio::SAMPLE_RATE;
use crate::looper::MIN_LOOP_LENGTH;

/// Render the knob panel, one gauge per knob
pub fn render(frame: &mut Frame, area: Rect, knobs: &Knobs, selected: Knob, buffer_seconds: u32) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3); 4])
        .split(area);

    for (knob, row) in Knob::ALL.iter().zip(rows.iter()) {
        let is_selected = *knob == selected;
        let border_color = if is_selected { Color::Yellow } else { Color::DarkGray };
        let title = if is_selected {
            format!(" > {} ", knob.label())
        } else {
            format!(" {} ", knob.label())
        };

        let value = knobs.get(*knob);
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border_color)),
            )
            .gauge_style(Style::default().fg(knob_color(*knob)).bg(Color::Black))
            .ratio(f64::from(value))
            .label(knob_readout(*knob, knobs, buffer_seconds));

        frame.render_widget(gauge, *row);
    }
}

fn knob_color(knob: Knob) -> Color {
    match knob {
        Knob::LoopStart => Color::Cyan,
        Knob::LoopLength => Color::Blue,
        Knob::Pitch => Color::Magenta,
        Knob::WetDry => Color::Green,
    }
}

/// Human readable value for a knob
pub fn knob_readout(knob: Knob, knobs: &Knobs, buffer_seconds: u32) -> String {
    let buffer_seconds = buffer_seconds as f32;
    match knob {
        Knob::LoopStart => format!("{:.2}s", knobs.loop_start * buffer_seconds),
        Knob::LoopLength => {
            let min_seconds = MIN_LOOP_LENGTH / SAMPLE_RATE as f32;
            format!("{:.2}s", (knobs.loop_length * buffer_seconds).max(min_seconds))
        }
        Knob::Pitch => {
            let speed = knobs.playback_speed();
            if speed == 0.0 {
                "stopped".to_string()
            } else {
                format!("{:+.2}x", speed)
            }
        }
        Knob::WetDry => format!("{:.0}% wet", knobs.wet_dry * 100.0),
    }
}
