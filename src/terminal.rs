//! Prints the timeline to stdout.

use chrono::Local;
use dayline_calendar::time_math::{current_time_offset, format_clock_time};
use dayline_calendar::{PositionedEvent, PresentationSink, TimelineLayout};

pub struct TerminalSink {
    layout: TimelineLayout,
    scroll_offset: f64,
}

impl TerminalSink {
    pub fn new(layout: TimelineLayout, scroll_offset: f64) -> Self {
        Self {
            layout,
            scroll_offset,
        }
    }

    fn now_line(&self) -> String {
        let now = Local::now();
        format!(
            "{:>7.0}px  ---- now ({}) ----",
            current_time_offset(&now, &self.layout),
            format_clock_time(&now)
        )
    }
}

impl PresentationSink for TerminalSink {
    fn render(&self, events: &[PositionedEvent]) {
        // Events ending above the saved scroll position are off screen.
        let (hidden, visible): (Vec<_>, Vec<_>) = events
            .iter()
            .partition(|e| e.top_offset_px + e.height_px < self.scroll_offset);

        if events.is_empty() {
            println!("No events today.");
        }
        if !hidden.is_empty() {
            println!("({} earlier events above)", hidden.len());
        }
        for event in visible {
            println!(
                "{:>7.0}px  {:<16} {} [{}]",
                event.top_offset_px,
                event.time_range_label(),
                event.title(),
                event.background_color
            );
        }
        println!("{}", self.now_line());
    }

    fn clear(&self) {
        println!("Timeline cleared.");
    }

    fn show_error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}
