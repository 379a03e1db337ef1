//! Toast notification component
//!
//! A non-blocking overlay that auto-dismisses after a few seconds. Renders in
//! the bottom-right corner on top of all other content. Error toasts stay
//! visible slightly longer than info toasts.

use crate::events::ToastKind;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

/// A toast notification that auto-dismisses
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    created_at: Instant,
    duration: Duration,
}

impl Toast {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        let duration = match kind {
            ToastKind::Info => Duration::from_secs(3),
            ToastKind::Error => Duration::from_secs(5),
        };
        Self {
            message: message.into(),
            kind,
            created_at: Instant::now(),
            duration,
        }
    }

    /// Check if the toast has expired and should be removed
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }

    /// Render the toast in the bottom-right corner
    ///
    /// Uses `Clear` so the toast is visible on top of other content.
    pub fn render(&self, f: &mut Frame, area: Rect) {
        let width = (self.message.width() as u16 + 4).min(area.width.saturating_sub(4));
        let height = 3; // 1 line of text + 2 for borders

        // Position: bottom-right corner, offset by 2 cells from edge
        let x = area.right().saturating_sub(width + 2);
        let y = area.bottom().saturating_sub(height + 2);
        let toast_area = Rect::new(x, y, width, height);

        let border = match self.kind {
            ToastKind::Info => Color::Green,
            ToastKind::Error => Color::Red,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));

        let text = Paragraph::new(self.message.as_str())
            .alignment(Alignment::Center)
            .block(block);

        f.render_widget(Clear, toast_area);
        f.render_widget(text, toast_area);
    }
}
