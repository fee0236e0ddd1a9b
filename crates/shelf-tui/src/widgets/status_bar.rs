//! Status bar — bottom lines with pagination, limiter state, and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{
    C_LOCKOUT, C_MODE_NORMAL, C_MODE_PAGE, C_MODE_SEARCH, C_MUTED, C_PLAYING, C_SECONDARY,
    C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
    PageJump,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "BROWSE",
            Self::Search => "SEARCH",
            Self::PageJump => "PAGE",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Search => C_MODE_SEARCH,
            Self::PageJump => C_MODE_PAGE,
        }
    }
}

/// What the pagination/limiter segment of the bar needs to know.
pub struct StatusInfo<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub downloads_in_window: usize,
    pub max_per_window: usize,
    /// Remaining lockout, when the limiter is locked.
    pub lockout_remaining_secs: Option<i64>,
    pub now_playing: Option<&'a str>,
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the pagination + limiter + now-playing line.
pub fn draw_status_line(frame: &mut Frame, area: Rect, info: &StatusInfo) {
    let mut spans = vec![
        Span::styled(
            format!(" page {}/{}", info.page, info.total_pages),
            Style::default().fg(C_SECONDARY),
        ),
        Span::styled(
            format!("  {} tracks", info.total_items),
            Style::default().fg(C_MUTED),
        ),
    ];

    match info.lockout_remaining_secs {
        Some(secs) => {
            spans.push(Span::styled(
                format!("  downloads locked {}s", secs.max(0)),
                Style::default().fg(C_LOCKOUT).add_modifier(Modifier::BOLD),
            ));
        }
        None => {
            spans.push(Span::styled(
                format!(
                    "  downloads {}/{}",
                    info.downloads_in_window, info.max_per_window
                ),
                Style::default().fg(C_MUTED),
            ));
        }
    }

    if let Some(title) = info.now_playing {
        spans.push(Span::styled("  ▶ ", Style::default().fg(C_PLAYING)));
        spans.push(Span::styled(
            title.to_string(),
            Style::default().fg(C_PLAYING),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let label_span = Span::styled(
        format!(" {} ", mode.label()),
        Style::default()
            .fg(mode.color())
            .add_modifier(Modifier::BOLD),
    );

    let keys = match mode {
        InputMode::Normal => {
            " ↑↓/jk select  ←→/hl page  g/G first/last  : goto  / search  c/t category/tag  Enter play  d download  y copy url  r random  R reload  q quit"
        }
        InputMode::Search => " type to search  Enter keep  Esc clear, then close",
        InputMode::PageJump => " type page number  Enter go  Esc cancel",
    };

    let line = Line::from(vec![
        label_span,
        Span::raw(" "),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
