//! TrackList — the visible page of catalog records.
//!
//! The list never scrolls: one page of the filtered catalog is exactly what
//! fits the view, and page navigation replaces the whole slice. Selection is
//! an index into the current page.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use shelf_core::catalog::TrackRecord;
use shelf_core::filter::PageView;

use crate::theme::{
    C_CATEGORY, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_SELECTION_BG, C_TAG,
};

pub struct TrackList {
    view: PageView,
    selected: usize,
    list_state: ListState,
}

impl TrackList {
    pub fn new() -> Self {
        Self {
            view: PageView {
                items: Vec::new(),
                page: 1,
                total_pages: 1,
                total_items: 0,
            },
            selected: 0,
            list_state: ListState::default(),
        }
    }

    /// Swap in a freshly computed page. Selection is clamped, and reset to
    /// the top when the page identity changed (filter edit or page turn).
    pub fn set_view(&mut self, view: PageView, keep_selection: bool) {
        if !keep_selection {
            self.selected = 0;
        }
        self.view = view;
        if !self.view.items.is_empty() && self.selected >= self.view.items.len() {
            self.selected = self.view.items.len() - 1;
        }
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn selected_track(&self) -> Option<&TrackRecord> {
        self.view.items.get(self.selected)
    }

    pub fn select_up(&mut self, step: usize) {
        self.selected = self.selected.saturating_sub(step);
    }

    pub fn select_down(&mut self, step: usize) {
        if self.view.items.is_empty() {
            return;
        }
        self.selected = (self.selected + step).min(self.view.items.len() - 1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.view.items.len().saturating_sub(1);
    }

    pub fn select_index(&mut self, idx: usize) {
        if idx < self.view.items.len() {
            self.selected = idx;
        }
    }

    pub fn len(&self) -> usize {
        self.view.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.items.is_empty()
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, playing_id: Option<u64>) {
        if self.view.items.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  no tracks match the current filters",
                    Style::default().fg(C_MUTED),
                )),
                area,
            );
            return;
        }

        let items: Vec<ListItem> = self
            .view
            .items
            .iter()
            .enumerate()
            .map(|(row, track)| {
                let is_selected = row == self.selected;
                let is_playing = playing_id == Some(track.id);

                let icon = if is_playing { "▶" } else { " " };
                let icon_color = if is_playing { C_PLAYING } else { C_MUTED };

                let title_color = if is_playing {
                    C_PLAYING
                } else if is_selected {
                    C_PRIMARY
                } else {
                    C_SECONDARY
                };
                let title_style = if is_playing || is_selected {
                    Style::default().fg(title_color).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(title_color)
                };

                let mut spans = vec![
                    Span::styled(icon, Style::default().fg(icon_color)),
                    Span::raw("  "),
                    Span::styled(track.title.clone(), title_style),
                    Span::styled(
                        format!("  {}", track.category),
                        Style::default().fg(C_CATEGORY),
                    ),
                ];
                if !track.tags.is_empty() {
                    spans.push(Span::styled(
                        format!("  [{}]", track.tags.join(", ")),
                        Style::default().fg(C_TAG),
                    ));
                }

                let item_bg = if is_selected {
                    Style::default().bg(C_SELECTION_BG)
                } else {
                    Style::default()
                };

                ListItem::new(Line::from(spans)).style(item_bg)
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default())
            .highlight_symbol("");

        self.list_state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }
}

impl Default for TrackList {
    fn default() -> Self {
        Self::new()
    }
}
