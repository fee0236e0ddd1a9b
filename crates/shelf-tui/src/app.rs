//! App — event loop and dispatch for the catalog browser.
//!
//! Architecture:
//! - `App` owns the core state (catalog, filter, limiter) and the UI pieces.
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks (terminal events, catalog fetches).
//! - The event loop draws a frame, then awaits the next message or tick.
//! - Core mutations happen inline in the handlers; each event fully applies
//!   (mutate filter state, recompute the page) before the next is processed.

use std::io;
use std::time::Duration;

use rand::Rng;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use shelf_core::catalog::{Catalog, TrackRecord};
use shelf_core::config::Config;
use shelf_core::filter::{filter_and_paginate, FilterState, PageRequest, ALL};
use shelf_core::limiter::{Decision, DenyReason, DownloadLimiter, LimiterConfig, STORE_FILE_NAME};
use shelf_core::platform;

use crate::components::track_list::TrackList;
use crate::download::{DownloadManager, DownloadStatus};
use crate::http;
use crate::player::Player;
use crate::theme::{C_ACCENT, C_BG, C_CATEGORY, C_MUTED, C_PRIMARY, C_SECONDARY, C_TAG};
use crate::widgets::{
    filter_input::{FilterAction, FilterInput},
    status_bar::{self, InputMode, StatusInfo},
    toast::ToastManager,
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    CatalogLoaded(Vec<TrackRecord>),
    CatalogFailed(String),
}

/// What the main pane shows when there is no page to render.
enum CatalogPhase {
    Loading,
    Ready,
    Failed(String),
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct App {
    config: Config,
    catalog: Catalog,
    filter: FilterState,
    limiter: DownloadLimiter,

    track_list: TrackList,
    toast: ToastManager,
    player: Player,
    downloads: DownloadManager,

    /// Cycling options for the category/tag filters, sentinel first.
    categories: Vec<String>,
    tags: Vec<String>,

    input_mode: InputMode,
    search_input: FilterInput,
    page_input: FilterInput,
    phase: CatalogPhase,
    message_tx: Option<mpsc::Sender<AppMessage>>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let limiter_config = LimiterConfig {
            max_per_window: config.download.max_per_window,
            cooldown_window_ms: config.download.cooldown_window_ms,
        };
        let limiter = DownloadLimiter::restore(
            limiter_config,
            platform::data_dir().join(STORE_FILE_NAME),
            now_ms(),
        );

        let filter = FilterState::new(config.browse.page_size);
        let downloads = DownloadManager::new(config.download.downloads_dir.clone());

        Self {
            config,
            catalog: Catalog::new(),
            filter,
            limiter,
            track_list: TrackList::new(),
            toast: ToastManager::new(),
            player: Player::new(),
            downloads,
            categories: vec![ALL.to_string()],
            tags: vec![ALL.to_string()],
            input_mode: InputMode::Normal,
            search_input: FilterInput::new("/", "title or filename…"),
            page_input: FilterInput::new(":", "page number"),
            phase: CatalogPhase::Loading,
            message_tx: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.message_tx = Some(tx.clone());

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Initial catalog fetch ─────────────────────────────────────────────
        self.spawn_catalog_fetch();

        // Toast expiry, lockout countdown, download progress: 100ms cadence.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg);
                    // Drain whatever else queued up before redrawing.
                    while let Ok(next) = rx.try_recv() {
                        needs_redraw |= self.handle_message(next);
                    }
                }

                _ = ui_tick.tick() => {
                    self.on_tick();
                    needs_redraw = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.player.stop();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    fn spawn_catalog_fetch(&mut self) {
        let Some(tx) = self.message_tx.clone() else {
            return;
        };
        let catalog_config = self.config.catalog.clone();
        tokio::spawn(async move {
            let msg = match http::fetch_catalog(catalog_config).await {
                Ok(records) => AppMessage::CatalogLoaded(records),
                Err(e) => AppMessage::CatalogFailed(e.to_string()),
            };
            let _ = tx.send(msg).await;
        });
    }

    // ── Message handling ──────────────────────────────────────────────────────

    fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key),
            AppMessage::Event(Event::Resize(_, _)) => true,
            AppMessage::Event(_) => false,

            AppMessage::CatalogLoaded(records) => {
                let count = records.len();
                match self.catalog.replace(records) {
                    Ok(()) => {
                        info!("catalog ready: {} tracks", count);
                        self.phase = CatalogPhase::Ready;
                        self.rebuild_filter_options();
                        self.refresh_view(false);
                        self.toast.success(format!("loaded {} tracks", count));
                    }
                    Err(e) => {
                        warn!("catalog load rejected: {}", e);
                        self.toast.error(e.to_string());
                        // Keep the previous snapshot when a reload comes back
                        // empty; only a first load lands in the error state.
                        if self.catalog.is_empty() {
                            self.phase = CatalogPhase::Failed(e.to_string());
                        }
                    }
                }
                true
            }

            AppMessage::CatalogFailed(msg) => {
                warn!("catalog load failed: {}", msg);
                self.toast.error(msg.clone());
                if self.catalog.is_empty() {
                    self.phase = CatalogPhase::Failed(msg);
                }
                true
            }
        }
    }

    fn on_tick(&mut self) {
        self.toast.tick();

        if self.limiter.poll_expiry(now_ms()) {
            self.toast.info("you can download tracks again");
        }

        for update in self.downloads.drain_updates() {
            match update.status {
                DownloadStatus::Done(path) => {
                    self.toast
                        .success(format!("saved {}", path.display()));
                }
                DownloadStatus::Failed(e) => {
                    self.toast
                        .error(format!("download of {} failed: {}", update.filename, e));
                }
                DownloadStatus::Downloading => {}
            }
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }

        match self.input_mode {
            InputMode::Search => self.handle_search_key(key),
            InputMode::PageJump => self.handle_page_jump_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        match self.search_input.handle_key(key) {
            FilterAction::Changed(term) => {
                // Live filtering: every keystroke re-filters and resets paging.
                self.filter.set_search_term(&term);
                self.refresh_view(false);
            }
            FilterAction::Confirmed(_) => {
                self.input_mode = InputMode::Normal;
            }
            // Cancelled only fires once the input is empty, and clearing the
            // text already went through Changed("").
            FilterAction::Cancelled => {
                self.input_mode = InputMode::Normal;
            }
        }
        true
    }

    fn handle_page_jump_key(&mut self, key: KeyEvent) -> bool {
        match self.page_input.handle_key(key) {
            FilterAction::Changed(_) => {}
            FilterAction::Confirmed(text) => {
                self.input_mode = InputMode::Normal;
                // Non-numeric or out-of-range input is silently ignored.
                if let Ok(page) = text.trim().parse::<usize>() {
                    let total = self.track_list.view().total_pages;
                    if self.filter.navigate(PageRequest::Jump(page), total) {
                        self.refresh_view(false);
                    }
                }
            }
            FilterAction::Cancelled => {
                self.input_mode = InputMode::Normal;
            }
        }
        true
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            5
        } else {
            1
        };

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }

            KeyCode::Up | KeyCode::Char('k') => self.track_list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.track_list.select_down(step),
            KeyCode::Home => self.track_list.select_first(),
            KeyCode::End => self.track_list.select_last(),

            KeyCode::Left | KeyCode::Char('h') | KeyCode::PageUp => {
                self.turn_page(PageRequest::Prev)
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::PageDown => {
                self.turn_page(PageRequest::Next)
            }
            KeyCode::Char('g') => self.turn_page(PageRequest::First),
            KeyCode::Char('G') => self.turn_page(PageRequest::Last),

            KeyCode::Char('/') => {
                self.search_input.set_value(self.filter.search_term());
                self.search_input.activate();
                self.input_mode = InputMode::Search;
            }
            KeyCode::Char(':') => {
                self.page_input.clear();
                self.page_input.activate();
                self.input_mode = InputMode::PageJump;
            }

            KeyCode::Char('c') => self.cycle_category(1),
            KeyCode::Char('C') => self.cycle_category(-1),
            KeyCode::Char('t') => self.cycle_tag(1),
            KeyCode::Char('T') => self.cycle_tag(-1),

            KeyCode::Enter => self.toggle_playback(),
            KeyCode::Char('d') => self.download_selected(),
            KeyCode::Char('y') => self.copy_selected_url(),

            KeyCode::Char('r') => {
                if !self.track_list.is_empty() {
                    let idx = rand::thread_rng().gen_range(0..self.track_list.len());
                    self.track_list.select_index(idx);
                }
            }
            KeyCode::Char('R') => {
                self.toast.info("reloading catalog…");
                self.spawn_catalog_fetch();
            }

            _ => return false,
        }

        true
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    /// Recompute the current page from catalog + filter state, persisting the
    /// clamped page number back into the filter.
    fn refresh_view(&mut self, keep_selection: bool) {
        let view = filter_and_paginate(self.catalog.records(), &self.filter);
        self.filter.page = view.page;
        self.track_list.set_view(view, keep_selection);
    }

    fn turn_page(&mut self, request: PageRequest) {
        let total = self.track_list.view().total_pages;
        if self.filter.navigate(request, total) {
            self.refresh_view(false);
        }
    }

    fn cycle_category(&mut self, direction: isize) {
        let next = cycle_option(&self.categories, &self.filter.category, direction);
        self.filter.set_category(next);
        self.refresh_view(false);
    }

    fn cycle_tag(&mut self, direction: isize) {
        // The tag filter is meaningless when no source supplied tags.
        if self.tags.len() <= 1 {
            return;
        }
        let next = cycle_option(&self.tags, &self.filter.tag, direction);
        self.filter.set_tag(next);
        self.refresh_view(false);
    }

    fn rebuild_filter_options(&mut self) {
        self.categories = std::iter::once(ALL.to_string())
            .chain(self.catalog.categories())
            .collect();
        self.tags = std::iter::once(ALL.to_string())
            .chain(self.catalog.tags())
            .collect();
        // A reload can drop the selected category/tag entirely.
        if !self.categories.contains(&self.filter.category) {
            self.filter.set_category(ALL);
        }
        if !self.tags.contains(&self.filter.tag) {
            self.filter.set_tag(ALL);
        }
    }

    fn toggle_playback(&mut self) {
        let Some(track) = self.track_list.selected_track().cloned() else {
            return;
        };
        if self.player.playing_id() == Some(track.id) {
            self.player.stop();
            return;
        }
        match self.player.play(&track) {
            Ok(()) => self.toast.info(format!("playing {}", track.title)),
            Err(e) => self.toast.error(e.to_string()),
        }
    }

    fn download_selected(&mut self) {
        let Some(track) = self.track_list.selected_track().cloned() else {
            return;
        };

        if matches!(
            self.downloads.status(track.id),
            Some(DownloadStatus::Downloading)
        ) {
            self.toast.info(format!("{} is already downloading", track.filename));
            return;
        }

        let now = now_ms();
        match self.limiter.try_record_download(now) {
            Decision::Allowed { count_in_window } => {
                if let Err(e) = self.downloads.start_download(&track) {
                    self.toast.warning(format!("{}: {}", track.filename, e));
                    return;
                }
                self.toast.success(format!(
                    "downloading {} ({}/{} in window)",
                    track.filename,
                    count_in_window,
                    self.limiter.config().max_per_window
                ));
            }
            Decision::Denied(DenyReason::LimitExceeded) => {
                let secs = self.remaining_lockout_secs(now).unwrap_or(0);
                self.toast.warning(format!(
                    "too many downloads — locked for {}s",
                    secs
                ));
            }
            Decision::Denied(DenyReason::LimitActive) => {
                let secs = self.remaining_lockout_secs(now).unwrap_or(0);
                self.toast
                    .warning(format!("downloads locked, {}s remaining", secs));
            }
        }
    }

    fn copy_selected_url(&mut self) {
        let Some(track) = self.track_list.selected_track() else {
            return;
        };
        let url = track.url.clone();
        let title = track.title.clone();
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(url)) {
            Ok(()) => self.toast.info(format!("copied url of {}", title)),
            Err(e) => self.toast.error(format!("clipboard: {}", e)),
        }
    }

    fn remaining_lockout_secs(&self, now: i64) -> Option<i64> {
        self.limiter.remaining_ms(now).map(|ms| (ms + 999) / 1000)
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(3),    // track list
                Constraint::Length(1), // separator
                Constraint::Length(1), // status line
                Constraint::Length(1), // keys bar
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);

        let playing_id = self.player.playing_id();
        match &self.phase {
            CatalogPhase::Loading => {
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        "  loading catalog…",
                        Style::default().fg(C_MUTED),
                    )),
                    chunks[1],
                );
            }
            CatalogPhase::Failed(msg) => {
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        format!("  {}", msg),
                        Style::default().fg(C_ACCENT),
                    )),
                    chunks[1],
                );
            }
            CatalogPhase::Ready => {
                self.track_list.draw(frame, chunks[1], playing_id);
            }
        }

        // Search / page-jump bar overlays the bottom row of the list area.
        let active_input = match self.input_mode {
            InputMode::Search => Some(&self.search_input),
            InputMode::PageJump => Some(&self.page_input),
            InputMode::Normal => None,
        };
        if let Some(input) = active_input {
            let bar = Rect {
                y: chunks[1].y + chunks[1].height.saturating_sub(1),
                height: 1,
                ..chunks[1]
            };
            input.draw(frame, bar);
        }

        status_bar::draw_separator(frame, chunks[2]);

        let view = self.track_list.view();
        let now = now_ms();
        let playing_title = playing_id.and_then(|id| {
            view.items
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.title.as_str())
        });
        let info = StatusInfo {
            page: view.page,
            total_pages: view.total_pages,
            total_items: view.total_items,
            downloads_in_window: self.limiter.count_in_window(now),
            max_per_window: self.limiter.config().max_per_window,
            lockout_remaining_secs: self.remaining_lockout_secs(now),
            now_playing: playing_title,
        };
        status_bar::draw_status_line(frame, chunks[3], &info);
        status_bar::draw_keys_bar(frame, chunks[4], self.input_mode);

        self.toast.draw(frame, area);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(
                " trackshelf ",
                Style::default()
                    .fg(C_PRIMARY)
                    .add_modifier(ratatui::style::Modifier::BOLD),
            ),
            Span::styled(
                format!(" category: {}", self.filter.category),
                Style::default().fg(C_CATEGORY),
            ),
        ];
        if self.tags.len() > 1 {
            spans.push(Span::styled(
                format!("  tag: {}", self.filter.tag),
                Style::default().fg(C_TAG),
            ));
        }
        if !self.filter.search_term().is_empty() {
            spans.push(Span::styled(
                format!("  search: \"{}\"", self.filter.search_term()),
                Style::default().fg(C_SECONDARY),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

/// Step through `options` relative to `current`, wrapping both ways.
/// Unknown current values land on the first option.
fn cycle_option(options: &[String], current: &str, direction: isize) -> String {
    if options.is_empty() {
        return current.to_string();
    }
    let len = options.len() as isize;
    let idx = options
        .iter()
        .position(|o| o == current)
        .map(|i| i as isize)
        .unwrap_or(-direction); // so the first step lands on index 0
    let next = (idx + direction).rem_euclid(len);
    options[next as usize].clone()
}

#[cfg(test)]
mod tests {
    use super::cycle_option;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_cycle_option_wraps() {
        let options = opts(&["all", "ambient", "bgm"]);
        assert_eq!(cycle_option(&options, "all", 1), "ambient");
        assert_eq!(cycle_option(&options, "bgm", 1), "all");
        assert_eq!(cycle_option(&options, "all", -1), "bgm");
    }

    #[test]
    fn test_cycle_option_unknown_current() {
        let options = opts(&["all", "bgm"]);
        assert_eq!(cycle_option(&options, "gone", 1), "all");
    }
}
