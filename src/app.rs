use crate::digest::{DigestDay, SectionKind};
use crate::event_source::EventSource;
use crate::export::DigestExporter;
use crate::filters::{apply_filters, ApplyOutcome, ChipAction, FilterState, DateRange};
use crate::narration::{estimate_listen_minutes, NarrationController, NarrationItem, NarrationState};
use crate::navigation_panel::{NavAction, NavigationPanel};
use crate::notification::{NotificationLevel, NotificationManager};
use crate::saved::SavedStore;
use crate::settings;
use crate::share;
use crate::similar::{find_similar, SimilarCandidate, SimilarHit};
use crate::speech::SpeechEngine;
use crate::theme::{self, current_theme};

use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use log::{debug, info};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Delay between a filter control firing and the recompute, leaving room
/// for the transition visual state.
const APPLY_DELAY: Duration = Duration::from_millis(150);
/// Delay between the recompute committing and the dependent re-sync pass.
/// Scheduled only from a finished apply, never independently.
const SYNC_DELAY: Duration = Duration::from_millis(50);

const FEED_MARGIN: usize = 2;

/// The fixed re-render sequence that runs after every apply pass. Order
/// matters: navigation syncs against the settled visibility, saved marks
/// re-attach to the rendered articles, and only then is the narration
/// estimate recomputed from the final visible set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostApplyStep {
    SyncNavigation,
    RefreshSavedMarks,
    ResetNarration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Navigation,
    Feed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Feed,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Keyword,
    CustomDate,
}

#[derive(Debug, Clone)]
struct InputPrompt {
    kind: PromptKind,
    buffer: String,
}

/// Snapshot of one currently visible article, in feed order. Rebuilt by the
/// post-apply sequence; carries the saved/highlight marks the feed renders.
#[derive(Debug, Clone)]
pub struct VisibleArticle {
    pub day: usize,
    pub section: usize,
    pub article: usize,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub kind: SectionKind,
    pub date_str: String,
    pub saved: bool,
    pub keyword_match: bool,
}

#[derive(Debug, Clone, Copy)]
enum ScrollTarget {
    Day(usize),
    Article(usize),
}

#[derive(Debug, Default)]
struct FeedIndex {
    day_line: Vec<Option<usize>>,
    article_line: Vec<usize>,
    total_lines: usize,
}

pub struct App {
    days: Vec<DigestDay>,
    pub filters: FilterState,
    outcome: ApplyOutcome,
    today: NaiveDate,
    nav: NavigationPanel,
    saved: SavedStore,
    narration: NarrationController,
    speech: Box<dyn SpeechEngine>,
    notifications: NotificationManager,
    post_apply: Vec<PostApplyStep>,

    visible_articles: Vec<VisibleArticle>,
    selected_article: usize,
    listen_minutes: usize,
    similar: Option<(usize, Vec<SimilarHit>)>,

    view: ViewMode,
    focused: FocusedPanel,
    prompt: Option<InputPrompt>,
    saved_list_state: ListState,
    saved_selected: usize,

    scroll_offset: usize,
    feed_height: usize,
    feed_index: FeedIndex,
    pending_scroll: Option<ScrollTarget>,
    last_narration_index: Option<usize>,

    pending_apply: Option<Instant>,
    pending_sync: Option<Instant>,
    transition: bool,

    export_dir: PathBuf,
    should_quit: bool,
}

impl App {
    pub fn new(
        days: Vec<DigestDay>,
        saved: SavedStore,
        speech: Box<dyn SpeechEngine>,
        export_dir: PathBuf,
        today: NaiveDate,
    ) -> Self {
        let nav = NavigationPanel::new(&days);
        let mut app = Self {
            days,
            filters: FilterState::new(),
            outcome: ApplyOutcome::default(),
            today,
            nav,
            saved,
            narration: NarrationController::new(),
            speech,
            notifications: NotificationManager::new(),
            post_apply: vec![
                PostApplyStep::SyncNavigation,
                PostApplyStep::RefreshSavedMarks,
                PostApplyStep::ResetNarration,
            ],
            visible_articles: Vec::new(),
            selected_article: 0,
            listen_minutes: 0,
            similar: None,
            view: ViewMode::Feed,
            focused: FocusedPanel::Feed,
            prompt: None,
            saved_list_state: ListState::default(),
            saved_selected: 0,
            scroll_offset: 0,
            feed_height: 0,
            feed_index: FeedIndex::default(),
            pending_scroll: None,
            last_narration_index: None,
            pending_apply: None,
            pending_sync: None,
            transition: false,
            export_dir,
            should_quit: false,
        };
        // Initial projection, synchronously, so the first frame is complete.
        app.run_apply();
        app.run_post_apply();
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn outcome(&self) -> &ApplyOutcome {
        &self.outcome
    }

    pub fn visible_articles(&self) -> &[VisibleArticle] {
        &self.visible_articles
    }

    pub fn listen_minutes(&self) -> usize {
        self.listen_minutes
    }

    pub fn narration(&self) -> &NarrationController {
        &self.narration
    }

    pub fn saved_store(&self) -> &SavedStore {
        &self.saved
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    // --- Filter scheduling -------------------------------------------------

    /// A filter control fired: stop narration right away (a filtered-away
    /// reader must not keep narrating) and arm the delayed apply.
    pub fn schedule_apply(&mut self) {
        self.narration.stop(self.speech.as_mut());
        self.last_narration_index = None;
        self.transition = true;
        self.pending_apply = Some(Instant::now() + APPLY_DELAY);
        debug!("Filter apply scheduled");
    }

    fn run_apply(&mut self) {
        self.outcome = apply_filters(&self.filters, &self.days, self.today);
        self.transition = false;
        self.pending_apply = None;
        // The dependent re-sync runs strictly after this pass has committed.
        self.pending_sync = Some(Instant::now() + SYNC_DELAY);
    }

    fn run_post_apply(&mut self) {
        self.pending_sync = None;
        for step in self.post_apply.clone() {
            match step {
                PostApplyStep::SyncNavigation => self.nav.sync(&self.outcome),
                PostApplyStep::RefreshSavedMarks => {
                    self.visible_articles = self.flatten_visible();
                    self.refresh_saved_marks();
                    if self.selected_article >= self.visible_articles.len() {
                        self.selected_article = self.visible_articles.len().saturating_sub(1);
                    }
                    self.similar = None;
                }
                PostApplyStep::ResetNarration => {
                    self.narration.stop(self.speech.as_mut());
                    let words: usize = self
                        .visible_articles
                        .iter()
                        .map(|a| format!("{} {}", a.title, a.summary).split_whitespace().count())
                        .sum();
                    self.listen_minutes = estimate_listen_minutes(words);
                }
            }
        }
    }

    /// Run any armed apply/sync immediately. Used before operations that
    /// must observe the latest filter state (export, narration start).
    pub fn flush_pending(&mut self) {
        if self.pending_apply.is_some() {
            self.run_apply();
        }
        if self.pending_sync.is_some() {
            self.run_post_apply();
        }
    }

    /// Cooperative timer pass, called from the run loop.
    pub fn tick(&mut self) {
        self.notifications.update();

        if let Some(deadline) = self.pending_apply {
            if Instant::now() >= deadline {
                self.run_apply();
            }
        }
        if let Some(deadline) = self.pending_sync {
            if Instant::now() >= deadline {
                self.run_post_apply();
            }
        }

        if let Some(event) = self.speech.poll() {
            self.narration.on_event(event, self.speech.as_mut());
        }
        if self.narration.is_active() {
            let index = self.narration.index();
            if self.last_narration_index != Some(index) {
                self.last_narration_index = Some(index);
                self.pending_scroll = Some(ScrollTarget::Article(index));
            }
        } else {
            self.last_narration_index = None;
        }
    }

    fn flatten_visible(&self) -> Vec<VisibleArticle> {
        let keyword_active = !self.filters.keyword().is_empty();
        let mut out = Vec::new();
        for (d, (day, day_view)) in self.days.iter().zip(&self.outcome.days).enumerate() {
            if !day_view.visibility.is_visible() {
                continue;
            }
            for (s, (section, section_view)) in
                day.sections.iter().zip(&day_view.sections).enumerate()
            {
                if !section_view.visibility.is_visible() {
                    continue;
                }
                for (a, (article, article_view)) in
                    section.articles.iter().zip(&section_view.articles).enumerate()
                {
                    if !article_view.visible {
                        continue;
                    }
                    out.push(VisibleArticle {
                        day: d,
                        section: s,
                        article: a,
                        title: article.title.clone(),
                        url: article.url.clone(),
                        summary: article.summary.clone(),
                        kind: section.kind,
                        date_str: day.date_str.clone(),
                        saved: false,
                        keyword_match: keyword_active && article_view.keyword_match,
                    });
                }
            }
        }
        out
    }

    fn refresh_saved_marks(&mut self) {
        for article in &mut self.visible_articles {
            article.saved = self.saved.is_saved(&article.title, &article.date_str);
        }
    }

    // --- User actions ------------------------------------------------------

    fn set_range(&mut self, range: DateRange) {
        self.filters.set_range(range);
        self.schedule_apply();
    }

    fn toggle_type(&mut self, kind: SectionKind) {
        self.filters.toggle_type(kind);
        self.schedule_apply();
    }

    fn apply_chip_action(&mut self, action: ChipAction) {
        match action {
            ChipAction::ResetRange => self.filters.reset_range(),
            ChipAction::ClearKeyword => self.filters.clear_keyword(),
            ChipAction::EnableType(kind) => self.filters.enable_type(kind),
        }
        self.schedule_apply();
    }

    fn toggle_save_selected(&mut self) {
        let Some(selected) = self.visible_articles.get(self.selected_article) else {
            return;
        };
        let article = &self.days[selected.day].sections[selected.section].articles[selected.article];
        let date = selected.date_str.clone();
        let now_saved = self.saved.toggle(article, &date);
        if now_saved {
            self.notifications.info("Saved for later");
        } else {
            self.notifications.info("Removed from saved");
        }
        self.refresh_saved_marks();
    }

    fn copy_selected_link(&mut self) {
        let Some(selected) = self.visible_articles.get(self.selected_article) else {
            return;
        };
        match share::copy_to_clipboard(&selected.url) {
            Ok(()) => self.notifications.info("Link copied"),
            Err(e) => self.notifications.error(format!("Copy failed: {e}")),
        }
    }

    fn open_selected_link(&mut self) {
        let Some(selected) = self.visible_articles.get(self.selected_article) else {
            return;
        };
        if let Err(e) = share::open_in_browser(&selected.url) {
            self.notifications.error(format!("{e}"));
        }
    }

    fn share_selected(&mut self, twitter: bool) {
        let Some(selected) = self.visible_articles.get(self.selected_article) else {
            return;
        };
        let url = if twitter {
            share::twitter_share_url(&selected.url, &selected.title)
        } else {
            share::linkedin_share_url(&selected.url)
        };
        if let Err(e) = share::open_in_browser(&url) {
            self.notifications.error(format!("{e}"));
        }
    }

    fn toggle_similar(&mut self) {
        if let Some((idx, _)) = self.similar {
            if idx == self.selected_article {
                self.similar = None;
                return;
            }
        }
        let Some(selected) = self.visible_articles.get(self.selected_article) else {
            return;
        };
        if selected.kind != SectionKind::Tech {
            self.notifications
                .info("Similar articles are available for World Tech News");
            return;
        }

        // The pairwise scan runs over every article in the archive, hidden
        // ones included, so related items resurface across filter state.
        let mut candidates = Vec::new();
        let mut target = None;
        for (d, day) in self.days.iter().enumerate() {
            for (s, section) in day.sections.iter().enumerate() {
                for (a, article) in section.articles.iter().enumerate() {
                    if (d, s, a) == (selected.day, selected.section, selected.article) {
                        target = Some(candidates.len());
                    }
                    candidates.push(SimilarCandidate {
                        title: article.title.clone(),
                        summary: article.summary.clone(),
                        url: article.url.clone(),
                        date: day.date_str.clone(),
                    });
                }
            }
        }
        let Some(target) = target else { return };
        let hits = find_similar(target, &candidates);
        if hits.is_empty() {
            self.notifications.info("No similar articles found");
            self.similar = None;
        } else {
            self.similar = Some((self.selected_article, hits));
        }
    }

    fn narration_play_pause(&mut self) {
        match self.narration.state() {
            NarrationState::Idle => {
                self.flush_pending();
                let items: Vec<NarrationItem> = self
                    .visible_articles
                    .iter()
                    .map(|a| NarrationItem {
                        title: a.title.clone(),
                        content: a.summary.clone(),
                    })
                    .collect();
                match self.narration.start(items, self.speech.as_mut()) {
                    Ok(()) => {
                        self.last_narration_index = Some(0);
                        self.pending_scroll = Some(ScrollTarget::Article(0));
                    }
                    Err(e) => self.notifications.warn(e.to_string()),
                }
            }
            NarrationState::Playing => self.narration.pause(self.speech.as_mut()),
            NarrationState::Paused => {
                if let Err(e) = self.narration.resume(self.speech.as_mut()) {
                    self.notifications.warn(e.to_string());
                }
            }
        }
    }

    fn narration_skip(&mut self) {
        if let Err(e) = self.narration.skip(self.speech.as_mut()) {
            self.notifications.warn(e.to_string());
        }
    }

    fn stop_narration(&mut self) {
        self.narration.stop(self.speech.as_mut());
    }

    fn export(&mut self) {
        self.flush_pending();
        match DigestExporter::export(&self.days, &self.outcome, &self.export_dir, self.today) {
            Ok(path) => self
                .notifications
                .info(format!("Exported to {}", path.display())),
            Err(e) => self.notifications.error(format!("Export failed: {e}")),
        }
    }

    fn toggle_theme(&mut self) {
        let next = theme::toggle_theme();
        settings::set_theme_name(next.name());
        self.notifications.info(format!("{} theme", next.name()));
    }

    fn select_next_article(&mut self) {
        if !self.visible_articles.is_empty()
            && self.selected_article + 1 < self.visible_articles.len()
        {
            self.selected_article += 1;
            self.pending_scroll = Some(ScrollTarget::Article(self.selected_article));
        }
    }

    fn select_prev_article(&mut self) {
        if self.selected_article > 0 {
            self.selected_article -= 1;
            self.pending_scroll = Some(ScrollTarget::Article(self.selected_article));
        }
    }

    // --- Event handling ----------------------------------------------------

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            // A backgrounded reader must not keep narrating.
            Event::FocusLost => {
                if self.narration.is_active() {
                    info!("Terminal lost focus, stopping narration");
                    self.stop_narration();
                }
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        if self.view == ViewMode::Saved {
            self.handle_saved_view_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.stop_narration();
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused = match self.focused {
                    FocusedPanel::Navigation => FocusedPanel::Feed,
                    FocusedPanel::Feed => FocusedPanel::Navigation,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => match self.focused {
                FocusedPanel::Navigation => self.nav.move_selection_down(),
                FocusedPanel::Feed => self.select_next_article(),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.focused {
                FocusedPanel::Navigation => self.nav.move_selection_up(),
                FocusedPanel::Feed => self.select_prev_article(),
            },
            KeyCode::Char('d') => {
                self.scroll_offset += self.feed_height.max(2) / 2;
            }
            KeyCode::Char('u') => {
                self.scroll_offset = self
                    .scroll_offset
                    .saturating_sub(self.feed_height.max(2) / 2);
            }
            KeyCode::Enter => match self.focused {
                FocusedPanel::Navigation => match self.nav.selected_action() {
                    NavAction::Chip(action) => self.apply_chip_action(action),
                    NavAction::JumpToDay(day) => {
                        self.pending_scroll = Some(ScrollTarget::Day(day));
                    }
                    NavAction::None => {}
                },
                FocusedPanel::Feed => self.open_selected_link(),
            },
            KeyCode::Char('1') => self.set_range(DateRange::All),
            KeyCode::Char('2') => self.set_range(DateRange::Today),
            KeyCode::Char('3') => self.set_range(DateRange::ThreeDays),
            KeyCode::Char('4') => self.set_range(DateRange::Week),
            KeyCode::Char('5') => self.set_range(DateRange::Month),
            KeyCode::Char('c') => {
                self.prompt = Some(InputPrompt {
                    kind: PromptKind::CustomDate,
                    buffer: String::new(),
                });
            }
            KeyCode::Char('/') => {
                self.prompt = Some(InputPrompt {
                    kind: PromptKind::Keyword,
                    buffer: self.filters.keyword().to_string(),
                });
            }
            KeyCode::Char('w') => self.toggle_type(SectionKind::Tech),
            KeyCode::Char('h') => self.toggle_type(SectionKind::Hn),
            KeyCode::Char('r') => self.toggle_type(SectionKind::Research),
            KeyCode::Char('T') => self.toggle_theme(),
            KeyCode::Char('s') => self.toggle_save_selected(),
            KeyCode::Char('y') => self.copy_selected_link(),
            KeyCode::Char('o') => self.open_selected_link(),
            KeyCode::Char('i') => self.toggle_similar(),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('v') => {
                self.view = ViewMode::Saved;
                self.saved_selected = 0;
                self.saved_list_state.select(if self.saved.is_empty() {
                    None
                } else {
                    Some(0)
                });
            }
            KeyCode::Char('L') => self.share_selected(false),
            KeyCode::Char('X') => self.share_selected(true),
            KeyCode::Char(' ') => self.narration_play_pause(),
            KeyCode::Char('n') => self.narration_skip(),
            KeyCode::Char('x') => self.stop_narration(),
            KeyCode::Esc => {
                if self.similar.is_some() {
                    self.similar = None;
                } else if self.narration.is_active() {
                    self.stop_narration();
                } else {
                    self.notifications.dismiss_current();
                }
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
            }
            KeyCode::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.buffer.pop();
                }
            }
            KeyCode::Enter => {
                let Some(prompt) = self.prompt.take() else {
                    return;
                };
                match prompt.kind {
                    PromptKind::Keyword => {
                        self.filters.set_keyword(&prompt.buffer);
                        self.schedule_apply();
                    }
                    PromptKind::CustomDate => {
                        match NaiveDate::parse_from_str(prompt.buffer.trim(), "%Y-%m-%d") {
                            Ok(date) => {
                                self.filters.set_custom_date(date);
                                self.schedule_apply();
                            }
                            Err(_) => {
                                self.notifications
                                    .error("Invalid date, expected YYYY-MM-DD");
                            }
                        }
                    }
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.buffer.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_saved_view_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.stop_narration();
                self.should_quit = true;
            }
            KeyCode::Esc | KeyCode::Char('v') => {
                self.view = ViewMode::Feed;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.saved.is_empty() && self.saved_selected + 1 < self.saved.len() {
                    self.saved_selected += 1;
                    self.saved_list_state.select(Some(self.saved_selected));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.saved_selected > 0 {
                    self.saved_selected -= 1;
                    self.saved_list_state.select(Some(self.saved_selected));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let id = self
                    .saved
                    .list()
                    .get(self.saved_selected)
                    .map(|a| a.id.clone());
                if let Some(id) = id {
                    self.saved.remove(&id);
                    if self.saved_selected >= self.saved.len() {
                        self.saved_selected = self.saved.len().saturating_sub(1);
                    }
                    self.saved_list_state.select(if self.saved.is_empty() {
                        None
                    } else {
                        Some(self.saved_selected)
                    });
                    self.refresh_saved_marks();
                    self.notifications.info("Removed from saved");
                }
            }
            KeyCode::Char('o') | KeyCode::Enter => {
                if let Some(article) = self.saved.list().get(self.saved_selected) {
                    if let Err(e) = share::open_in_browser(&article.url) {
                        self.notifications.error(format!("{e}"));
                    }
                }
            }
            _ => {}
        }
    }

    // --- Rendering ---------------------------------------------------------

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = current_theme();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
            .split(chunks[0]);

        self.nav.render(
            f,
            main[0],
            self.focused == FocusedPanel::Navigation,
            palette,
            self.saved.len(),
        );

        match self.view {
            ViewMode::Feed => self.draw_feed(f, main[1]),
            ViewMode::Saved => self.draw_saved(f, main[1]),
        }

        self.draw_status_bar(f, chunks[1]);
    }

    fn feed_title(&self) -> String {
        if self.transition {
            return "Feed — filtering…".to_string();
        }
        let mut title = format!(
            "Feed — {} days • ~{} min listen",
            self.outcome.visible_days, self.listen_minutes
        );
        if let Some(status) = self.narration.status() {
            title.push_str(&format!(" • {}", status));
        }
        title
    }

    fn draw_feed(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_theme();
        let is_focused = self.focused == FocusedPanel::Feed;
        let (_, border_color, _) = palette.get_panel_colors(is_focused);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.feed_title())
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(palette.base_00));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let width = (inner.width as usize).saturating_sub(FEED_MARGIN);
        if width == 0 || inner.height == 0 {
            return;
        }
        self.feed_height = inner.height as usize;

        let (lines, index) = self.build_feed_lines(width);
        self.feed_index = index;

        if let Some(target) = self.pending_scroll.take() {
            let line = match target {
                ScrollTarget::Day(day) => {
                    self.feed_index.day_line.get(day).copied().flatten()
                }
                ScrollTarget::Article(idx) => self.feed_index.article_line.get(idx).copied(),
            };
            if let Some(line) = line {
                self.scroll_offset = line.saturating_sub(1);
            }
        }
        let max_scroll = self
            .feed_index
            .total_lines
            .saturating_sub(self.feed_height);
        self.scroll_offset = self.scroll_offset.min(max_scroll);

        let text_style = if self.transition {
            Style::default().fg(palette.base_03)
        } else {
            Style::default().fg(palette.base_05)
        };
        let paragraph = Paragraph::new(lines)
            .style(text_style)
            .scroll((self.scroll_offset as u16, 0));
        f.render_widget(paragraph, inner);
    }

    fn build_feed_lines(&self, width: usize) -> (Vec<Line<'static>>, FeedIndex) {
        let palette = current_theme();
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut index = FeedIndex {
            day_line: vec![None; self.days.len()],
            article_line: vec![0; self.visible_articles.len()],
            total_lines: 0,
        };

        if self.outcome.no_results {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "No results",
                Style::default()
                    .fg(palette.base_08)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                "Try adjusting the date range, section types, or keyword.",
                Style::default().fg(palette.base_03),
            )));
            index.total_lines = lines.len();
            return (lines, index);
        }

        let mut visible_idx = 0usize;
        for (d, (day, day_view)) in self.days.iter().zip(&self.outcome.days).enumerate() {
            if !day_view.visibility.is_visible() {
                continue;
            }
            index.day_line[d] = Some(lines.len());
            lines.push(Line::from(Span::styled(
                format!("▍ {}", day.label),
                Style::default()
                    .fg(palette.base_0d)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));

            for (section, section_view) in day.sections.iter().zip(&day_view.sections) {
                if !section_view.visibility.is_visible() {
                    continue;
                }
                lines.push(Line::from(Span::styled(
                    format!("── {} ──", section.heading),
                    Style::default().fg(palette.base_0c),
                )));
                lines.push(Line::from(""));

                for (article, article_view) in
                    section.articles.iter().zip(&section_view.articles)
                {
                    if !article_view.visible {
                        continue;
                    }
                    let va = self.visible_articles.get(visible_idx);
                    if visible_idx < index.article_line.len() {
                        index.article_line[visible_idx] = lines.len();
                    }

                    let selected = self.focused == FocusedPanel::Feed
                        && visible_idx == self.selected_article;
                    let mut title_style = Style::default()
                        .fg(palette.base_06)
                        .add_modifier(Modifier::BOLD);
                    if selected {
                        title_style = title_style.bg(palette.base_02);
                    }
                    let marker = if va.map(|v| v.keyword_match).unwrap_or(false) {
                        Span::styled("▌ ", Style::default().fg(palette.base_0a))
                    } else {
                        Span::styled("  ", Style::default())
                    };
                    let saved_mark = if va.map(|v| v.saved).unwrap_or(false) {
                        Span::styled(" ✓ saved", Style::default().fg(palette.base_0b))
                    } else {
                        Span::raw("")
                    };
                    for (i, chunk) in textwrap::wrap(&article.title, width.max(10)).iter().enumerate()
                    {
                        if i == 0 {
                            lines.push(Line::from(vec![
                                marker.clone(),
                                Span::styled(chunk.to_string(), title_style),
                                saved_mark.clone(),
                            ]));
                        } else {
                            lines.push(Line::from(vec![
                                Span::raw("  "),
                                Span::styled(chunk.to_string(), title_style),
                            ]));
                        }
                    }
                    lines.push(Line::from(Span::styled(
                        format!("  {}", article.url),
                        Style::default().fg(palette.base_03),
                    )));
                    for chunk in textwrap::wrap(&article.summary, width.max(10)).iter() {
                        lines.push(Line::from(Span::styled(
                            format!("  {}", chunk),
                            Style::default().fg(palette.base_05),
                        )));
                    }

                    if let Some((similar_for, hits)) = &self.similar {
                        if *similar_for == visible_idx {
                            lines.push(Line::from(Span::styled(
                                "  Similar articles:",
                                Style::default()
                                    .fg(palette.base_0e)
                                    .add_modifier(Modifier::BOLD),
                            )));
                            for hit in hits {
                                lines.push(Line::from(Span::styled(
                                    format!("   • [{}] {}", hit.date, hit.title),
                                    Style::default().fg(palette.base_0e),
                                )));
                                lines.push(Line::from(Span::styled(
                                    format!("     {}", hit.snippet),
                                    Style::default().fg(palette.base_03),
                                )));
                            }
                        }
                    }

                    lines.push(Line::from(""));
                    visible_idx += 1;
                }
            }
        }

        index.total_lines = lines.len();
        (lines, index)
    }

    fn draw_saved(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_theme();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Saved Articles ({})", self.saved.len()))
            .border_style(Style::default().fg(palette.base_04))
            .style(Style::default().bg(palette.base_00));

        if self.saved.is_empty() {
            let inner = block.inner(area);
            f.render_widget(block, area);
            let empty = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No Saved Articles",
                    Style::default()
                        .fg(palette.base_06)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "Save articles to read them later",
                    Style::default().fg(palette.base_03),
                )),
            ]);
            f.render_widget(empty, inner);
            return;
        }

        let items: Vec<ListItem> = self
            .saved
            .list()
            .iter()
            .map(|article| {
                let meta = format!(
                    "Saved on {} • From {}",
                    article.saved_at.format("%Y-%m-%d"),
                    article.date
                );
                ListItem::new(vec![
                    Line::from(Span::styled(
                        article.title.clone(),
                        Style::default()
                            .fg(palette.base_06)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(meta, Style::default().fg(palette.base_03))),
                    Line::from(""),
                ])
            })
            .collect();

        let (selection_bg, selection_fg) = palette.get_selection_colors(true);
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(selection_bg).fg(selection_fg));
        f.render_stateful_widget(list, area, &mut self.saved_list_state);
    }

    fn draw_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_theme();
        let (content, style) = if let Some(prompt) = &self.prompt {
            let label = match prompt.kind {
                PromptKind::Keyword => "Keyword",
                PromptKind::CustomDate => "Date (YYYY-MM-DD)",
            };
            (
                format!("{}: {}▏  (Enter to apply, Esc to cancel)", label, prompt.buffer),
                Style::default().fg(palette.base_0a),
            )
        } else if let Some(notification) = self.notifications.current() {
            let color = match notification.level {
                NotificationLevel::Info => palette.base_0b,
                NotificationLevel::Warning => palette.base_0a,
                NotificationLevel::Error => palette.base_08,
            };
            (notification.message.clone(), Style::default().fg(color))
        } else {
            let help = match self.view {
                ViewMode::Saved => {
                    "j/k: Navigate | Enter: Open | d: Remove | Esc: Back | q: Quit".to_string()
                }
                ViewMode::Feed => {
                    "j/k: Select | 1-5: Range | c: Date | /: Keyword | w/h/r: Types | \
                     Space: Listen | n: Skip | s: Save | v: Saved | e: Export | q: Quit"
                        .to_string()
                }
            };
            (help, Style::default().fg(palette.base_03))
        };

        let bar = Paragraph::new(content).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.base_02)),
        );
        f.render_widget(bar, area);
    }
}

/// Main loop: draw, poll the event source, tick timers and the speech
/// facility. Everything is cooperative; no wait blocks longer than the
/// tick rate.
pub fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut dyn EventSource,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    loop {
        terminal.draw(|f| app.draw(f))?;

        if events.poll(tick_rate)? {
            let event = events.read()?;
            app.handle_event(event);
        }
        app.tick();

        if app.should_quit() {
            return Ok(());
        }
    }
}
