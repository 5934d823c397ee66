use crate::digest::DigestDay;
use crate::filters::{ApplyOutcome, Chip, ChipAction};
use crate::theme::Base16Palette;
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

/// One table-of-contents entry per digest day. Entries are generated once
/// at load; filtering only flips their `hidden` flag afterwards.
#[derive(Debug, Clone)]
pub struct TocEntry {
    pub date_str: String,
    pub label: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavRow {
    Chip(usize),
    Day(usize),
}

/// What the user activated in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    None,
    Chip(ChipAction),
    JumpToDay(usize),
}

/// Left-hand panel: active filter chips on top, then the day navigation
/// list with hidden days filtered out.
pub struct NavigationPanel {
    entries: Vec<TocEntry>,
    chips: Vec<Chip>,
    rows: Vec<NavRow>,
    pub selected: usize,
    pub list_state: ListState,
}

impl NavigationPanel {
    pub fn new(days: &[DigestDay]) -> Self {
        let entries = days
            .iter()
            .map(|day| TocEntry {
                date_str: day.date_str.clone(),
                label: day.label.clone(),
                hidden: false,
            })
            .collect();
        let mut panel = Self {
            entries,
            chips: Vec::new(),
            rows: Vec::new(),
            selected: 0,
            list_state: ListState::default(),
        };
        panel.rebuild_rows();
        panel
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    /// Re-sync with a finished apply pass: day entries whose target is
    /// hidden disappear from the list, chips are replaced wholesale.
    pub fn sync(&mut self, outcome: &ApplyOutcome) {
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            entry.hidden = !outcome.day_visible(idx);
        }
        self.chips = outcome.chips.clone();
        self.rebuild_rows();
    }

    fn rebuild_rows(&mut self) {
        self.rows.clear();
        for idx in 0..self.chips.len() {
            self.rows.push(NavRow::Chip(idx));
        }
        for (idx, entry) in self.entries.iter().enumerate() {
            if !entry.hidden {
                self.rows.push(NavRow::Day(idx));
            }
        }
        if self.rows.is_empty() {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(self.rows.len() - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    pub fn move_selection_down(&mut self) {
        if !self.rows.is_empty() && self.selected + 1 < self.rows.len() {
            self.selected += 1;
            self.list_state.select(Some(self.selected));
        }
    }

    pub fn move_selection_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.list_state.select(Some(self.selected));
        }
    }

    pub fn selected_action(&self) -> NavAction {
        match self.rows.get(self.selected) {
            Some(NavRow::Chip(idx)) => self
                .chips
                .get(*idx)
                .map(|c| NavAction::Chip(c.action))
                .unwrap_or(NavAction::None),
            Some(NavRow::Day(idx)) => NavAction::JumpToDay(*idx),
            None => NavAction::None,
        }
    }

    pub fn render(
        &mut self,
        f: &mut Frame,
        area: Rect,
        is_focused: bool,
        palette: &Base16Palette,
        saved_count: usize,
    ) {
        let (text_color, border_color, _bg) = palette.get_panel_colors(is_focused);
        let (selection_bg, selection_fg) = palette.get_selection_colors(is_focused);

        let mut items: Vec<ListItem> = Vec::new();
        for row in &self.rows {
            match row {
                NavRow::Chip(idx) => {
                    let chip = &self.chips[*idx];
                    items.push(ListItem::new(Line::from(vec![
                        Span::styled("✕ ", Style::default().fg(palette.base_08)),
                        Span::styled(chip.label.clone(), Style::default().fg(palette.base_09)),
                    ])));
                }
                NavRow::Day(idx) => {
                    let entry = &self.entries[*idx];
                    items.push(ListItem::new(Line::from(Span::styled(
                        format!("  {}", entry.label),
                        Style::default().fg(text_color),
                    ))));
                }
            }
        }

        let title = if saved_count > 0 {
            format!("Digest — {} saved", saved_count)
        } else {
            "Digest".to_string()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(border_color))
                    .style(Style::default().bg(palette.base_00)),
            )
            .highlight_style(Style::default().bg(selection_bg).fg(selection_fg));

        f.render_stateful_widget(list, area, &mut self.list_state);
    }
}
