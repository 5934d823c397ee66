use crate::digest::{DigestDay, SectionKind};
use chrono::{Duration, Months, NaiveDate};
use log::warn;
use std::collections::BTreeSet;

/// The date window a user can filter the feed down to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    All,
    Today,
    ThreeDays,
    Week,
    Month,
    Custom,
}

impl DateRange {
    pub fn chip_label(&self) -> &'static str {
        match self {
            DateRange::All => "All",
            DateRange::Today => "Today",
            DateRange::ThreeDays => "Last 3 Days",
            DateRange::Week => "Last Week",
            DateRange::Month => "Last Month",
            DateRange::Custom => "Custom",
        }
    }
}

/// The current filter selection. Created once with defaults, mutated in
/// place by the filter controls, read in full by every apply pass. Never
/// persisted.
///
/// Invariant: `custom_date` is present if and only if `range == Custom`;
/// every mutation path maintains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    range: DateRange,
    types: BTreeSet<SectionKind>,
    keyword: String,
    custom_date: Option<NaiveDate>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self {
            range: DateRange::All,
            types: SectionKind::filterable().iter().copied().collect(),
            keyword: String::new(),
            custom_date: None,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn types(&self) -> &BTreeSet<SectionKind> {
        &self.types
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn custom_date(&self) -> Option<NaiveDate> {
        self.custom_date
    }

    /// Select a named range. Clears any custom date; `Custom` can only be
    /// entered through [`FilterState::set_custom_date`].
    pub fn set_range(&mut self, range: DateRange) {
        if range == DateRange::Custom {
            warn!("Custom range requires a date; ignoring");
            return;
        }
        self.range = range;
        self.custom_date = None;
    }

    pub fn set_custom_date(&mut self, date: NaiveDate) {
        self.range = DateRange::Custom;
        self.custom_date = Some(date);
    }

    pub fn toggle_type(&mut self, kind: SectionKind) {
        if !self.types.remove(&kind) {
            self.types.insert(kind);
        }
    }

    pub fn enable_type(&mut self, kind: SectionKind) {
        self.types.insert(kind);
    }

    pub fn type_enabled(&self, kind: SectionKind) -> bool {
        self.types.contains(&kind)
    }

    /// Keyword is stored lowercased and trimmed; matching is substring.
    pub fn set_keyword(&mut self, raw: &str) {
        self.keyword = raw.trim().to_lowercase();
    }

    pub fn clear_keyword(&mut self) {
        self.keyword.clear();
    }

    pub fn reset_range(&mut self) {
        self.range = DateRange::All;
        self.custom_date = None;
    }
}

/// Three-valued visibility outcome for every node of the content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    HiddenByDate,
    HiddenByFilter,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleView {
    pub visible: bool,
    pub keyword_match: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub visibility: Visibility,
    pub articles: Vec<ArticleView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub visibility: Visibility,
    pub sections: Vec<SectionView>,
}

/// The reverse action carried by an active-filter chip: resets exactly one
/// filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipAction {
    ResetRange,
    ClearKeyword,
    EnableType(SectionKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub label: String,
    pub action: ChipAction,
}

/// Result of one apply pass: a visibility projection over the content tree
/// plus the derived displays. Applying it is a pure re-render; running the
/// pass twice with unchanged state produces an equal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    pub days: Vec<DayView>,
    pub chips: Vec<Chip>,
    pub no_results: bool,
    pub visible_days: usize,
}

impl ApplyOutcome {
    pub fn day_visible(&self, day: usize) -> bool {
        self.days
            .get(day)
            .map(|d| d.visibility.is_visible())
            .unwrap_or(false)
    }
}

fn date_window_passes(
    range: DateRange,
    date: NaiveDate,
    today: NaiveDate,
    custom: Option<NaiveDate>,
) -> bool {
    match range {
        DateRange::All => true,
        DateRange::Custom => custom.map(|c| date == c).unwrap_or(false),
        DateRange::Today => date == today,
        DateRange::ThreeDays => date >= today - Duration::days(3),
        DateRange::Week => date >= today - Duration::days(7),
        DateRange::Month => {
            let month_ago = today.checked_sub_months(Months::new(1)).unwrap_or(today);
            date >= month_ago
        }
    }
}

/// Project the filter state onto the content tree.
///
/// `today` is the start-of-day date captured at startup; the window for the
/// relative ranges is computed against it on every pass but the reference
/// date itself is never refreshed while the app runs.
pub fn apply_filters(state: &FilterState, days: &[DigestDay], today: NaiveDate) -> ApplyOutcome {
    let mut day_views = Vec::with_capacity(days.len());
    let mut visible_days = 0;

    for day in days {
        if !date_window_passes(state.range(), day.date, today, state.custom_date()) {
            day_views.push(DayView {
                visibility: Visibility::HiddenByDate,
                sections: day
                    .sections
                    .iter()
                    .map(|s| SectionView {
                        visibility: Visibility::HiddenByDate,
                        articles: vec![
                            ArticleView {
                                visible: false,
                                keyword_match: false
                            };
                            s.articles.len()
                        ],
                    })
                    .collect(),
            });
            continue;
        }

        let mut section_views = Vec::with_capacity(day.sections.len());
        let mut any_section_visible = false;

        for section in &day.sections {
            if !state.type_enabled(section.kind) {
                section_views.push(SectionView {
                    visibility: Visibility::HiddenByFilter,
                    articles: vec![
                        ArticleView {
                            visible: false,
                            keyword_match: false
                        };
                        section.articles.len()
                    ],
                });
                continue;
            }

            let keyword = state.keyword();
            if keyword.is_empty() {
                section_views.push(SectionView {
                    visibility: Visibility::Visible,
                    articles: vec![
                        ArticleView {
                            visible: true,
                            keyword_match: false
                        };
                        section.articles.len()
                    ],
                });
                any_section_visible = true;
                continue;
            }

            let articles: Vec<ArticleView> = section
                .articles
                .iter()
                .map(|a| {
                    let matched = a.combined_text().to_lowercase().contains(keyword);
                    ArticleView {
                        visible: matched,
                        keyword_match: matched,
                    }
                })
                .collect();
            let any_match = articles.iter().any(|a| a.visible);
            section_views.push(SectionView {
                visibility: if any_match {
                    Visibility::Visible
                } else {
                    Visibility::HiddenByFilter
                },
                articles,
            });
            if any_match {
                any_section_visible = true;
            }
        }

        if any_section_visible {
            visible_days += 1;
        }
        day_views.push(DayView {
            visibility: if any_section_visible {
                Visibility::Visible
            } else {
                Visibility::HiddenByFilter
            },
            sections: section_views,
        });
    }

    ApplyOutcome {
        days: day_views,
        chips: build_chips(state),
        no_results: visible_days == 0,
        visible_days,
    }
}

fn build_chips(state: &FilterState) -> Vec<Chip> {
    let mut chips = Vec::new();

    if state.range() != DateRange::All {
        let label = match (state.range(), state.custom_date()) {
            (DateRange::Custom, Some(date)) => format!("Date: {}", date.format("%Y-%m-%d")),
            (range, _) => range.chip_label().to_string(),
        };
        chips.push(Chip {
            label,
            action: ChipAction::ResetRange,
        });
    }

    if !state.keyword().is_empty() {
        chips.push(Chip {
            label: format!("Keyword: \"{}\"", state.keyword()),
            action: ChipAction::ClearKeyword,
        });
    }

    for kind in SectionKind::filterable() {
        if !state.type_enabled(*kind) {
            chips.push(Chip {
                label: format!("Hidden: {}", kind.display_name()),
                action: ChipAction::EnableType(*kind),
            });
        }
    }

    chips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Article, Section};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn article(title: &str, summary: &str) -> Article {
        Article {
            title: title.to_string(),
            url: "https://example.com".to_string(),
            summary: summary.to_string(),
        }
    }

    fn section(heading: &str, articles: Vec<Article>) -> Section {
        Section {
            heading: heading.to_string(),
            kind: SectionKind::classify(heading),
            articles,
        }
    }

    fn sample_days() -> Vec<DigestDay> {
        vec![
            DigestDay::new(
                date("2026-01-10"),
                vec![
                    section(
                        "World Tech News",
                        vec![
                            article("GPU prices fall", "Supply caught up."),
                            article("Quiet week for chips", "Nothing happened."),
                        ],
                    ),
                    section("Hacker News", vec![article("Show HN", "A tiny tool.")]),
                ],
            ),
            DigestDay::new(
                date("2026-01-02"),
                vec![section(
                    "Research Papers",
                    vec![article("Attention again", "Transformers, GPU training.")],
                )],
            ),
        ]
    }

    const TODAY: &str = "2026-01-10";

    #[test]
    fn custom_date_invariant_holds_after_every_mutation() {
        let mut state = FilterState::new();
        assert!(state.custom_date().is_none());

        state.set_custom_date(date("2026-01-02"));
        assert_eq!(state.range(), DateRange::Custom);
        assert!(state.custom_date().is_some());

        state.set_range(DateRange::Week);
        assert!(state.custom_date().is_none());

        state.set_custom_date(date("2026-01-02"));
        state.reset_range();
        assert_eq!(state.range(), DateRange::All);
        assert!(state.custom_date().is_none());
    }

    #[test]
    fn set_range_custom_without_date_is_rejected() {
        let mut state = FilterState::new();
        state.set_range(DateRange::Custom);
        assert_eq!(state.range(), DateRange::All);
        assert!(state.custom_date().is_none());
    }

    #[test]
    fn apply_is_idempotent() {
        let days = sample_days();
        let mut state = FilterState::new();
        state.set_keyword("gpu");
        state.toggle_type(SectionKind::Hn);

        let first = apply_filters(&state, &days, date(TODAY));
        let second = apply_filters(&state, &days, date(TODAY));
        assert_eq!(first, second);
    }

    #[test]
    fn day_visible_iff_some_section_visible() {
        let days = sample_days();
        let mut state = FilterState::new();
        state.set_keyword("gpu");

        let outcome = apply_filters(&state, &days, date(TODAY));
        for day in &outcome.days {
            let any = day.sections.iter().any(|s| s.visibility.is_visible());
            assert_eq!(day.visibility.is_visible(), any);
        }
    }

    #[test]
    fn week_and_tech_scenario() {
        let days = sample_days();
        let mut state = FilterState::new();
        state.set_range(DateRange::Week);
        state.toggle_type(SectionKind::Hn);
        state.toggle_type(SectionKind::Research);

        let outcome = apply_filters(&state, &days, date(TODAY));

        // 2026-01-02 is more than 7 days before 2026-01-10.
        assert_eq!(outcome.days[0].visibility, Visibility::Visible);
        assert_eq!(outcome.days[1].visibility, Visibility::HiddenByDate);
        assert_eq!(
            outcome.days[0].sections[0].visibility,
            Visibility::Visible
        );
        assert_eq!(
            outcome.days[0].sections[1].visibility,
            Visibility::HiddenByFilter
        );

        let labels: Vec<&str> = outcome.chips.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Last Week", "Hidden: Hacker News", "Hidden: Research Papers"]
        );
    }

    #[test]
    fn keyword_hides_nonmatching_articles_and_sections() {
        let days = sample_days();
        let mut state = FilterState::new();
        state.set_keyword("GPU");
        assert_eq!(state.keyword(), "gpu");

        let outcome = apply_filters(&state, &days, date(TODAY));

        let tech = &outcome.days[0].sections[0];
        assert!(tech.visibility.is_visible());
        assert!(tech.articles[0].visible && tech.articles[0].keyword_match);
        assert!(!tech.articles[1].visible && !tech.articles[1].keyword_match);

        // "Show HN" has no gpu match anywhere, so the section hides even
        // though its type is enabled.
        let hn = &outcome.days[0].sections[1];
        assert_eq!(hn.visibility, Visibility::HiddenByFilter);

        // Research day matches through its summary text.
        assert!(outcome.days[1].visibility.is_visible());
    }

    #[test]
    fn unclassified_sections_never_pass_the_type_filter() {
        let days = vec![DigestDay::new(
            date("2026-01-10"),
            vec![section("Weather", vec![article("Cloudy", "Rain later.")])],
        )];
        let state = FilterState::new();

        let outcome = apply_filters(&state, &days, date(TODAY));
        assert_eq!(
            outcome.days[0].sections[0].visibility,
            Visibility::HiddenByFilter
        );
        assert!(outcome.no_results);
    }

    #[test]
    fn custom_date_matches_exactly_one_day() {
        let days = sample_days();
        let mut state = FilterState::new();
        state.set_custom_date(date("2026-01-02"));

        let outcome = apply_filters(&state, &days, date(TODAY));
        assert_eq!(outcome.days[0].visibility, Visibility::HiddenByDate);
        assert!(outcome.days[1].visibility.is_visible());
        assert_eq!(outcome.chips[0].label, "Date: 2026-01-02");
        assert_eq!(outcome.chips[0].action, ChipAction::ResetRange);
    }

    #[test]
    fn relative_windows_are_inclusive() {
        let days = vec![
            DigestDay::new(date("2026-01-07"), vec![section("Tech News", vec![])]),
            DigestDay::new(date("2026-01-03"), vec![section("Tech News", vec![])]),
        ];
        let mut state = FilterState::new();
        state.set_range(DateRange::Week);

        let outcome = apply_filters(&state, &days, date(TODAY));
        // 2026-01-03 == today - 7 days, still inside the window.
        assert!(date_window_passes(
            DateRange::Week,
            date("2026-01-03"),
            date(TODAY),
            None
        ));
        assert!(outcome.days[0].visibility.is_visible());
        assert!(outcome.days[1].visibility.is_visible());
    }

    #[test]
    fn no_results_banner_only_when_nothing_visible() {
        let days = sample_days();
        let mut state = FilterState::new();

        let outcome = apply_filters(&state, &days, date(TODAY));
        assert!(!outcome.no_results);
        assert_eq!(outcome.visible_days, 2);

        state.set_keyword("zzz-no-such-word");
        let outcome = apply_filters(&state, &days, date(TODAY));
        assert!(outcome.no_results);
        assert_eq!(outcome.visible_days, 0);
    }

    #[test]
    fn toggle_type_round_trips() {
        let mut state = FilterState::new();
        assert!(state.type_enabled(SectionKind::Hn));
        state.toggle_type(SectionKind::Hn);
        assert!(!state.type_enabled(SectionKind::Hn));
        state.toggle_type(SectionKind::Hn);
        assert!(state.type_enabled(SectionKind::Hn));
    }
}
