use crossterm::event::KeyCode;
use digestrat::app::{App, ViewMode};
use digestrat::saved::SavedStore;
use digestrat::speech::NullSpeech;
use digestrat::test_utils::{date, key, key_code, sample_days, ScriptedSpeech};
use std::path::PathBuf;

const TODAY: &str = "2026-01-10";

fn app() -> App {
    let today = date(TODAY);
    App::new(
        sample_days(today),
        SavedStore::ephemeral(),
        Box::new(NullSpeech),
        PathBuf::from("."),
        today,
    )
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.handle_key(key(c));
    }
}

#[test]
fn initial_apply_runs_at_startup() {
    let app = app();
    assert_eq!(app.outcome().visible_days, 2);
    assert_eq!(app.visible_articles().len(), 4);
    assert!(app.listen_minutes() >= 1);
    assert!(!app.outcome().no_results);
}

#[test]
fn filter_key_defers_the_apply_until_flushed() {
    let mut app = app();
    app.handle_key(key('w'));

    // The recompute is armed but has not run yet.
    assert!(app.visible_articles().iter().any(|a| a.title == "GPU prices fall"));

    app.flush_pending();
    assert!(app.visible_articles().iter().all(|a| a.title != "GPU prices fall"));
    let chips: Vec<String> = app
        .outcome()
        .chips
        .iter()
        .map(|c| c.label.clone())
        .collect();
    assert_eq!(chips, vec!["Hidden: World Tech News"]);
}

#[test]
fn timer_pass_applies_then_syncs_in_order() {
    let mut app = app();
    app.handle_key(key('h'));

    std::thread::sleep(std::time::Duration::from_millis(200));
    app.tick();
    // Apply has committed; the dependent navigation sync is still pending.
    assert_eq!(app.outcome().chips.len(), 1);

    std::thread::sleep(std::time::Duration::from_millis(100));
    app.tick();
    assert!(app
        .visible_articles()
        .iter()
        .all(|a| a.title != "Show HN: tiny tool"));
}

#[test]
fn keyword_prompt_filters_and_highlights() {
    let mut app = app();
    app.handle_key(key('/'));
    type_text(&mut app, "gpu");
    app.handle_key(key_code(KeyCode::Enter));
    app.flush_pending();

    assert_eq!(app.filters.keyword(), "gpu");
    assert!(!app.visible_articles().is_empty());
    for article in app.visible_articles() {
        assert!(article.keyword_match);
    }
    let titles: Vec<&str> = app
        .visible_articles()
        .iter()
        .map(|a| a.title.as_str())
        .collect();
    assert!(titles.contains(&"GPU prices fall"));
    assert!(titles.contains(&"Attention again"));
    assert!(!titles.contains(&"Show HN: tiny tool"));
}

#[test]
fn chip_action_resets_exactly_one_dimension() {
    let mut app = app();
    app.handle_key(key('h'));
    app.handle_key(key('/'));
    type_text(&mut app, "gpu");
    app.handle_key(key_code(KeyCode::Enter));
    app.flush_pending();
    assert_eq!(app.outcome().chips.len(), 2);

    // First chip is the keyword one; activating it clears only the keyword.
    app.handle_key(key_code(KeyCode::Tab));
    app.handle_key(key_code(KeyCode::Enter));
    app.flush_pending();

    assert_eq!(app.filters.keyword(), "");
    assert!(!app.filters.type_enabled(digestrat::digest::SectionKind::Hn));
    assert_eq!(app.outcome().chips.len(), 1);
}

#[test]
fn custom_date_prompt_shows_exactly_that_day() {
    let mut app = app();
    app.handle_key(key('c'));
    type_text(&mut app, "2026-01-02");
    app.handle_key(key_code(KeyCode::Enter));
    app.flush_pending();

    assert_eq!(app.outcome().visible_days, 1);
    assert!(app
        .visible_articles()
        .iter()
        .all(|a| a.date_str == "2026-01-02"));
    assert_eq!(app.outcome().chips[0].label, "Date: 2026-01-02");
}

#[test]
fn invalid_custom_date_is_rejected_with_a_notice() {
    let mut app = app();
    app.handle_key(key('c'));
    type_text(&mut app, "banana");
    app.handle_key(key_code(KeyCode::Enter));

    assert!(app.notifications().has_notification());
    assert_eq!(app.filters.range(), digestrat::filters::DateRange::All);
    assert!(app.filters.custom_date().is_none());
}

#[test]
fn hopeless_keyword_shows_no_results_banner() {
    let mut app = app();
    app.handle_key(key('/'));
    type_text(&mut app, "zzz-nothing-matches");
    app.handle_key(key_code(KeyCode::Enter));
    app.flush_pending();

    assert!(app.outcome().no_results);
    assert!(app.visible_articles().is_empty());
    assert_eq!(app.listen_minutes(), 0);
}

#[test]
fn saved_snapshot_survives_being_filtered_out() {
    let mut app = app();
    // Selection starts on the first visible article.
    app.handle_key(key('s'));
    assert_eq!(app.saved_store().len(), 1);
    assert!(app.visible_articles()[0].saved);

    app.handle_key(key('/'));
    type_text(&mut app, "browser");
    app.handle_key(key_code(KeyCode::Enter));
    app.flush_pending();
    assert!(app
        .visible_articles()
        .iter()
        .all(|a| a.title != "GPU prices fall"));

    // The snapshot is still there for the saved view.
    assert_eq!(app.saved_store().list()[0].title, "GPU prices fall");
    app.handle_key(key('v'));
    assert_eq!(app.view(), ViewMode::Saved);
}

#[test]
fn saving_twice_round_trips() {
    let mut app = app();
    app.handle_key(key('s'));
    app.handle_key(key('s'));
    assert!(app.saved_store().is_empty());
    assert!(!app.visible_articles()[0].saved);
}

#[test]
fn saved_view_removal_is_id_based() {
    let mut app = app();
    app.handle_key(key('s'));
    app.handle_key(key('j'));
    app.handle_key(key('s'));
    assert_eq!(app.saved_store().len(), 2);

    app.handle_key(key('v'));
    app.handle_key(key('d'));
    assert_eq!(app.saved_store().len(), 1);

    app.handle_key(key_code(KeyCode::Esc));
    assert_eq!(app.view(), ViewMode::Feed);
}

#[test]
fn narration_estimate_follows_the_visible_set() {
    let mut app = app();
    let full_estimate = app.listen_minutes();
    assert!(full_estimate >= 1);

    app.handle_key(key('w'));
    app.handle_key(key('h'));
    app.handle_key(key('r'));
    app.flush_pending();

    assert!(app.visible_articles().is_empty());
    assert_eq!(app.listen_minutes(), 0);
}

#[test]
fn scripted_speech_is_not_needed_for_filtering() {
    // Filtering flows must behave identically with a real-looking engine.
    let today = date(TODAY);
    let (engine, _handle) = ScriptedSpeech::new();
    let mut app = App::new(
        sample_days(today),
        SavedStore::ephemeral(),
        Box::new(engine),
        PathBuf::from("."),
        today,
    );
    app.handle_key(key('w'));
    app.flush_pending();
    assert_eq!(app.outcome().chips.len(), 1);
}
