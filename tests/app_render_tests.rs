use digestrat::app::{run_app, App};
use digestrat::event_source::ScriptedEventSource;
use digestrat::saved::SavedStore;
use digestrat::test_utils::{date, key, sample_days, ScriptedSpeech};
use ratatui::{backend::TestBackend, Terminal};
use std::path::PathBuf;

const TODAY: &str = "2026-01-10";

fn app() -> App {
    let today = date(TODAY);
    let (engine, _handle) = ScriptedSpeech::new();
    App::new(
        sample_days(today),
        SavedStore::ephemeral(),
        Box::new(engine),
        PathBuf::from("."),
        today,
    )
}

fn rendered_text(terminal: &Terminal<TestBackend>) -> String {
    terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

#[test]
fn run_loop_processes_scripted_keys_and_quits() {
    let mut terminal = Terminal::new(TestBackend::new(100, 32)).unwrap();
    let mut app = app();
    let mut events = ScriptedEventSource::new(vec![
        ScriptedEventSource::char_key('j'),
        ScriptedEventSource::char_key('w'),
        ScriptedEventSource::char_key('q'),
    ]);

    run_app(&mut terminal, &mut app, &mut events).unwrap();
    assert!(app.should_quit());
}

#[test]
fn feed_view_renders_days_sections_and_articles() {
    let mut terminal = Terminal::new(TestBackend::new(110, 40)).unwrap();
    let mut app = app();

    terminal.draw(|f| app.draw(f)).unwrap();
    let text = rendered_text(&terminal);

    assert!(text.contains("January 10, 2026"));
    assert!(text.contains("World Tech News"));
    assert!(text.contains("GPU prices fall"));
    assert!(text.contains("min listen"));
}

#[test]
fn no_results_banner_renders_when_everything_is_filtered() {
    let mut terminal = Terminal::new(TestBackend::new(100, 32)).unwrap();
    let mut app = app();
    app.handle_key(key('/'));
    for c in "zzz".chars() {
        app.handle_key(key(c));
    }
    app.handle_key(digestrat::test_utils::key_code(
        crossterm::event::KeyCode::Enter,
    ));
    app.flush_pending();

    terminal.draw(|f| app.draw(f)).unwrap();
    let text = rendered_text(&terminal);
    assert!(text.contains("No results"));
}

#[test]
fn saved_view_renders_snapshots() {
    let mut terminal = Terminal::new(TestBackend::new(100, 32)).unwrap();
    let mut app = app();
    app.handle_key(key('s'));
    app.handle_key(key('v'));

    terminal.draw(|f| app.draw(f)).unwrap();
    let text = rendered_text(&terminal);
    assert!(text.contains("Saved Articles (1)"));
    assert!(text.contains("GPU prices fall"));
}
