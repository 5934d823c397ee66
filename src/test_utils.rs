//! Shared helpers for unit and integration tests.

use crate::digest::{Article, DigestDay, Section, SectionKind};
use crate::speech::{SpeechEngine, SpeechEvent};
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Speech engine scripted from the outside: tests push completion events
/// through the handle and inspect what was spoken.
pub struct ScriptedSpeech {
    voices: Vec<String>,
    shared: Arc<Mutex<SpeechLog>>,
}

#[derive(Default)]
struct SpeechLog {
    spoken: Vec<String>,
    cancels: usize,
    pending_events: VecDeque<SpeechEvent>,
}

#[derive(Clone)]
pub struct SpeechHandle {
    shared: Arc<Mutex<SpeechLog>>,
}

impl SpeechHandle {
    pub fn push_event(&self, event: SpeechEvent) {
        self.shared.lock().unwrap().pending_events.push_back(event);
    }

    pub fn spoken(&self) -> Vec<String> {
        self.shared.lock().unwrap().spoken.clone()
    }

    pub fn cancels(&self) -> usize {
        self.shared.lock().unwrap().cancels
    }
}

impl ScriptedSpeech {
    pub fn new() -> (Self, SpeechHandle) {
        Self::with_voices(&["en-us"])
    }

    pub fn with_voices(voices: &[&str]) -> (Self, SpeechHandle) {
        let shared = Arc::new(Mutex::new(SpeechLog::default()));
        let engine = Self {
            voices: voices.iter().map(|v| v.to_string()).collect(),
            shared: shared.clone(),
        };
        (engine, SpeechHandle { shared })
    }
}

impl SpeechEngine for ScriptedSpeech {
    fn voices(&mut self) -> Vec<String> {
        self.voices.clone()
    }

    fn speak(&mut self, text: &str, _voice: Option<&str>) -> anyhow::Result<()> {
        self.shared.lock().unwrap().spoken.push(text.to_string());
        Ok(())
    }

    fn cancel(&mut self) {
        self.shared.lock().unwrap().cancels += 1;
    }

    fn poll(&mut self) -> Option<SpeechEvent> {
        self.shared.lock().unwrap().pending_events.pop_front()
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date")
}

pub fn article(title: &str, summary: &str) -> Article {
    Article {
        title: title.to_string(),
        url: format!("https://example.com/{}", title.replace(' ', "-").to_lowercase()),
        summary: summary.to_string(),
    }
}

pub fn section(heading: &str, articles: Vec<Article>) -> Section {
    Section {
        heading: heading.to_string(),
        kind: SectionKind::classify(heading),
        articles,
    }
}

/// Two digest days: one dated `today` with tech + hn sections, one eight
/// days older with a research section.
pub fn sample_days(today: NaiveDate) -> Vec<DigestDay> {
    vec![
        DigestDay::new(
            today,
            vec![
                section(
                    "World Tech News",
                    vec![
                        article("GPU prices fall", "Supply caught up with demand."),
                        article("New browser engine", "Written from scratch in a weekend."),
                    ],
                ),
                section(
                    "Hacker News",
                    vec![article("Show HN: tiny tool", "It does one thing well.")],
                ),
            ],
        ),
        DigestDay::new(
            today - chrono::Duration::days(8),
            vec![section(
                "Research Papers",
                vec![article("Attention again", "A survey of GPU training tricks.")],
            )],
        ),
    ]
}

pub fn key(c: char) -> KeyEvent {
    key_code(KeyCode::Char(c))
}

pub fn key_code(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::empty(),
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}
