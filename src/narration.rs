use crate::speech::{SpeechEngine, SpeechEvent};
use log::{debug, info, warn};
use std::fmt;

/// Words-per-minute the reader voice averages; used for the listen-time
/// estimate shown next to the play control.
const NARRATION_WPM: usize = 150;

pub fn estimate_listen_minutes(total_words: usize) -> usize {
    total_words.div_ceil(NARRATION_WPM)
}

/// One queued utterance: the article title and its summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationItem {
    pub title: String,
    pub content: String,
}

impl NarrationItem {
    fn speech_text(&self) -> String {
        format!("{}. {}", self.title, self.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationState {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug)]
pub enum NarrationError {
    NoArticles,
    NoVoices,
    Speech(String),
}

impl fmt::Display for NarrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrationError::NoArticles => write!(f, "No articles to read"),
            NarrationError::NoVoices => {
                write!(f, "Text-to-speech not available: no voices found")
            }
            NarrationError::Speech(msg) => write!(f, "Speech failed: {}", msg),
        }
    }
}

impl std::error::Error for NarrationError {}

/// Ranked list of known-good voices, then any english voice, then whatever
/// the engine offers first.
const VOICE_PRIORITY: &[&str] = &[
    "Google US English",
    "Google UK English Female",
    "Microsoft Zira",
    "Samantha",
    "Karen",
    "Alex",
];

fn select_voice(voices: &[String]) -> Option<String> {
    for preferred in VOICE_PRIORITY {
        if let Some(voice) = voices.iter().find(|v| v.contains(preferred)) {
            return Some(voice.clone());
        }
    }
    voices
        .iter()
        .find(|v| v.to_lowercase().starts_with("en"))
        .or_else(|| voices.first())
        .cloned()
}

/// Sequential reader over the currently visible articles.
///
/// `Idle -> Playing <-> Paused -> Idle`. The queue is rebuilt at every
/// Start and discarded at Stop; the controller never owns the speech
/// facility, it only starts and cancels utterances on the engine it is
/// handed.
pub struct NarrationController {
    state: NarrationState,
    queue: Vec<NarrationItem>,
    index: usize,
    voice: Option<String>,
}

impl Default for NarrationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrationController {
    pub fn new() -> Self {
        Self {
            state: NarrationState::Idle,
            queue: Vec::new(),
            index: 0,
            voice: None,
        }
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != NarrationState::Idle
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn current_item(&self) -> Option<&NarrationItem> {
        if self.is_active() {
            self.queue.get(self.index)
        } else {
            None
        }
    }

    /// "Reading i of n" readout for the status line.
    pub fn status(&self) -> Option<String> {
        match self.state {
            NarrationState::Idle => None,
            NarrationState::Playing => Some(format!(
                "Reading {} of {}",
                self.index + 1,
                self.queue.len()
            )),
            NarrationState::Paused => Some("Paused".to_string()),
        }
    }

    /// Start reading from the top of a freshly built queue. Only valid
    /// from Idle; a Start while active is ignored.
    pub fn start(
        &mut self,
        items: Vec<NarrationItem>,
        engine: &mut dyn SpeechEngine,
    ) -> Result<(), NarrationError> {
        if self.state != NarrationState::Idle {
            debug!("Start ignored: narration already active");
            return Ok(());
        }
        if items.is_empty() {
            return Err(NarrationError::NoArticles);
        }
        let voices = engine.voices();
        if voices.is_empty() {
            return Err(NarrationError::NoVoices);
        }
        self.voice = select_voice(&voices);
        self.queue = items;
        self.index = 0;
        info!("Narration started: {} articles queued", self.queue.len());
        self.speak_current(engine)?;
        self.state = NarrationState::Playing;
        Ok(())
    }

    /// The facility's in-place pause is unreliable, so pausing cancels the
    /// utterance and remembers the index; Resume re-speaks the current
    /// article from its start.
    pub fn pause(&mut self, engine: &mut dyn SpeechEngine) {
        if self.state != NarrationState::Playing {
            return;
        }
        engine.cancel();
        self.state = NarrationState::Paused;
        debug!("Narration paused at article {}", self.index + 1);
    }

    pub fn resume(&mut self, engine: &mut dyn SpeechEngine) -> Result<(), NarrationError> {
        if self.state != NarrationState::Paused {
            return Ok(());
        }
        self.speak_current(engine)?;
        self.state = NarrationState::Playing;
        debug!("Narration resumed at article {}", self.index + 1);
        Ok(())
    }

    /// Cancel the current utterance and move to the next item; past the
    /// end this is a Stop.
    pub fn skip(&mut self, engine: &mut dyn SpeechEngine) -> Result<(), NarrationError> {
        if self.state == NarrationState::Idle {
            return Ok(());
        }
        engine.cancel();
        self.index += 1;
        if self.index >= self.queue.len() {
            self.stop(engine);
            return Ok(());
        }
        self.speak_current(engine)?;
        self.state = NarrationState::Playing;
        Ok(())
    }

    /// Valid from any state: cancel, clear the queue, reset the index.
    pub fn stop(&mut self, engine: &mut dyn SpeechEngine) {
        engine.cancel();
        if self.state != NarrationState::Idle {
            info!("Narration stopped");
        }
        self.state = NarrationState::Idle;
        self.index = 0;
        self.queue.clear();
    }

    /// Feed a completion or error from the speech facility. Events arriving
    /// while not Playing are ignored (a Stop may have raced the callback).
    pub fn on_event(&mut self, event: SpeechEvent, engine: &mut dyn SpeechEngine) {
        match event {
            SpeechEvent::Finished => {
                if self.state != NarrationState::Playing {
                    debug!("Dropping completion event in state {:?}", self.state);
                    return;
                }
                self.advance(engine);
            }
            SpeechEvent::Error(message) => {
                let msg = message.to_lowercase();
                if msg.contains("interrupt") || msg.contains("cancel") {
                    // Expected noise from pause/stop/skip.
                    return;
                }
                warn!("Speech error, skipping forward: {}", message);
                if self.state == NarrationState::Playing {
                    self.advance(engine);
                }
            }
        }
    }

    fn advance(&mut self, engine: &mut dyn SpeechEngine) {
        self.index += 1;
        if self.index >= self.queue.len() {
            self.stop(engine);
            return;
        }
        if let Err(e) = self.speak_current(engine) {
            warn!("Failed to speak next article: {}", e);
            self.stop(engine);
        }
    }

    fn speak_current(&mut self, engine: &mut dyn SpeechEngine) -> Result<(), NarrationError> {
        let item = match self.queue.get(self.index) {
            Some(item) => item,
            None => return Ok(()),
        };
        let text = item.speech_text();
        engine
            .speak(&text, self.voice.as_deref())
            .map_err(|e| NarrationError::Speech(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeSpeech {
        voices: Vec<String>,
        spoken: Vec<String>,
        cancels: usize,
    }

    impl FakeSpeech {
        fn with_voices(voices: &[&str]) -> Self {
            Self {
                voices: voices.iter().map(|v| v.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl SpeechEngine for FakeSpeech {
        fn voices(&mut self) -> Vec<String> {
            self.voices.clone()
        }

        fn speak(&mut self, text: &str, _voice: Option<&str>) -> anyhow::Result<()> {
            self.spoken.push(text.to_string());
            Ok(())
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }

        fn poll(&mut self) -> Option<SpeechEvent> {
            None
        }
    }

    fn items(n: usize) -> Vec<NarrationItem> {
        (0..n)
            .map(|i| NarrationItem {
                title: format!("Article {}", i + 1),
                content: format!("Summary {}", i + 1),
            })
            .collect()
    }

    #[test]
    fn start_on_empty_queue_fails_without_playing() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();

        let result = narrator.start(Vec::new(), &mut engine);
        assert!(matches!(result, Err(NarrationError::NoArticles)));
        assert_eq!(narrator.state(), NarrationState::Idle);
        assert!(engine.spoken.is_empty());
    }

    #[test]
    fn start_without_voices_fails() {
        let mut engine = FakeSpeech::default();
        let mut narrator = NarrationController::new();

        let result = narrator.start(items(2), &mut engine);
        assert!(matches!(result, Err(NarrationError::NoVoices)));
        assert_eq!(narrator.state(), NarrationState::Idle);
    }

    #[test]
    fn start_speaks_the_first_item() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();

        narrator.start(items(2), &mut engine).unwrap();
        assert_eq!(narrator.state(), NarrationState::Playing);
        assert_eq!(engine.spoken, vec!["Article 1. Summary 1"]);
        assert_eq!(narrator.status().unwrap(), "Reading 1 of 2");
    }

    #[test]
    fn completion_advances_and_final_completion_returns_to_idle() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();
        narrator.start(items(2), &mut engine).unwrap();

        narrator.on_event(SpeechEvent::Finished, &mut engine);
        assert_eq!(narrator.state(), NarrationState::Playing);
        assert_eq!(engine.spoken.len(), 2);

        narrator.on_event(SpeechEvent::Finished, &mut engine);
        assert_eq!(narrator.state(), NarrationState::Idle);
        assert_eq!(narrator.queue_len(), 0);
        assert_eq!(narrator.index(), 0);
    }

    #[test]
    fn pause_and_resume_respeak_current_article() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();
        narrator.start(items(2), &mut engine).unwrap();

        narrator.pause(&mut engine);
        assert_eq!(narrator.state(), NarrationState::Paused);
        assert_eq!(narrator.status().unwrap(), "Paused");

        narrator.resume(&mut engine).unwrap();
        assert_eq!(narrator.state(), NarrationState::Playing);
        // Re-spoken from the start of the article, not mid-utterance.
        assert_eq!(
            engine.spoken,
            vec!["Article 1. Summary 1", "Article 1. Summary 1"]
        );
    }

    #[test]
    fn skip_past_end_stops() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();
        narrator.start(items(1), &mut engine).unwrap();

        narrator.skip(&mut engine).unwrap();
        assert_eq!(narrator.state(), NarrationState::Idle);
        assert_eq!(narrator.index(), 0);
        assert_eq!(narrator.queue_len(), 0);
    }

    #[test]
    fn skip_from_paused_returns_to_playing() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();
        narrator.start(items(3), &mut engine).unwrap();

        narrator.pause(&mut engine);
        narrator.skip(&mut engine).unwrap();
        assert_eq!(narrator.state(), NarrationState::Playing);
        assert_eq!(narrator.current_item().unwrap().title, "Article 2");
    }

    #[test]
    fn stop_from_any_state_resets() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();

        narrator.stop(&mut engine);
        assert_eq!(narrator.state(), NarrationState::Idle);

        narrator.start(items(2), &mut engine).unwrap();
        narrator.stop(&mut engine);
        assert_eq!(narrator.state(), NarrationState::Idle);
        assert_eq!(narrator.index(), 0);
        assert_eq!(narrator.queue_len(), 0);
    }

    #[test]
    fn completion_after_stop_has_no_effect() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();
        narrator.start(items(2), &mut engine).unwrap();
        narrator.stop(&mut engine);

        let spoken_before = engine.spoken.len();
        narrator.on_event(SpeechEvent::Finished, &mut engine);
        assert_eq!(narrator.state(), NarrationState::Idle);
        assert_eq!(engine.spoken.len(), spoken_before);
    }

    #[test]
    fn interrupted_error_is_swallowed() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();
        narrator.start(items(2), &mut engine).unwrap();

        narrator.on_event(
            SpeechEvent::Error("speech interrupted".to_string()),
            &mut engine,
        );
        assert_eq!(narrator.state(), NarrationState::Playing);
        assert_eq!(narrator.index(), 0);
    }

    #[test]
    fn other_errors_skip_forward() {
        let mut engine = FakeSpeech::with_voices(&["en-us"]);
        let mut narrator = NarrationController::new();
        narrator.start(items(2), &mut engine).unwrap();

        narrator.on_event(
            SpeechEvent::Error("audio device lost".to_string()),
            &mut engine,
        );
        assert_eq!(narrator.state(), NarrationState::Playing);
        assert_eq!(narrator.current_item().unwrap().title, "Article 2");
    }

    #[test]
    fn voice_selection_prefers_ranked_then_english() {
        let ranked = vec![
            "Fancy Voice".to_string(),
            "Microsoft Zira Desktop".to_string(),
        ];
        assert_eq!(select_voice(&ranked).unwrap(), "Microsoft Zira Desktop");

        let english = vec!["fr-fr".to_string(), "en-gb".to_string()];
        assert_eq!(select_voice(&english).unwrap(), "en-gb");

        let fallback = vec!["fr-fr".to_string()];
        assert_eq!(select_voice(&fallback).unwrap(), "fr-fr");

        assert!(select_voice(&[]).is_none());
    }

    #[test]
    fn listen_estimate_rounds_up() {
        assert_eq!(estimate_listen_minutes(0), 0);
        assert_eq!(estimate_listen_minutes(1), 1);
        assert_eq!(estimate_listen_minutes(150), 1);
        assert_eq!(estimate_listen_minutes(151), 2);
    }
}
