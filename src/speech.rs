use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::process::{Child, Command, Stdio};

/// Completion signal from the speech facility. Cancellation does not emit
/// an event; a canceled utterance simply disappears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Finished,
    Error(String),
}

/// Capability interface over the platform speech facility. The narration
/// controller only starts and cancels utterances; at most one utterance is
/// in flight at a time, enforced by canceling before speaking.
pub trait SpeechEngine {
    /// Available voice names. An empty list means narration cannot start.
    fn voices(&mut self) -> Vec<String>;

    /// Begin speaking `text`, canceling any utterance already in flight.
    fn speak(&mut self, text: &str, voice: Option<&str>) -> Result<()>;

    /// Cancel the in-flight utterance, if any. Must suppress its
    /// completion event.
    fn cancel(&mut self);

    /// Non-blocking check for a completion or error from the current
    /// utterance. Called from the app tick loop.
    fn poll(&mut self) -> Option<SpeechEvent>;
}

/// Speech engine driving a command-line synthesizer as a child process.
///
/// Rate and pitch arguments approximate the reader voice settings of the
/// web version (rate 0.95, pitch 1.1 on espeak's 175/50 defaults).
pub struct CommandSpeech {
    program: String,
    child: Option<Child>,
}

const SYNTHESIZERS: &[&str] = &["espeak-ng", "espeak", "say"];

impl CommandSpeech {
    /// Probe for a usable synthesizer on PATH.
    pub fn detect() -> Option<Self> {
        for program in SYNTHESIZERS {
            let probe = Command::new(program)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            if probe.is_ok() {
                info!("Using speech synthesizer: {}", program);
                return Some(Self {
                    program: program.to_string(),
                    child: None,
                });
            }
        }
        warn!("No speech synthesizer found on PATH");
        None
    }

    #[cfg(test)]
    fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            child: None,
        }
    }
}

impl SpeechEngine for CommandSpeech {
    fn voices(&mut self) -> Vec<String> {
        // Voice enumeration differs per synthesizer; expose a default voice
        // plus the english ones the narrator prefers.
        vec!["default".to_string(), "en-us".to_string()]
    }

    fn speak(&mut self, text: &str, voice: Option<&str>) -> Result<()> {
        self.cancel();

        let mut command = Command::new(&self.program);
        if self.program.starts_with("espeak") {
            command.args(["-s", "165", "-p", "55"]);
            if let Some(voice) = voice.filter(|v| *v != "default") {
                command.args(["-v", voice]);
            }
        } else if let Some(voice) = voice.filter(|v| *v != "default") {
            command.args(["-v", voice]);
        }
        let child = command
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;
        debug!("Speaking {} chars via {}", text.len(), self.program);
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn poll(&mut self) -> Option<SpeechEvent> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                if status.success() {
                    Some(SpeechEvent::Finished)
                } else {
                    Some(SpeechEvent::Error(format!(
                        "synthesizer exited with {}",
                        status
                    )))
                }
            }
            Ok(None) => None,
            Err(e) => {
                self.child = None;
                Some(SpeechEvent::Error(e.to_string()))
            }
        }
    }
}

/// Stand-in engine for machines without a synthesizer (or `--no-speech`).
/// Reports no voices, so narration fails with the dedicated notice instead
/// of stalling.
#[derive(Debug, Default)]
pub struct NullSpeech;

impl SpeechEngine for NullSpeech {
    fn voices(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn speak(&mut self, _text: &str, _voice: Option<&str>) -> Result<()> {
        Err(anyhow::anyhow!("no speech synthesizer available"))
    }

    fn cancel(&mut self) {}

    fn poll(&mut self) -> Option<SpeechEvent> {
        None
    }
}
