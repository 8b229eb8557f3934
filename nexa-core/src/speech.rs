//! Command capture and response output.
//!
//! A `CommandSource` yields one utterance per call; a `ResponseSink` speaks
//! or prints. The sink is shared with scheduled jobs, so it must be
//! `Send + Sync`.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{InputFailure, NexaError, Result};

pub trait CommandSource {
    /// Next utterance. `Ok(None)` means the input is exhausted.
    ///
    /// # Errors
    /// `NexaError::Input` when something was captured but is unusable.
    fn capture(&mut self) -> Result<Option<String>>;
}

pub trait ResponseSink: Send + Sync {
    fn emit(&self, text: &str);
}

/// Spoken once at startup.
pub const GREETING: &str = "Hello! How can I assist you today?";

/// Spoken when the user quits.
pub const FAREWELL: &str = "Goodbye!";

pub const SERVICE_DOWN: &str =
    "Sorry, my speech service is down. Check your network connection and try again.";

pub const TIMEOUT_PROMPT: &str = "Timeout exceeded. Please try again.";

/// Re-prompts after an unintelligible capture.
pub const REPROMPTS: &[&str] = &[
    "Oops! I missed that. Can you repeat it, please?",
    "I'm having trouble hearing you. Can you say that once more?",
    "I didn't get that. Can you try saying it differently?",
    "Sorry, I didn't hear you clearly. Could you say it again?",
    "Hmm, I missed that. Could you try saying it once more?",
    "Looks like I didn't get that. Can you repeat it?",
    "Oops, I didn't quite hear you. Can you say that again?",
];

const QUIT_PHRASES: &[&str] = &["quit", "exit", "goodbye", "bye"];

/// What to say back for a failed capture.
pub fn input_failure_prompt<R: Rng + ?Sized>(failure: InputFailure, rng: &mut R) -> &'static str {
    match failure {
        InputFailure::Unrecognized => REPROMPTS.choose(rng).copied().unwrap_or(REPROMPTS[0]),
        InputFailure::ServiceUnavailable => SERVICE_DOWN,
        InputFailure::Timeout => TIMEOUT_PROMPT,
    }
}

/// Prompt for any error surfaced by `CommandSource::capture`.
pub fn capture_error_prompt<R: Rng + ?Sized>(error: &NexaError, rng: &mut R) -> &'static str {
    match error {
        NexaError::Input(failure) => input_failure_prompt(*failure, rng),
        _ => SERVICE_DOWN,
    }
}

pub fn is_quit_phrase(command: &str) -> bool {
    let trimmed = command.trim().trim_end_matches(['.', '!']);
    QUIT_PHRASES.iter().any(|q| trimmed.eq_ignore_ascii_case(q))
}

/// Sink that collects everything it is given.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: parking_lot::Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ResponseSink for MemorySink {
    fn emit(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

/// Source replaying a fixed script; `Err` entries simulate failed captures.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: std::collections::VecDeque<std::result::Result<String, InputFailure>>,
}

impl ScriptedSource {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<String, InputFailure>>,
    {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl CommandSource for ScriptedSource {
    fn capture(&mut self) -> Result<Option<String>> {
        match self.script.pop_front() {
            Some(Ok(text)) => Ok(Some(text)),
            Some(Err(failure)) => Err(NexaError::Input(failure)),
            None => Ok(None),
        }
    }
}
