//! Terminal input and output.

use std::io::{BufRead, Write};
use std::process::Command;

use nexa_core::{CommandSource, InputFailure, NexaError, ResponseSink, Result};
use parking_lot::Mutex;
use tracing::warn;

/// Reads one command per line. Blank lines count as unrecognised input.
pub struct ConsoleSource<R> {
    reader: R,
    prompt: bool,
}

impl<R: BufRead> ConsoleSource<R> {
    pub fn new(reader: R, prompt: bool) -> Self {
        Self { reader, prompt }
    }
}

impl<R: BufRead> CommandSource for ConsoleSource<R> {
    fn capture(&mut self) -> Result<Option<String>> {
        if self.prompt {
            eprint!("> ");
            let _ = std::io::stderr().flush();
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let command = line.trim().to_lowercase();
        if command.is_empty() {
            return Err(NexaError::Input(InputFailure::Unrecognized));
        }
        Ok(Some(command))
    }
}

/// Prints responses to stdout and optionally hands them to a speech program.
pub struct ConsoleSink {
    tts_command: Option<String>,
    // Alarms emit from blocking worker threads.
    out: Mutex<std::io::Stdout>,
}

impl ConsoleSink {
    pub fn new(tts_command: Option<String>) -> Self {
        Self {
            tts_command,
            out: Mutex::new(std::io::stdout()),
        }
    }

    fn speak(&self, text: &str) {
        let Some(program) = self.tts_command.as_deref() else {
            return;
        };
        let mut parts = program.split_whitespace();
        let Some(exe) = parts.next() else {
            return;
        };
        match Command::new(exe).args(parts).arg(text).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(%status, program, "speech program failed"),
            Err(e) => warn!(error = %e, program, "speech program unavailable"),
        }
    }
}

impl ResponseSink for ConsoleSink {
    fn emit(&self, text: &str) {
        {
            let mut out = self.out.lock();
            if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
                warn!(error = %e, "stdout write failed");
            }
        }
        self.speak(text);
    }
}
