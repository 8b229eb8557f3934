//! Serializable results of a handled command.
//!
//! `--json` output prints one `Resolution` per line.

use serde::{Deserialize, Serialize};

use crate::intent::IntentKind;
use crate::selector::Pick;

/// Which stage of the pipeline produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "source")]
pub enum ResolutionSource {
    /// Exact repeat of a command this user issued before.
    Profile,
    /// A built-in intent handler.
    Intent { intent: IntentKind },
    /// Learned fallback.
    Model,
    /// Random canned response (no model this run).
    Random,
    /// Generic "not sure" response.
    Fallback,
}

impl From<Pick> for ResolutionSource {
    fn from(pick: Pick) -> Self {
        match pick {
            Pick::Model => Self::Model,
            Pick::Random => Self::Random,
            Pick::Fallback => Self::Fallback,
        }
    }
}

/// The response to one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub command: String,
    /// Never empty.
    pub response: String,
    #[serde(flatten)]
    pub source: ResolutionSource,
}

/// Per-session counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub commands: u64,
    pub profile_hits: u64,
    pub intent_hits: u64,
    pub model_hits: u64,
    pub random_picks: u64,
    pub fallbacks: u64,
    pub upstream_failures: u64,
    pub log_write_failures: u64,
}

impl SessionStats {
    pub(crate) fn count(&mut self, source: &ResolutionSource) {
        self.commands += 1;
        match source {
            ResolutionSource::Profile => self.profile_hits += 1,
            ResolutionSource::Intent { .. } => self.intent_hits += 1,
            ResolutionSource::Model => self.model_hits += 1,
            ResolutionSource::Random => self.random_picks += 1,
            ResolutionSource::Fallback => self.fallbacks += 1,
        }
    }
}
