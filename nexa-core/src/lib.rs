//! # nexa-core
//!
//! Voice-command resolution engine: a spoken or typed command goes in, one
//! non-empty response comes out.
//!
//! ## Architecture
//!
//! ```text
//! CommandSource::capture
//!        │
//!  Session::handle ──► ProfileStore::record_lookup ──hit──┐
//!        │ miss                                           │
//!        ├──────────► IntentMatcher ──match──► ActionExecutor
//!        │ no match                                       │
//!        └──────────► selector::select (TrainedModel | random)
//!                                                         │
//!                      ProfileStore::append + InteractionLog::append
//!                                                         │
//!                                                ResponseSink::emit
//! ```
//!
//! The model is trained once in `Session::open` from the interaction log.
//! Alarms run on the `Scheduler` and speak through the shared sink.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod actions;
pub mod classifier;
pub mod error;
pub mod events;
pub mod intent;
pub mod interactions;
mod journal;
pub mod lists;
pub mod profile;
pub mod regions;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod speech;

// Convenience re-exports for downstream crates
pub use actions::{ActionExecutor, EndpointConfig, LookupEndpoints, StubActions};
pub use classifier::{train, TrainedModel, TrainerConfig};
pub use error::{InputFailure, NexaError, Result};
pub use events::{Resolution, ResolutionSource, SessionStats};
pub use intent::{IntentKind, IntentMatch, IntentMatcher};
pub use interactions::{InteractionLog, InteractionRecord};
pub use lists::{ListAction, ListKind, ListStore};
pub use profile::{ProfileEntry, ProfileStore};
pub use regions::RegionMap;
pub use scheduler::{JobId, Scheduler};
pub use selector::{LabelBinding, ResponseCatalog, GENERIC_FALLBACK};
pub use session::{Collaborators, LoopExit, Session, SessionConfig};
pub use speech::{CommandSource, ResponseSink};

#[cfg(feature = "http")]
pub use actions::HttpLookup;
