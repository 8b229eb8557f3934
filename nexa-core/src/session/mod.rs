//! `Session`: one assistant run, from startup load to shutdown.
//!
//! ## Lifecycle
//!
//! ```text
//! Session::open()
//!     ├─► InteractionLog::load_report   → corpus (malformed lines skipped)
//!     ├─► classifier::train              → Option<TrainedModel>
//!     ├─► check_binding                  → misalignment warning
//!     └─► profiles, catalog, regions, lists
//! Session::handle(user, command)        → Resolution (repeatable)
//! Session::shutdown()                   → pending jobs cancelled, lists compacted
//! ```
//!
//! `handle` resolves in a fixed order: exact profile repeat, built-in intent,
//! learned or random fallback. Whatever answers is appended to the profile
//! store and the interaction log before returning.

mod dispatch;

use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::actions::ActionExecutor;
use crate::classifier::{self, TrainedModel, TrainerConfig};
use crate::error::{InputFailure, NexaError, Result};
use crate::events::{Resolution, ResolutionSource, SessionStats};
use crate::intent::IntentMatcher;
use crate::interactions::{InteractionLog, InteractionRecord};
use crate::lists::ListStore;
use crate::profile::ProfileStore;
use crate::regions::RegionMap;
use crate::scheduler::Scheduler;
use crate::selector::{self, check_binding, LabelBinding, Pick, ResponseCatalog, GENERIC_FALLBACK};
use crate::speech::{
    capture_error_prompt, input_failure_prompt, is_quit_phrase, CommandSource, ResponseSink, FAREWELL, GREETING,
};

/// Configuration for `Session`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Newline-delimited JSON interaction log. Default: `interactions.jsonl`.
    pub log_path: PathBuf,
    /// Canned responses, one per line. Default: `response.txt`.
    pub catalog_path: PathBuf,
    /// Country → capital JSON object. Default: `countries_capitals.json`.
    pub regions_path: PathBuf,
    /// Directory holding the list operation logs. Default: `lists`.
    pub lists_dir: PathBuf,
    pub trainer: TrainerConfig,
    pub label_binding: LabelBinding,
    /// Spoken when nothing else applies.
    pub fallback_response: String,
    /// Seeds response sampling, and training when `trainer.seed` is unset.
    pub seed: Option<u64>,
    /// Build profiles from the log when the host supplies none.
    pub seed_profiles_from_log: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("interactions.jsonl"),
            catalog_path: PathBuf::from("response.txt"),
            regions_path: PathBuf::from("countries_capitals.json"),
            lists_dir: PathBuf::from("lists"),
            trainer: TrainerConfig::default(),
            label_binding: LabelBinding::default(),
            fallback_response: GENERIC_FALLBACK.to_string(),
            seed: None,
            seed_profiles_from_log: true,
        }
    }
}

/// External effects a session needs.
pub struct Collaborators {
    pub actions: Arc<dyn ActionExecutor>,
    /// Speaks responses in `run` and fired alarms.
    pub sink: Arc<dyn ResponseSink>,
    /// `None` disables alarms.
    pub scheduler: Option<Scheduler>,
    /// Profiles restored by the host. `None` falls back to
    /// `SessionConfig::seed_profiles_from_log`.
    pub profiles: Option<ProfileStore>,
}

/// Why [`Session::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The user said a quit phrase.
    Quit,
    /// The command source is exhausted.
    EndOfInput,
}

pub struct Session {
    config: SessionConfig,
    matcher: IntentMatcher,
    profiles: ProfileStore,
    log: InteractionLog,
    catalog: ResponseCatalog,
    model: Option<TrainedModel>,
    regions: RegionMap,
    lists: ListStore,
    actions: Arc<dyn ActionExecutor>,
    sink: Arc<dyn ResponseSink>,
    scheduler: Option<Scheduler>,
    rng: StdRng,
    stats: SessionStats,
}

impl Session {
    /// Load every startup input and train the fallback model.
    ///
    /// # Errors
    /// I/O failures on the catalog, region map or list directory. A missing
    /// log, catalog or region map is not an error.
    pub fn open(mut config: SessionConfig, collaborators: Collaborators) -> Result<Self> {
        let log = InteractionLog::new(&config.log_path);
        let report = log.load_report()?;
        info!(
            path = %log.path().display(),
            records = report.records.len(),
            skipped = report.skipped,
            "interaction log loaded"
        );

        if config.trainer.seed.is_none() {
            config.trainer.seed = config.seed;
        }
        let model = classifier::train(&report.records, &config.trainer);

        let catalog = ResponseCatalog::load(&config.catalog_path)?;
        if let Some(model) = &model {
            let check = check_binding(model, &catalog, config.label_binding);
            if check.aligned < check.labels {
                warn!(
                    binding = ?config.label_binding,
                    labels = check.labels,
                    aligned = check.aligned,
                    unresolved = check.unresolved,
                    catalog = catalog.len(),
                    "model labels do not line up with the response catalog"
                );
            } else {
                debug!(labels = check.labels, "model labels aligned with catalog");
            }
        }

        let profiles = match collaborators.profiles {
            Some(profiles) => profiles,
            None if config.seed_profiles_from_log => ProfileStore::from_records(&report.records),
            None => ProfileStore::new(),
        };

        let regions = RegionMap::load(&config.regions_path)?;
        let lists = ListStore::open(&config.lists_dir)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            users = profiles.user_count(),
            profile_entries = profiles.entry_count(),
            catalog = catalog.len(),
            regions = regions.len(),
            model = model.is_some(),
            "session ready"
        );

        Ok(Self {
            config,
            matcher: IntentMatcher::new(),
            profiles,
            log,
            catalog,
            model,
            regions,
            lists,
            actions: collaborators.actions,
            sink: collaborators.sink,
            scheduler: collaborators.scheduler,
            rng,
            stats: SessionStats::default(),
        })
    }

    /// Resolve one command and record the outcome.
    pub fn handle(&mut self, user_id: &str, command: &str) -> Resolution {
        let command = command.trim();
        if command.is_empty() {
            debug!("empty command reached the session");
            let resolution = Resolution {
                command: String::new(),
                response: self.fallback_text(),
                source: ResolutionSource::Fallback,
            };
            self.stats.count(&resolution.source);
            return resolution;
        }

        let (response, source) = self.resolve(user_id, command);
        let response = if response.trim().is_empty() {
            self.fallback_text()
        } else {
            response
        };

        self.profiles.append(user_id, command, &response);
        if let Err(e) = self.log.append(&InteractionRecord::now(user_id, command, &response)) {
            self.stats.log_write_failures += 1;
            warn!(path = %self.log.path().display(), "interaction log append failed: {e}");
        }

        debug!(user = user_id, source = ?source, "command resolved");
        self.stats.count(&source);
        Resolution {
            command: command.to_string(),
            response,
            source,
        }
    }

    /// Listen → resolve → respond until the user quits or input ends.
    ///
    /// Failed captures are answered with a re-prompt and never reach the
    /// pipeline. `observe` sees every resolution after it has been spoken.
    ///
    /// # Errors
    /// Only capture errors that are not `NexaError::Input`.
    pub fn run<F>(&mut self, user_id: &str, source: &mut dyn CommandSource, mut observe: F) -> Result<LoopExit>
    where
        F: FnMut(&Resolution),
    {
        let sink = Arc::clone(&self.sink);
        sink.emit(GREETING);
        loop {
            let command = match source.capture() {
                Ok(Some(command)) => command,
                Ok(None) => return Ok(LoopExit::EndOfInput),
                Err(e @ NexaError::Input(_)) => {
                    debug!("capture failed: {e}");
                    sink.emit(capture_error_prompt(&e, &mut self.rng));
                    continue;
                }
                Err(e) => return Err(e),
            };
            if command.trim().is_empty() {
                sink.emit(input_failure_prompt(InputFailure::Unrecognized, &mut self.rng));
                continue;
            }
            if is_quit_phrase(&command) {
                sink.emit(FAREWELL);
                return Ok(LoopExit::Quit);
            }

            let resolution = self.handle(user_id, &command);
            sink.emit(&resolution.response);
            observe(&resolution);
        }
    }

    fn resolve(&mut self, user_id: &str, command: &str) -> (String, ResolutionSource) {
        if let Some(response) = self.profiles.record_lookup(user_id, command) {
            return (response.to_string(), ResolutionSource::Profile);
        }

        if let Some(intent) = self.matcher.match_command(command) {
            let response = self.run_intent(&intent);
            return (response, ResolutionSource::Intent { intent: intent.kind });
        }

        let selection = selector::select(
            command,
            &self.catalog,
            self.model.as_ref(),
            self.config.label_binding,
            &mut self.rng,
        );
        let response = match selection.pick {
            Pick::Fallback => self.fallback_text(),
            _ => selection.response,
        };
        (response, selection.pick.into())
    }

    fn fallback_text(&self) -> String {
        let text = self.config.fallback_response.trim();
        if text.is_empty() {
            GENERIC_FALLBACK.to_string()
        } else {
            text.to_string()
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.clone()
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn lists(&self) -> &ListStore {
        &self.lists
    }

    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    pub fn sink(&self) -> &Arc<dyn ResponseSink> {
        &self.sink
    }

    /// Cancel pending jobs and compact list logs.
    pub fn shutdown(mut self) -> SessionStats {
        let cancelled = self.scheduler.as_ref().map_or(0, Scheduler::shutdown);
        if let Err(e) = self.lists.compact_all() {
            warn!("list compaction on shutdown failed: {e}");
        }
        info!(
            commands = self.stats.commands,
            profile_hits = self.stats.profile_hits,
            intent_hits = self.stats.intent_hits,
            model_hits = self.stats.model_hits,
            random_picks = self.stats.random_picks,
            fallbacks = self.stats.fallbacks,
            upstream_failures = self.stats.upstream_failures,
            cancelled_jobs = cancelled,
            "session closed"
        );
        self.stats
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::StubActions;
    use crate::speech::MemorySink;

    fn open_in(dir: &std::path::Path, actions: StubActions) -> Session {
        let config = SessionConfig {
            log_path: dir.join("interactions.jsonl"),
            catalog_path: dir.join("response.txt"),
            regions_path: dir.join("countries.json"),
            lists_dir: dir.join("lists"),
            seed: Some(9),
            ..SessionConfig::default()
        };
        Session::open(
            config,
            Collaborators {
                actions: Arc::new(actions),
                sink: Arc::new(MemorySink::new()),
                scheduler: None,
                profiles: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn fresh_session_has_no_model_and_greeting_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_in(dir.path(), StubActions::new());
        assert!(session.model().is_none());
        assert_eq!(session.catalog().len(), 1);
    }

    #[test]
    fn second_identical_command_is_a_profile_hit() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_in(dir.path(), StubActions::new());
        let first = session.handle("alice", "play jazz");
        assert_eq!(first.response, "Playing jazz.");
        assert!(matches!(first.source, ResolutionSource::Intent { .. }));

        let second = session.handle("alice", "play jazz");
        assert_eq!(second.source, ResolutionSource::Profile);
        assert_eq!(second.response, "Playing jazz.");

        // Different user, no shortcut.
        let other = session.handle("bob", "play jazz");
        assert!(matches!(other.source, ResolutionSource::Intent { .. }));
        assert_eq!(session.profiles().entries("alice").len(), 2);
    }

    #[test]
    fn empty_command_gets_fallback_without_logging() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_in(dir.path(), StubActions::new());
        let r = session.handle("alice", "   ");
        assert_eq!(r.response, GENERIC_FALLBACK);
        assert!(!dir.path().join("interactions.jsonl").exists());
    }

    #[test]
    fn log_write_failure_does_not_change_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_in(dir.path(), StubActions::new());
        // A directory where the log file should be makes every append fail.
        std::fs::create_dir(dir.path().join("interactions.jsonl")).unwrap();
        let r = session.handle("alice", "search cats");
        assert_eq!(r.response, "Searching Google for cats.");
        assert_eq!(session.stats().log_write_failures, 1);
        assert_eq!(session.profiles().entries("alice").len(), 1);
    }

    #[test]
    fn shutdown_returns_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_in(dir.path(), StubActions::new());
        session.handle("alice", "tell me something");
        session.handle("alice", "open facebook");
        let stats = session.shutdown();
        assert_eq!(stats.commands, 2);
        assert_eq!(stats.random_picks, 1);
        assert_eq!(stats.intent_hits, 1);
    }
}
