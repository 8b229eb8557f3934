//! Built-in intent handlers: executor call → spoken response.

use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::error::{NexaError, Result};
use crate::intent::{IntentKind, IntentMatch};
use crate::lists::{ListAction, ListKind};
use crate::scheduler::{next_occurrence, parse_alarm_time};
use crate::session::Session;

pub(crate) const ALARM_RINGING: &str = "Alarm ringing!";
pub(crate) const BAD_TIME_FORMAT: &str = "Sorry, I didn't understand the time format.";
pub(crate) const ALARMS_UNAVAILABLE: &str = "Sorry, I can't set alarms right now.";
pub(crate) const WEATHER_FAILED: &str = "Sorry, I couldn't fetch the weather forecast.";
pub(crate) const FETCH_FAILED: &str = "Sorry, I couldn't fetch that.";
pub(crate) const PLATFORM_UNKNOWN: &str = "Platform not recognized.";

impl Session {
    pub(super) fn run_intent(&mut self, intent: &IntentMatch) -> String {
        let arg = intent.argument.as_str();
        match intent.kind {
            IntentKind::Alarm => self.set_alarm(arg),
            IntentKind::List { list, action } => self.run_list(list, action, arg),
            IntentKind::Weather => self.weather(arg),
            IntentKind::News => {
                let result = self.actions.news();
                self.report(intent.kind, result, "Sorry, I couldn't fetch the news.", |headlines| {
                    let mut response = String::from("Here are the latest news headlines.");
                    for headline in headlines {
                        response.push('\n');
                        response.push_str(&headline);
                    }
                    response
                })
            }
            IntentKind::RecycleBin => {
                let result = self.actions.empty_recycle_bin();
                self.report(intent.kind, result, "Sorry, I couldn't clear the recycle bin.", |s| s)
            }
            IntentKind::DiskUsage => {
                let result = self.actions.disk_usage();
                self.report(intent.kind, result, "Sorry, I couldn't check the disk usage.", |s| s)
            }
            IntentKind::Joke => {
                let result = self.actions.joke();
                self.report(intent.kind, result, "Sorry, I couldn't fetch a joke.", |s| s)
            }
            IntentKind::Play => {
                let result = self.actions.play(arg);
                self.report(intent.kind, result, "Sorry, I couldn't start playback.", |()| {
                    format!("Playing {arg}.")
                })
            }
            IntentKind::Search => {
                let result = self.actions.search(arg);
                self.report(intent.kind, result, "Sorry, I couldn't open the search.", |()| {
                    format!("Searching Google for {arg}.")
                })
            }
            IntentKind::Open => {
                let result = self.actions.open_platform(arg);
                let failed = format!("Sorry, I couldn't open {arg}.");
                self.report(intent.kind, result, &failed, |known| {
                    if known {
                        format!("Opening {arg}.")
                    } else {
                        format!("Opening {arg}. {PLATFORM_UNKNOWN}")
                    }
                })
            }
            IntentKind::Battery => {
                let result = self.actions.battery();
                self.report(intent.kind, result, "Sorry, I couldn't read the battery status.", |s| s)
            }
            IntentKind::Storage => {
                let result = self.actions.storage();
                self.report(intent.kind, result, "Sorry, I couldn't read the storage status.", |s| s)
            }
            IntentKind::Quote => {
                let result = self.actions.quote();
                self.report(intent.kind, result, FETCH_FAILED, |s| s)
            }
            IntentKind::Stock => {
                // Ticker symbols are case-sensitive upstream.
                let symbol = arg.trim().to_uppercase();
                let result = self.actions.stock(&symbol);
                self.report(intent.kind, result, FETCH_FAILED, |s| s)
            }
            IntentKind::Recipe => {
                let result = self.actions.recipes(arg).and_then(non_empty);
                self.report(intent.kind, result, FETCH_FAILED, |titles| {
                    format!("Here are some recipes with {arg}: {}.", titles.join(", "))
                })
            }
        }
    }

    /// Format a successful executor result, or count the failure and apologise.
    fn report<T>(
        &mut self,
        kind: IntentKind,
        result: Result<T>,
        failed: &str,
        format: impl FnOnce(T) -> String,
    ) -> String {
        match result {
            Ok(value) => format(value),
            Err(e) => {
                self.stats.upstream_failures += 1;
                warn!(intent = %kind, "action failed: {e}");
                failed.to_string()
            }
        }
    }

    fn weather(&mut self, country: &str) -> String {
        let Some(capital) = self.regions.capital(country).map(str::to_string) else {
            info!(country, "no capital known for country");
            return WEATHER_FAILED.to_string();
        };
        let result = self.actions.weather(&capital).and_then(non_empty);
        self.report(IntentKind::Weather, result, WEATHER_FAILED, |forecast| {
            format!("Weather forecast for {country}: {}", forecast.join(", "))
        })
    }

    fn set_alarm(&mut self, text: &str) -> String {
        let time = match parse_alarm_time(text) {
            Ok(time) => time,
            Err(e) => {
                info!("alarm rejected: {e}");
                return BAD_TIME_FORMAT.to_string();
            }
        };
        let Some(scheduler) = &self.scheduler else {
            warn!("alarm requested but no scheduler is running");
            return ALARMS_UNAVAILABLE.to_string();
        };

        let when = next_occurrence(time, &Local::now());
        let label = time.format("%H:%M").to_string();
        let sink = Arc::clone(&self.sink);
        scheduler.schedule_at(when, format!("alarm {label}"), move || sink.emit(ALARM_RINGING));
        format!("Alarm set for {label}.")
    }

    fn run_list(&mut self, list: ListKind, action: ListAction, item: &str) -> String {
        let kind = IntentKind::List { list, action };
        let outcome = match action {
            ListAction::Add if item.is_empty() => {
                return format!("What should I add to your {}?", list.plural_label());
            }
            ListAction::Remove if item.is_empty() => {
                return format!("What should I remove from your {}?", list.plural_label());
            }
            ListAction::Add => self
                .lists
                .add(list, item)
                .map(|()| format!("{} added: {item}", list.entry_label())),
            ListAction::Remove => self.lists.remove(list, item).map(|removed| {
                if removed > 0 {
                    format!("{} removed: {item}", list.entry_label())
                } else {
                    format!("I couldn't find {item} in your {}.", list.plural_label())
                }
            }),
            ListAction::Show => self.lists.entries(list).map(|entries| {
                if entries.is_empty() {
                    format!("You have no {}.", list.plural_label())
                } else {
                    format!("Here are your {}:\n{}", list.plural_label(), entries.join("\n"))
                }
            }),
        };
        outcome.unwrap_or_else(|e| {
            warn!(intent = %kind, "list update failed: {e}");
            format!("Sorry, I couldn't update your {}.", list.plural_label())
        })
    }
}

fn non_empty(values: Vec<String>) -> Result<Vec<String>> {
    if values.is_empty() {
        Err(NexaError::upstream("empty result"))
    } else {
        Ok(values)
    }
}
