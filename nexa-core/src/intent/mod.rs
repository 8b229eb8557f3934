//! Built-in intent recognition.
//!
//! Commands are matched against an ordered table of `(predicate, intent,
//! argument extractor)` rules. The first rule whose predicate accepts the
//! normalised command wins, so more specific phrases ("disk storage",
//! "recycle bin", "remind me to") are listed ahead of the generic ones
//! ("storage", "open").

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lists::{ListAction, ListKind};

/// A built-in category of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum IntentKind {
    Alarm,
    List { list: ListKind, action: ListAction },
    Weather,
    News,
    RecycleBin,
    DiskUsage,
    Joke,
    Play,
    Search,
    Open,
    Battery,
    Storage,
    Quote,
    Stock,
    Recipe,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alarm => f.write_str("alarm"),
            Self::List { list, action } => write!(f, "{list}:{action}"),
            Self::Weather => f.write_str("weather"),
            Self::News => f.write_str("news"),
            Self::RecycleBin => f.write_str("recycle-bin"),
            Self::DiskUsage => f.write_str("disk-usage"),
            Self::Joke => f.write_str("joke"),
            Self::Play => f.write_str("play"),
            Self::Search => f.write_str("search"),
            Self::Open => f.write_str("open"),
            Self::Battery => f.write_str("battery"),
            Self::Storage => f.write_str("storage"),
            Self::Quote => f.write_str("quote"),
            Self::Stock => f.write_str("stock"),
            Self::Recipe => f.write_str("recipe"),
        }
    }
}

/// A recognised intent plus its (possibly empty) argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMatch {
    pub kind: IntentKind,
    pub argument: String,
}

/// One row of the dispatch table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub kind: IntentKind,
    /// Receives the normalised command.
    pub predicate: fn(&str) -> bool,
    /// Receives the normalised command; result is trimmed by the matcher.
    pub extract: fn(&str) -> String,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Ordered rule table evaluated first-match-wins.
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    rules: Vec<Rule>,
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentMatcher {
    /// Matcher loaded with the built-in command set.
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// Matcher with an explicit rule table (evaluated in the given order).
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Append a rule with the lowest priority.
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Normalise `command` and return the first matching intent.
    pub fn match_command(&self, command: &str) -> Option<IntentMatch> {
        let normalized = normalize_command(command);
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(&normalized))
            .map(|rule| IntentMatch {
                kind: rule.kind,
                argument: trim_argument(&(rule.extract)(&normalized)),
            })
    }
}

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize_command(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_argument(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', '?', '!', ',', ';', ':'])
        .trim_start_matches([',', ':', ';'])
        .trim()
        .to_string()
}

/// Text after the last occurrence of `keyword`, or an empty string.
fn after_last(command: &str, keyword: &str) -> String {
    command
        .rfind(keyword)
        .map(|idx| command[idx + keyword.len()..].to_string())
        .unwrap_or_default()
}

/// Text after the first occurrence of whichever keyword appears earliest.
fn after_first_of(command: &str, keywords: &[&str]) -> String {
    keywords
        .iter()
        .filter_map(|k| command.find(k).map(|idx| (idx, k.len())))
        .min_by_key(|(idx, _)| *idx)
        .map(|(idx, len)| command[idx + len..].to_string())
        .unwrap_or_default()
}

/// Words after the last standalone preposition from `markers`, if any.
fn after_last_word(command: &str, markers: &[&str]) -> Option<String> {
    let words: Vec<&str> = command.split(' ').collect();
    words
        .iter()
        .rposition(|w| markers.contains(w))
        .map(|pos| words[pos + 1..].join(" "))
}

fn no_argument(_: &str) -> String {
    String::new()
}

fn contains_any(command: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| command.contains(p))
}

// ── Alarm ────────────────────────────────────────────────────────────────────

const ALARM_PHRASES: &[&str] = &["set an alarm", "set alarm", "alarm for", "alarm at", "wake me"];

fn is_alarm(c: &str) -> bool {
    contains_any(c, ALARM_PHRASES)
}

fn alarm_time(c: &str) -> String {
    after_last_word(c, &["for", "at"]).unwrap_or_else(|| after_first_of(c, ALARM_PHRASES))
}

// ── Lists ────────────────────────────────────────────────────────────────────

const LIST_VERBS: &[&str] = &["list", "show", "read", "what are", "what's on", "what is on"];
const REMOVE_VERBS: &[&str] = &["remove", "delete", "cancel", "cross off"];

fn mentions(c: &str, list: ListKind) -> bool {
    contains_any(c, list.keywords())
}

fn is_list_query(c: &str, list: ListKind) -> bool {
    mentions(c, list) && LIST_VERBS.iter().any(|v| c.starts_with(v))
}

fn is_list_remove(c: &str, list: ListKind) -> bool {
    mentions(c, list) && REMOVE_VERBS.iter().any(|v| c.starts_with(v))
}

/// "remove milk from my to-do list" / "remove note buy milk"
fn removed_item(c: &str, list: ListKind) -> String {
    let rest = after_first_of(c, REMOVE_VERBS);
    let rest = rest.trim();
    if let Some(idx) = rest.find(" from ") {
        return rest[..idx].to_string();
    }
    for keyword in list.keywords() {
        if let Some(stripped) = rest.strip_prefix(keyword) {
            return stripped.to_string();
        }
    }
    rest.to_string()
}

/// "add milk to my to-do list" / "add note buy milk" / "remind me to call mom"
fn added_item(c: &str, list: ListKind) -> String {
    for phrase in list.add_phrases() {
        if let Some(idx) = c.find(phrase) {
            let rest = c[idx + phrase.len()..].trim_start();
            return rest.strip_prefix("that ").unwrap_or(rest).to_string();
        }
    }
    let rest = c.strip_prefix("add ").unwrap_or(c);
    match rest.find(" to ") {
        Some(idx) => rest[..idx].to_string(),
        None => rest.to_string(),
    }
}

fn is_list_add(c: &str, list: ListKind) -> bool {
    contains_any(c, list.add_phrases()) || (c.starts_with("add ") && mentions(c, list))
}

macro_rules! list_rules {
    ($rules:ident, $list:expr, $query:ident, $remove:ident, $add:ident, $removed:ident, $added:ident) => {{
        fn $query(c: &str) -> bool {
            is_list_query(c, $list)
        }
        fn $remove(c: &str) -> bool {
            is_list_remove(c, $list)
        }
        fn $add(c: &str) -> bool {
            is_list_add(c, $list)
        }
        fn $removed(c: &str) -> String {
            removed_item(c, $list)
        }
        fn $added(c: &str) -> String {
            added_item(c, $list)
        }
        $rules.push(Rule {
            kind: IntentKind::List { list: $list, action: ListAction::Show },
            predicate: $query,
            extract: no_argument,
        });
        $rules.push(Rule {
            kind: IntentKind::List { list: $list, action: ListAction::Remove },
            predicate: $remove,
            extract: $removed,
        });
        $rules.push(Rule {
            kind: IntentKind::List { list: $list, action: ListAction::Add },
            predicate: $add,
            extract: $added,
        });
    }};
}

// ── Built-in table ───────────────────────────────────────────────────────────

fn builtin_rules() -> Vec<Rule> {
    let mut rules = vec![Rule {
        kind: IntentKind::Alarm,
        predicate: is_alarm,
        extract: alarm_time,
    }];

    list_rules!(rules, ListKind::Reminders, rem_q, rem_r, rem_a, rem_ri, rem_ai);
    list_rules!(rules, ListKind::Notes, note_q, note_r, note_a, note_ri, note_ai);
    list_rules!(rules, ListKind::Todo, todo_q, todo_r, todo_a, todo_ri, todo_ai);
    list_rules!(rules, ListKind::Calendar, cal_q, cal_r, cal_a, cal_ri, cal_ai);

    rules.extend([
        Rule {
            kind: IntentKind::Weather,
            predicate: |c| c.contains("weather"),
            extract: |c| {
                after_last_word(c, &["in", "for", "at"]).unwrap_or_else(|| after_last(c, "weather"))
            },
        },
        Rule {
            kind: IntentKind::News,
            predicate: |c| c.contains("news"),
            extract: no_argument,
        },
        Rule {
            kind: IntentKind::RecycleBin,
            predicate: |c| c.contains("recycle bin"),
            extract: no_argument,
        },
        Rule {
            kind: IntentKind::DiskUsage,
            predicate: |c| c.contains("disk storage") || c.contains("disk usage"),
            extract: no_argument,
        },
        Rule {
            kind: IntentKind::Joke,
            predicate: |c| c.contains("joke"),
            extract: no_argument,
        },
        Rule {
            kind: IntentKind::Quote,
            predicate: |c| c.contains("quote"),
            extract: no_argument,
        },
        Rule {
            kind: IntentKind::Stock,
            predicate: |c| c.contains("stock price") || c.contains("share price"),
            extract: |c| {
                after_last_word(c, &["of", "for"]).unwrap_or_else(|| after_last(c, "price"))
            },
        },
        Rule {
            kind: IntentKind::Recipe,
            predicate: |c| c.contains("recipe"),
            extract: |c| {
                after_last_word(c, &["with", "using", "for"]).unwrap_or_else(|| after_last(c, "recipe"))
            },
        },
        Rule {
            kind: IntentKind::Play,
            predicate: |c| c.contains("play"),
            extract: |c| after_last(c, "play"),
        },
        Rule {
            kind: IntentKind::Search,
            predicate: |c| c.contains("search"),
            extract: |c| after_last(c, "search"),
        },
        Rule {
            kind: IntentKind::Open,
            predicate: |c| c.contains("open"),
            extract: |c| after_last(c, "open"),
        },
        Rule {
            kind: IntentKind::Battery,
            predicate: |c| c.contains("battery"),
            extract: no_argument,
        },
        Rule {
            kind: IntentKind::Storage,
            predicate: |c| c.contains("storage"),
            extract: no_argument,
        },
    ]);
    rules
}
