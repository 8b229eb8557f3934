//! Terminal fallback: canned-response catalog + learned/random selection.

use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::TrainedModel;
use crate::error::Result;

/// Returned whenever nothing better is available. Never empty.
pub const GENERIC_FALLBACK: &str = "I'm not sure how to handle that command.";

/// Catalog used when the response file does not exist.
pub const DEFAULT_GREETING: &str = crate::speech::GREETING;

/// Ordered canned responses. Entries are non-empty and trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCatalog {
    entries: Vec<String>,
}

impl ResponseCatalog {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// One entry per line; blank lines skipped. A missing file yields the
    /// single default greeting.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let catalog = Self::new(text.lines());
                debug!(path = %path.display(), entries = catalog.len(), "response catalog loaded");
                Ok(catalog)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "response catalog missing — using default greeting");
                Ok(Self::new([DEFAULT_GREETING]))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn position(&self, text: &str) -> Option<usize> {
        self.entries.iter().position(|e| e == text)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a predicted label index is resolved against the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelBinding {
    /// `catalog[label]`, out of range → generic fallback.
    #[default]
    Positional,
    /// Catalog position of the label's own response text, absent → generic
    /// fallback.
    ByText,
}

/// Where a selected response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Model,
    Random,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub response: String,
    pub pick: Pick,
}

impl Selection {
    fn fallback() -> Self {
        Self {
            response: GENERIC_FALLBACK.to_string(),
            pick: Pick::Fallback,
        }
    }
}

/// Pick a response for a command no intent handled.
pub fn select<R: Rng + ?Sized>(
    command: &str,
    catalog: &ResponseCatalog,
    model: Option<&TrainedModel>,
    binding: LabelBinding,
    rng: &mut R,
) -> Selection {
    match model {
        Some(model) => {
            let label = model.predict(command);
            let index = match binding {
                LabelBinding::Positional => Some(label),
                LabelBinding::ByText => model.label_text(label).and_then(|t| catalog.position(t)),
            };
            match index.and_then(|i| catalog.get(i)) {
                Some(response) => Selection {
                    response: response.to_string(),
                    pick: Pick::Model,
                },
                None => {
                    debug!(label, catalog_len = catalog.len(), "predicted label outside catalog");
                    Selection::fallback()
                }
            }
        }
        None => match catalog.entries().choose(rng) {
            Some(response) => Selection {
                response: response.clone(),
                pick: Pick::Random,
            },
            None => Selection::fallback(),
        },
    }
}

/// How many model labels resolve to their own response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingReport {
    pub labels: usize,
    pub aligned: usize,
    pub unresolved: usize,
}

/// Check a model's label space against the catalog under `binding`.
pub fn check_binding(model: &TrainedModel, catalog: &ResponseCatalog, binding: LabelBinding) -> BindingReport {
    let classes = model.labels().classes();
    let mut aligned = 0;
    let mut unresolved = 0;
    for (label, text) in classes.iter().enumerate() {
        let resolved = match binding {
            LabelBinding::Positional => catalog.get(label),
            LabelBinding::ByText => catalog.position(text).and_then(|i| catalog.get(i)),
        };
        match resolved {
            Some(r) if r == text => aligned += 1,
            Some(_) => {}
            None => unresolved += 1,
        }
    }
    BindingReport {
        labels: classes.len(),
        aligned,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{train, ForestConfig, TrainerConfig};
    use crate::interactions::InteractionRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(3)
    }

    fn two_class_model() -> TrainedModel {
        let mut records = Vec::new();
        for _ in 0..10 {
            records.push(InteractionRecord::now("u", "tell me a story", "Once upon a time"));
            records.push(InteractionRecord::now("u", "how are you feeling", "I'm doing well"));
        }
        let config = TrainerConfig {
            forest: ForestConfig {
                n_trees: 15,
                max_depth: None,
            },
            seed: Some(5),
            ..TrainerConfig::default()
        };
        train(&records, &config).unwrap()
    }

    #[test]
    fn catalog_skips_blank_lines_and_trims() {
        let catalog = ResponseCatalog::new(["  hi  ", "", "   ", "there"]);
        assert_eq!(catalog.entries(), ["hi", "there"]);
    }

    #[test]
    fn missing_catalog_file_uses_greeting() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ResponseCatalog::load(&dir.path().join("response.txt")).unwrap();
        assert_eq!(catalog.entries(), [DEFAULT_GREETING]);
    }

    #[test]
    fn catalog_file_one_entry_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.txt");
        fs::write(&path, "Sure thing!\n\nHappy to help.\r\n").unwrap();
        let catalog = ResponseCatalog::load(&path).unwrap();
        assert_eq!(catalog.entries(), ["Sure thing!", "Happy to help."]);
    }

    #[test]
    fn random_selection_draws_from_catalog() {
        let catalog = ResponseCatalog::new(["a", "b", "c"]);
        let mut rng = rng();
        for _ in 0..50 {
            let s = select("anything", &catalog, None, LabelBinding::Positional, &mut rng);
            assert_eq!(s.pick, Pick::Random);
            assert!(catalog.entries().contains(&s.response));
        }
    }

    #[test]
    fn empty_catalog_without_model_falls_back() {
        let s = select("anything", &ResponseCatalog::default(), None, LabelBinding::Positional, &mut rng());
        assert_eq!(s.response, GENERIC_FALLBACK);
        assert_eq!(s.pick, Pick::Fallback);
    }

    #[test]
    fn out_of_range_label_falls_back() {
        let model = two_class_model();
        // Labels are 0 and 1; a one-entry catalog cannot hold label 1.
        let catalog = ResponseCatalog::new(["only one"]);
        let s = select("tell me a story", &catalog, Some(&model), LabelBinding::Positional, &mut rng());
        assert_eq!(model.predict("tell me a story"), 1);
        assert_eq!(s.response, GENERIC_FALLBACK);

        let s = select("tell me a story", &ResponseCatalog::default(), Some(&model), LabelBinding::Positional, &mut rng());
        assert_eq!(s.response, GENERIC_FALLBACK);
    }

    #[test]
    fn positional_binding_indexes_catalog() {
        let model = two_class_model();
        let catalog = ResponseCatalog::new(["I'm doing well", "Once upon a time"]);
        let s = select("how are you feeling", &catalog, Some(&model), LabelBinding::Positional, &mut rng());
        assert_eq!(s, Selection { response: "I'm doing well".into(), pick: Pick::Model });
    }

    #[test]
    fn by_text_binding_follows_reordered_catalog() {
        let model = two_class_model();
        let catalog = ResponseCatalog::new(["Once upon a time", "unrelated", "I'm doing well"]);
        let s = select("how are you feeling", &catalog, Some(&model), LabelBinding::ByText, &mut rng());
        assert_eq!(s.response, "I'm doing well");

        let positional = check_binding(&model, &catalog, LabelBinding::Positional);
        assert_eq!(positional, BindingReport { labels: 2, aligned: 0, unresolved: 0 });
        let by_text = check_binding(&model, &catalog, LabelBinding::ByText);
        assert_eq!(by_text, BindingReport { labels: 2, aligned: 2, unresolved: 0 });
    }

    #[test]
    fn by_text_binding_missing_text_falls_back() {
        let model = two_class_model();
        let catalog = ResponseCatalog::new(["Once upon a time"]);
        let s = select("how are you feeling", &catalog, Some(&model), LabelBinding::ByText, &mut rng());
        assert_eq!(s.response, GENERIC_FALLBACK);
        let report = check_binding(&model, &catalog, LabelBinding::ByText);
        assert_eq!(report.unresolved, 1);
    }
}
