//! Learned fallback: maps a free-text command to a response label.
//!
//! The model is rebuilt once per process from the full interaction log and is
//! never updated incrementally. With fewer than two distinct logged commands
//! there is nothing to learn and `train` returns `None`; callers fall back
//! to random canned responses for the run.

pub mod forest;
pub mod labels;
pub mod vectorizer;

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::interactions::InteractionRecord;

pub use forest::{ForestConfig, RandomForest};
pub use labels::LabelEncoder;
pub use vectorizer::TfidfVectorizer;

/// Training parameters.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub forest: ForestConfig,
    /// Share of records held out for the accuracy estimate. Default: 0.2.
    pub holdout_ratio: f32,
    /// RNG seed for split and bootstrap. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            holdout_ratio: 0.2,
            seed: None,
        }
    }
}

/// Fitted vectorizer + forest + label space.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    vectorizer: TfidfVectorizer,
    forest: RandomForest,
    labels: LabelEncoder,
    training_rows: usize,
    holdout_accuracy: Option<f32>,
}

impl TrainedModel {
    /// Predicted label index for `command`.
    pub fn predict(&self, command: &str) -> usize {
        self.forest.predict(&self.vectorizer.transform(command))
    }

    /// Response text the label was encoded from at training time.
    pub fn label_text(&self, label: usize) -> Option<&str> {
        self.labels.decode(label)
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Accuracy on the held-out partition, if one was taken.
    pub fn holdout_accuracy(&self) -> Option<f32> {
        self.holdout_accuracy
    }
}

/// Build a model from `records`, or `None` if there is too little data.
pub fn train(records: &[InteractionRecord], config: &TrainerConfig) -> Option<TrainedModel> {
    let distinct: HashSet<&str> = records.iter().map(|r| r.command.as_str()).collect();
    if distinct.len() < 2 {
        info!(
            records = records.len(),
            distinct_commands = distinct.len(),
            "not enough data to train the model — using random fallback"
        );
        return None;
    }

    let commands: Vec<&str> = records.iter().map(|r| r.command.as_str()).collect();
    let responses: Vec<&str> = records.iter().map(|r| r.response.as_str()).collect();

    let vectorizer = TfidfVectorizer::fit(&commands);
    if vectorizer.dimension() == 0 {
        warn!("interaction log has no usable tokens — using random fallback");
        return None;
    }
    let labels = LabelEncoder::fit(&responses);

    let x = vectorizer.transform_all(&commands);
    let y: Vec<usize> = responses
        .iter()
        .filter_map(|r| labels.encode(r))
        .collect();

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (train_idx, holdout_idx) = split_indices(records.len(), config.holdout_ratio, &mut rng);

    let train_x: Vec<Vec<f32>> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let train_y: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
    let forest = RandomForest::fit(&train_x, &train_y, labels.len(), &config.forest, &mut rng);

    let holdout_accuracy = (!holdout_idx.is_empty()).then(|| {
        let correct = holdout_idx
            .iter()
            .filter(|&&i| forest.predict(&x[i]) == y[i])
            .count();
        correct as f32 / holdout_idx.len() as f32
    });

    info!(
        records = records.len(),
        training_rows = train_idx.len(),
        holdout_rows = holdout_idx.len(),
        vocabulary = vectorizer.dimension(),
        labels = labels.len(),
        trees = forest.tree_count(),
        holdout_accuracy = holdout_accuracy.map(f64::from),
        "interaction model trained"
    );

    Some(TrainedModel {
        vectorizer,
        forest,
        labels,
        training_rows: train_idx.len(),
        holdout_accuracy,
    })
}

/// Shuffle `0..n` and cut off `ceil(n * ratio)` rows, keeping at least one
/// for training.
fn split_indices(n: usize, ratio: f32, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(rng);
    let ratio = ratio.clamp(0.0, 1.0) as f64;
    let holdout = ((n as f64 * ratio).ceil() as usize).min(n.saturating_sub(1));
    let train = idx.split_off(holdout);
    (train, idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(command: &str, response: &str) -> InteractionRecord {
        InteractionRecord::now("u", command, response)
    }

    fn seeded() -> TrainerConfig {
        TrainerConfig {
            forest: ForestConfig {
                n_trees: 25,
                max_depth: None,
            },
            seed: Some(11),
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn no_model_below_two_distinct_commands() {
        assert!(train(&[], &seeded()).is_none());
        assert!(train(&[record("hi", "hello")], &seeded()).is_none());
        let repeats = vec![record("hi there", "a"), record("hi there", "b"), record("hi there", "a")];
        assert!(train(&repeats, &seeded()).is_none());
    }

    #[test]
    fn two_distinct_commands_are_enough() {
        let records = vec![record("play jazz", "Playing jazz."), record("search cats", "Searching Google for cats.")];
        let model = train(&records, &seeded()).expect("model");
        assert_eq!(model.training_rows(), 1);
        assert!(model.predict("play jazz") < model.labels().len());
    }

    #[test]
    fn tokenless_corpus_yields_no_model() {
        let records = vec![record("a", "x"), record("b", "y")];
        assert!(train(&records, &seeded()).is_none());
    }

    #[test]
    fn learns_repeated_commands() {
        let mut records = Vec::new();
        for _ in 0..10 {
            records.push(record("tell me a story", "Once upon a time"));
            records.push(record("how are you feeling", "I'm doing well"));
        }
        let model = train(&records, &seeded()).expect("model");
        assert_eq!(model.label_text(model.predict("how are you feeling")), Some("I'm doing well"));
        assert_eq!(model.label_text(model.predict("tell me a story")), Some("Once upon a time"));
        assert_eq!(model.holdout_accuracy(), Some(1.0));
    }

    #[test]
    fn split_keeps_one_training_row() {
        let mut rng = StdRng::seed_from_u64(1);
        let (train, holdout) = split_indices(2, 0.2, &mut rng);
        assert_eq!((train.len(), holdout.len()), (1, 1));

        let (train, holdout) = split_indices(10, 0.2, &mut rng);
        assert_eq!((train.len(), holdout.len()), (8, 2));

        let (train, holdout) = split_indices(3, 1.0, &mut rng);
        assert_eq!((train.len(), holdout.len()), (1, 2));
    }
}
