//! Stable response ⇄ label index bijection.

use std::collections::BTreeSet;

/// Distinct responses sorted lexicographically; a label is a position.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let classes: BTreeSet<&str> = values.iter().map(AsRef::as_ref).collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn encode(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    pub fn decode(&self, label: usize) -> Option<&str> {
        self.classes.get(label).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip_is_sorted() {
        let enc = LabelEncoder::fit(&["b", "a", "c", "a"]);
        assert_eq!(enc.len(), 3);
        assert_eq!(enc.encode("a"), Some(0));
        assert_eq!(enc.encode("c"), Some(2));
        assert_eq!(enc.encode("zzz"), None);
        assert_eq!(enc.decode(1), Some("b"));
        assert_eq!(enc.decode(3), None);
    }
}
