//! Report ordering by product generation.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::record::Record;

/// Release order of the models the report knows about.
pub const DEFAULT_SEQUENCE: &[&str] = &[
    "1st gen",
    "3G",
    "3GS",
    "4",
    "4S",
    "5",
    "5S",
    "5C",
    "SE",
    "6",
    "6 Plus",
    "6S",
    "6S Plus",
    "7",
    "7 Plus",
    "8",
    "8 Plus",
    "X",
    "XS",
    "XS Max",
    "XR",
    "11",
    "11 Pro",
    "11 Pro Max",
];

/// A hand-authored sequence of model names defining output order.
///
/// Can be loaded from a JSON array on disk:
/// ```json
/// ["1st gen", "3G", "3GS", "4"]
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceOrder {
    ranks: HashMap<String, usize>,
}

impl Default for ReferenceOrder {
    fn default() -> Self {
        Self::from_names(DEFAULT_SEQUENCE.iter().copied())
    }
}

impl ReferenceOrder {
    /// Builds an order from names; the first occurrence of a duplicate wins.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for (rank, name) in names.into_iter().enumerate() {
            ranks.entry(name.into()).or_insert(rank);
        }
        Self { ranks }
    }

    /// Loads the order from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read order file '{path}'"))?;
        let names: Vec<String> = serde_json::from_str(&content)
            .with_context(|| format!("order file '{path}' is not a JSON array of names"))?;
        Ok(Self::from_names(names))
    }

    /// Position of `model` in the sequence, if it is known.
    pub fn rank(&self, model: &str) -> Option<usize> {
        self.ranks.get(model).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Total order: known models by rank, then unknown models by name.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    pub fn sort(&self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare(&a.model, &b.model));
    }
}
