use std::collections::HashMap;
use std::collections::hash_map;
use std::sync::Arc;

/// Immutable snapshot of token occurrence counts for one or more documents.
///
/// Cloning is cheap and every clone observes the same table, so snapshots can
/// cross task boundaries freely. Tokens are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WordFrequencyTable(Arc<HashMap<String, u64>>);

impl WordFrequencyTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.0.get(word).copied()
    }

    /// Occurrences of `word`, zero when absent.
    pub fn count(&self, word: &str) -> u64 {
        self.get(word).unwrap_or(0)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all occurrence counts.
    pub fn total_words(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.0.iter().map(|(word, count)| (word.as_str(), *count))
    }

    /// True when both snapshots share the same underlying allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Entries ordered by descending count, ties broken alphabetically.
    pub fn ranked(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .0
            .iter()
            .map(|(word, count)| (word.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub fn to_map(&self) -> HashMap<String, u64> {
        self.0.as_ref().clone()
    }
}

impl From<HashMap<String, u64>> for WordFrequencyTable {
    fn from(counts: HashMap<String, u64>) -> Self {
        Self(Arc::new(counts))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for WordFrequencyTable {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        let mut counts = HashMap::new();
        for (word, count) in iter {
            *counts.entry(word.into()).or_insert(0) += count;
        }
        Self::from(counts)
    }
}

/// Mutable accumulator owned by exactly one aggregator while it collects.
#[derive(Debug, Default)]
pub struct WordCounts {
    counts: HashMap<String, u64>,
}

impl WordCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tokens<I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = String>,
    {
        for token in tokens {
            match self.counts.entry(token) {
                hash_map::Entry::Occupied(mut entry) => *entry.get_mut() += 1,
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(1);
                }
            }
        }
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Consumes the accumulator; nothing can be added afterwards.
    pub fn freeze(self) -> WordFrequencyTable {
        WordFrequencyTable::from(self.counts)
    }
}

/// Sums counts key-wise across `tables`.
///
/// Addition is commutative and associative, so the result does not depend on
/// the order the tables arrive in.
pub fn merge_word_counts<'a, I>(tables: I) -> WordFrequencyTable
where
    I: IntoIterator<Item = &'a WordFrequencyTable>,
{
    let mut merged: HashMap<String, u64> = HashMap::new();
    for table in tables {
        for (word, count) in table.iter() {
            *merged.entry(word.to_owned()).or_insert(0) += count;
        }
    }
    WordFrequencyTable::from(merged)
}
