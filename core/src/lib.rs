pub mod config;
pub mod error;
pub mod eval;
pub mod lemmatizer;
pub mod perceptron;
pub mod pipeline;
pub mod rank;
pub mod reader;
pub mod report;
pub mod stopwords;
pub mod tagger;
pub mod tokenizer;
pub mod vector;
pub mod vectorizer;

pub use error::{Result, VsmError};
pub use vector::TermVector;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;
pub type QueryId = u32;

/// One parsed record of a document or query collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawText {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub query_id: QueryId,
    pub doc_id: DocId,
    pub score: f64,
}

/// Results for one query, score descending, ties in document enumeration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ranking {
    pub query_id: QueryId,
    pub results: Vec<RankedResult>,
}

/// Ordered mapping from record ID to a value, kept in first-seen order.
///
/// Re-inserting an ID replaces the value but keeps the original position, so
/// enumeration order always matches the order records first appeared in the
/// source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus<T> {
    entries: Vec<(u32, T)>,
    positions: HashMap<u32, usize>,
}

impl<T> Default for Corpus<T> {
    fn default() -> Self {
        Self { entries: Vec::new(), positions: HashMap::new() }
    }
}

impl<T> Corpus<T> {
    pub fn new() -> Self { Self::default() }

    /// Insert or replace. Returns the previous value when `id` was already present.
    pub fn insert(&mut self, id: u32, value: T) -> Option<T> {
        match self.positions.get(&id) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.positions.insert(id, self.entries.len());
                self.entries.push((id, value));
                None
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.positions.get(&id).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    /// Renumber entries 1..=N in enumeration order.
    pub fn renumbered(self) -> Self {
        self.entries
            .into_iter()
            .enumerate()
            .map(|(i, (_, v))| (i as u32 + 1, v))
            .collect()
    }
}

impl<T: Sync> Corpus<T> {
    /// Apply `f` to every value in parallel, preserving IDs and order.
    pub fn par_map<U, F>(&self, f: F) -> Corpus<U>
    where
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        let mapped: Vec<(u32, U)> = self.entries.par_iter().map(|(id, v)| (*id, f(v))).collect();
        Corpus { entries: mapped, positions: self.positions.clone() }
    }
}

impl<T> FromIterator<(u32, T)> for Corpus<T> {
    fn from_iter<I: IntoIterator<Item = (u32, T)>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for (id, v) in iter {
            corpus.insert(id, v);
        }
        corpus
    }
}

impl<T> IntoIterator for Corpus<T> {
    type Item = (u32, T);
    type IntoIter = std::vec::IntoIter<(u32, T)>;

    fn into_iter(self) -> Self::IntoIter { self.entries.into_iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinsert_keeps_first_position() {
        let mut c = Corpus::new();
        c.insert(5, "a");
        c.insert(2, "b");
        assert_eq!(c.insert(5, "c"), Some("a"));
        let order: Vec<_> = c.iter().map(|(id, v)| (id, *v)).collect();
        assert_eq!(order, vec![(5, "c"), (2, "b")]);
    }

    #[test]
    fn renumber_follows_enumeration_order() {
        let c: Corpus<&str> = vec![(10, "x"), (3, "y"), (7, "z")].into_iter().collect();
        let r = c.renumbered();
        assert_eq!(r.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(r.get(2), Some(&"y"));
    }

    #[test]
    fn par_map_preserves_ids_and_order() {
        let c: Corpus<String> =
            vec![(4, "aa".to_string()), (1, "b".to_string())].into_iter().collect();
        let lens = c.par_map(|s| s.len());
        assert_eq!(lens.iter().map(|(id, n)| (id, *n)).collect::<Vec<_>>(), vec![(4, 2), (1, 1)]);
        assert_eq!(lens.get(1), Some(&1));
    }
}
