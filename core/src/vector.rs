use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse term -> weight mapping.
///
/// Before normalization weights are occurrence counts (every present term has
/// weight >= 1). After [`TermVector::normalized`] they are term frequencies that
/// sum to 1.0. Terms iterate in lexicographic order so sums are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermVector {
    weights: BTreeMap<String, f64>,
}

impl TermVector {
    pub fn new() -> Self { Self::default() }

    /// Build from explicit weights. Non-positive and non-finite weights are dropped.
    pub fn from_weights<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let weights = weights
            .into_iter()
            .filter(|(_, w)| w.is_finite() && *w > 0.0)
            .map(|(t, w)| (t.into(), w))
            .collect();
        Self { weights }
    }

    /// Count one more occurrence of `term`.
    pub fn add(&mut self, term: impl Into<String>) {
        *self.weights.entry(term.into()).or_insert(0.0) += 1.0;
    }

    pub fn get(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, term: &str) -> bool { self.weights.contains_key(term) }

    pub fn len(&self) -> usize { self.weights.len() }

    pub fn is_empty(&self) -> bool { self.weights.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn total(&self) -> f64 { self.weights.values().sum() }

    /// Euclidean norm of the weights.
    pub fn magnitude(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum::<f64>().sqrt()
    }

    /// Term-frequency form: every weight divided by the total.
    ///
    /// An empty vector (total 0) comes back empty instead of dividing by zero.
    pub fn normalized(&self) -> TermVector {
        let total = self.total();
        if total == 0.0 {
            return TermVector::new();
        }
        let weights = self.weights.iter().map(|(t, w)| (t.clone(), w / total)).collect();
        TermVector { weights }
    }
}

/// Normalizer stage: consumes a count vector and returns its term frequencies.
pub fn normalize(vector: TermVector) -> TermVector {
    if vector.is_empty() {
        return vector;
    }
    vector.normalized()
}

impl<S: Into<String>> FromIterator<S> for TermVector {
    /// Count every term yielded by the iterator.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut v = TermVector::new();
        for term in iter {
            v.add(term);
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeated_terms() {
        let v: TermVector = ["jet", "engine", "jet"].into_iter().collect();
        assert_eq!(v.get("jet"), 2.0);
        assert_eq!(v.get("engine"), 1.0);
        assert_eq!(v.get("wing"), 0.0);
        assert_eq!(v.total(), 3.0);
    }

    #[test]
    fn keys_are_case_preserved() {
        let v: TermVector = ["Mach", "mach"].into_iter().collect();
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn normalized_weights_sum_to_one() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["a"],
            vec!["a", "b", "b", "c", "c", "c"],
            vec!["flow", "flow", "flow", "shock", "wave", "boundary", "layer", "layer", "x"],
        ];
        for terms in inputs {
            let v: TermVector = terms.into_iter().collect();
            let sum = normalize(v).total();
            assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
        }
    }

    #[test]
    fn normalizing_empty_vector_is_empty() {
        let v = normalize(TermVector::new());
        assert!(v.is_empty());
        assert_eq!(v.total(), 0.0);
    }

    #[test]
    fn from_weights_drops_zero_entries() {
        let v = TermVector::from_weights(vec![("a", 0.0), ("b", 0.5), ("c", f64::NAN)]);
        assert_eq!(v.len(), 1);
        assert!(v.contains("b"));
    }

    #[test]
    fn magnitude_is_euclidean() {
        let v = TermVector::from_weights(vec![("a", 3.0), ("b", 4.0)]);
        assert!((v.magnitude() - 5.0).abs() < 1e-12);
    }
}
