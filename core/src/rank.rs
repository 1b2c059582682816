use crate::{Corpus, QueryId, RankedResult, Ranking, TermVector};
use rayon::prelude::*;

/// Cosine similarity of a query vector against a document vector.
///
/// The dot product walks only the query's terms; document-only terms cannot
/// contribute. Returns 0.0 when either vector has zero magnitude. Rounding
/// can push parallel vectors a hair past 1.0, so the result is capped there.
pub fn cosine(query: &TermVector, doc: &TermVector) -> f64 {
    let q_mag = query.magnitude();
    let d_mag = doc.magnitude();
    if q_mag == 0.0 || d_mag == 0.0 {
        return 0.0;
    }
    let dot: f64 = query.iter().map(|(term, w)| w * doc.get(term)).sum();
    (dot / (q_mag * d_mag)).min(1.0)
}

/// Score `query` against every document and sort descending.
///
/// The sort is stable, so equal scores keep the documents' enumeration order.
/// `top_k` truncates the sorted list; `None` keeps every document.
pub fn rank(
    query_id: QueryId,
    query: &TermVector,
    docs: &Corpus<TermVector>,
    top_k: Option<usize>,
) -> Ranking {
    let mut results: Vec<RankedResult> = docs
        .iter()
        .map(|(doc_id, doc)| RankedResult { query_id, doc_id, score: cosine(query, doc) })
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    if let Some(k) = top_k {
        results.truncate(k);
    }
    Ranking { query_id, results }
}

/// Rank every query in parallel. Output follows query enumeration order.
pub fn rank_all(
    queries: &Corpus<TermVector>,
    docs: &Corpus<TermVector>,
    top_k: Option<usize>,
) -> Vec<Ranking> {
    let queries: Vec<(QueryId, &TermVector)> = queries.iter().collect();
    queries
        .par_iter()
        .map(|(qid, qvec)| rank(*qid, qvec, docs, top_k))
        .collect()
}
