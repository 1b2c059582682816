//! Ranking-quality metrics against relevance judgments.
//!
//! - MAP (mean average precision)
//! - P@k and R@k
//! - MRR (mean reciprocal rank)
//!
//! Only queries with at least one relevant judgment are scored. A judged
//! query missing from the run scores zero on every metric.

use crate::{DocId, QueryId, RankedResult, Ranking, Result, VsmError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Relevance judgments keyed by query.
///
/// Lines are `qid docid grade` (Cranfield) or `qid iter docid grade` (TREC).
/// A grade above zero counts as relevant; `-1` and `0` do not.
#[derive(Debug, Clone, Default)]
pub struct Qrels {
    judgments: HashMap<QueryId, HashMap<DocId, i32>>,
}

impl Qrels {
    pub fn parse(src: &str) -> Result<Self> {
        let mut judgments: HashMap<QueryId, HashMap<DocId, i32>> = HashMap::new();
        for (idx, line) in src.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (qid, doc, grade) = match fields.as_slice() {
                [q, d, g] => (*q, *d, *g),
                [q, _, d, g] => (*q, *d, *g),
                _ => {
                    let reason = format!("expected 3 or 4 fields, got {}", fields.len());
                    return Err(VsmError::Qrels { line: idx + 1, reason });
                }
            };
            let parse_err = |what: &str, v: &str| VsmError::Qrels {
                line: idx + 1,
                reason: format!("bad {what} `{v}`"),
            };
            let qid: QueryId = qid.parse().map_err(|_| parse_err("query id", qid))?;
            let doc: DocId = doc.parse().map_err(|_| parse_err("document id", doc))?;
            let grade: i32 = grade.parse().map_err(|_| parse_err("grade", grade))?;
            judgments.entry(qid).or_default().insert(doc, grade);
        }
        debug!(queries = judgments.len(), "parsed relevance judgments");
        Ok(Self { judgments })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| VsmError::io(path, e))?;
        Self::parse(&src)
    }

    pub fn relevant(&self, query_id: QueryId) -> HashSet<DocId> {
        self.judgments
            .get(&query_id)
            .map(|docs| docs.iter().filter(|(_, g)| **g > 0).map(|(d, _)| *d).collect())
            .unwrap_or_default()
    }

    /// Judged queries with at least one relevant document, ascending.
    pub fn judged_queries(&self) -> Vec<QueryId> {
        let mut ids: Vec<QueryId> = self
            .judgments
            .iter()
            .filter(|(_, docs)| docs.values().any(|g| *g > 0))
            .map(|(q, _)| *q)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Parse a ranking listing back into rankings, grouped by first-seen query.
///
/// Line order within a query is taken as the ranking order.
pub fn parse_run(src: &str) -> Result<Vec<Ranking>> {
    let mut rankings: Vec<Ranking> = Vec::new();
    let mut index: HashMap<QueryId, usize> = HashMap::new();
    for (idx, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bad = |reason: String| VsmError::Run { line: idx + 1, reason };
        let mut parts = line.split_whitespace();
        let fields = (parts.next(), parts.next(), parts.next(), parts.next());
        let (Some(q), Some(d), Some(s), None) = fields else {
            return Err(bad(format!("expected `<queryId> <docId> <score>`, got `{line}`")));
        };
        let query_id: QueryId = q.parse().map_err(|_| bad(format!("bad query id `{q}`")))?;
        let doc_id: DocId = d.parse().map_err(|_| bad(format!("bad document id `{d}`")))?;
        let score: f64 = s.parse().map_err(|_| bad(format!("bad score `{s}`")))?;
        let slot = *index.entry(query_id).or_insert_with(|| {
            rankings.push(Ranking { query_id, results: Vec::new() });
            rankings.len() - 1
        });
        rankings[slot].results.push(RankedResult { query_id, doc_id, score });
    }
    Ok(rankings)
}

pub fn read_run<P: AsRef<Path>>(path: P) -> Result<Vec<Ranking>> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| VsmError::io(path, e))?;
    parse_run(&src)
}

pub fn precision_at_k(ranked: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|d| relevant.contains(*d)).count();
    hits as f64 / k as f64
}

pub fn recall_at_k(ranked: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|d| relevant.contains(*d)).count();
    hits as f64 / relevant.len() as f64
}

/// Mean of precision at each relevant hit, over all relevant documents.
pub fn average_precision(ranked: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, doc) in ranked.iter().enumerate() {
        if relevant.contains(doc) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

pub fn reciprocal_rank(ranked: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    ranked
        .iter()
        .position(|d| relevant.contains(d))
        .map_or(0.0, |i| 1.0 / (i + 1) as f64)
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryEval {
    pub query_id: QueryId,
    pub num_relevant: usize,
    pub num_retrieved: usize,
    pub average_precision: f64,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub reciprocal_rank: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalSummary {
    pub k: usize,
    pub queries_evaluated: usize,
    pub map: f64,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub mrr: f64,
    pub per_query: Vec<QueryEval>,
}

pub fn evaluate(rankings: &[Ranking], qrels: &Qrels, k: usize) -> EvalSummary {
    let by_query: HashMap<QueryId, &Ranking> = rankings.iter().map(|r| (r.query_id, r)).collect();
    let per_query: Vec<QueryEval> = qrels
        .judged_queries()
        .into_iter()
        .map(|qid| {
            let relevant = qrels.relevant(qid);
            let ranked: Vec<DocId> = by_query
                .get(&qid)
                .map(|r| r.results.iter().map(|x| x.doc_id).collect())
                .unwrap_or_default();
            QueryEval {
                query_id: qid,
                num_relevant: relevant.len(),
                num_retrieved: ranked.len(),
                average_precision: average_precision(&ranked, &relevant),
                precision_at_k: precision_at_k(&ranked, &relevant, k),
                recall_at_k: recall_at_k(&ranked, &relevant, k),
                reciprocal_rank: reciprocal_rank(&ranked, &relevant),
            }
        })
        .collect();

    let n = per_query.len();
    let mean = |f: fn(&QueryEval) -> f64| {
        if n == 0 {
            0.0
        } else {
            per_query.iter().map(f).sum::<f64>() / n as f64
        }
    };
    let map = mean(|q| q.average_precision);
    let precision = mean(|q| q.precision_at_k);
    let recall = mean(|q| q.recall_at_k);
    let mrr = mean(|q| q.reciprocal_rank);
    let summary = EvalSummary {
        k,
        queries_evaluated: n,
        map,
        precision_at_k: precision,
        recall_at_k: recall,
        mrr,
        per_query,
    };
    info!(queries = n, map = summary.map, k, p_at_k = summary.precision_at_k, "evaluated run");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[DocId]) -> HashSet<DocId> { ids.iter().copied().collect() }

    #[test]
    fn average_precision_by_hand() {
        // hits at ranks 1 and 3 of 2 relevant: (1/1 + 2/3) / 2
        let ap = average_precision(&[10, 20, 30, 40], &set(&[10, 30]));
        assert!((ap - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        // a relevant doc never retrieved still counts in the denominator
        let ap = average_precision(&[10], &set(&[10, 99]));
        assert!((ap - 0.5).abs() < 1e-12);
        assert_eq!(average_precision(&[1, 2], &set(&[])), 0.0);
    }

    #[test]
    fn precision_recall_and_rr() {
        let ranked = [5, 6, 7, 8];
        let rel = set(&[6, 8, 100]);
        assert!((precision_at_k(&ranked, &rel, 2) - 0.5).abs() < 1e-12);
        assert!((precision_at_k(&ranked, &rel, 10) - 0.2).abs() < 1e-12);
        assert!((recall_at_k(&ranked, &rel, 4) - 2.0 / 3.0).abs() < 1e-12);
        assert!((reciprocal_rank(&ranked, &rel) - 0.5).abs() < 1e-12);
        assert_eq!(reciprocal_rank(&ranked, &set(&[1])), 0.0);
    }

    #[test]
    fn parses_cranfield_and_trec_qrels() {
        let q = Qrels::parse("1 184 2\n1 29 -1\n2 12 3\n\n3 0 51 1\n").unwrap();
        assert_eq!(q.relevant(1), set(&[184]));
        assert_eq!(q.relevant(3), set(&[51]));
        assert_eq!(q.judged_queries(), vec![1, 2, 3]);
        assert!(q.relevant(9).is_empty());
    }

    #[test]
    fn bad_qrels_line_is_reported() {
        let err = Qrels::parse("1 184 2\n1 x 2\n").unwrap_err();
        assert!(matches!(err, VsmError::Qrels { line: 2, .. }));
        assert!(matches!(Qrels::parse("1\n"), Err(VsmError::Qrels { line: 1, .. })));
    }

    #[test]
    fn run_listing_round_trip_keeps_order() {
        let runs = parse_run("2 5 0.900\n2 1 0.500\n1 1 0.700\n").unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].query_id, 2);
        assert_eq!(runs[0].results.iter().map(|r| r.doc_id).collect::<Vec<_>>(), vec![5, 1]);
        assert!(matches!(parse_run("1 2\n"), Err(VsmError::Run { line: 1, .. })));
    }

    #[test]
    fn evaluate_counts_missing_queries_as_zero() {
        let qrels = Qrels::parse("1 10 1\n2 20 1\n3 30 -1\n").unwrap();
        let runs = parse_run("1 10 0.9\n1 11 0.1\n").unwrap();
        let s = evaluate(&runs, &qrels, 1);
        assert_eq!(s.queries_evaluated, 2);
        assert!((s.map - 0.5).abs() < 1e-12);
        assert!((s.precision_at_k - 0.5).abs() < 1e-12);
        assert!((s.mrr - 0.5).abs() < 1e-12);
        assert_eq!(s.per_query[1].num_retrieved, 0);
    }
}
