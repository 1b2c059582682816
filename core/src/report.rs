use crate::{RankedResult, Ranking, Result, VsmError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreFormat {
    /// Three decimal places, e.g. `0.412`.
    #[default]
    Fixed3,
    /// Shortest representation that round-trips the f64.
    Full,
}

impl FromStr for ScoreFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fixed3" => Ok(Self::Fixed3),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown score format `{other}` (expected fixed3 or full)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Replace any previous listing.
    #[default]
    Truncate,
    /// Add to the end of an existing listing.
    Append,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "truncate" => Ok(Self::Truncate),
            "append" => Ok(Self::Append),
            other => Err(format!("unknown write mode `{other}` (expected truncate or append)")),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Truncate => "truncate",
            Self::Append => "append",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOptions {
    pub score_format: ScoreFormat,
    /// Skip results whose score is exactly 0.
    pub suppress_zero: bool,
}

/// `"<queryId> <docId> <score>"`, no trailing newline.
pub fn format_line(result: &RankedResult, format: ScoreFormat) -> String {
    match format {
        ScoreFormat::Fixed3 => format!("{} {} {:.3}", result.query_id, result.doc_id, result.score),
        ScoreFormat::Full => format!("{} {} {}", result.query_id, result.doc_id, result.score),
    }
}

/// Write rankings grouped by query, in ranking order. Returns the number of lines written.
pub fn write_rankings<W: Write>(
    out: &mut W,
    rankings: &[Ranking],
    opts: ReportOptions,
) -> std::io::Result<usize> {
    let mut lines = 0;
    for ranking in rankings {
        for result in &ranking.results {
            if opts.suppress_zero && result.score == 0.0 {
                continue;
            }
            writeln!(out, "{}", format_line(result, opts.score_format))?;
            lines += 1;
        }
    }
    Ok(lines)
}

/// Write the listing to `path` through a single buffered writer.
pub fn write_report<P: AsRef<Path>>(
    path: P,
    rankings: &[Ranking],
    opts: ReportOptions,
    mode: WriteMode,
) -> Result<usize> {
    let path = path.as_ref();
    let mut open = OpenOptions::new();
    match mode {
        WriteMode::Truncate => open.write(true).create(true).truncate(true),
        WriteMode::Append => open.append(true).create(true),
    };
    let file = open.open(path).map_err(|e| VsmError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let lines = write_rankings(&mut writer, rankings, opts).map_err(|e| VsmError::io(path, e))?;
    writer.flush().map_err(|e| VsmError::io(path, e))?;
    info!(path = %path.display(), lines, %mode, "wrote ranking listing");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(query_id: u32, scores: &[(u32, f64)]) -> Ranking {
        Ranking {
            query_id,
            results: scores
                .iter()
                .map(|&(doc_id, score)| RankedResult { query_id, doc_id, score })
                .collect(),
        }
    }

    #[test]
    fn fixed_and_full_formats() {
        let r = RankedResult { query_id: 1, doc_id: 184, score: 0.41237 };
        assert_eq!(format_line(&r, ScoreFormat::Fixed3), "1 184 0.412");
        assert_eq!(format_line(&r, ScoreFormat::Full), "1 184 0.41237");
        let zero = RankedResult { query_id: 2, doc_id: 3, score: 0.0 };
        assert_eq!(format_line(&zero, ScoreFormat::Fixed3), "2 3 0.000");
    }

    #[test]
    fn lines_grouped_by_query_in_order() {
        let rankings = vec![ranking(2, &[(5, 0.9), (1, 0.5)]), ranking(1, &[(1, 0.7), (5, 0.0)])];
        let mut buf = Vec::new();
        let n = write_rankings(&mut buf, &rankings, ReportOptions::default()).unwrap();
        assert_eq!(n, 4);
        assert_eq!(String::from_utf8(buf).unwrap(), "2 5 0.900\n2 1 0.500\n1 1 0.700\n1 5 0.000\n");
    }

    #[test]
    fn zero_scores_can_be_suppressed() {
        let rankings = vec![ranking(1, &[(1, 0.7), (5, 0.0), (6, 0.0)])];
        let mut buf = Vec::new();
        let opts = ReportOptions { suppress_zero: true, ..Default::default() };
        let n = write_rankings(&mut buf, &rankings, opts).unwrap();
        assert_eq!(n, 1);
        assert_eq!(String::from_utf8(buf).unwrap(), "1 1 0.700\n");
    }

    #[test]
    fn truncate_replaces_and_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let rankings = vec![ranking(1, &[(1, 0.25)])];
        let opts = ReportOptions::default();

        write_report(&path, &rankings, opts, WriteMode::Truncate).unwrap();
        write_report(&path, &rankings, opts, WriteMode::Truncate).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 1 0.250\n");

        write_report(&path, &rankings, opts, WriteMode::Append).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 1 0.250\n1 1 0.250\n");
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.txt");
        let err =
            write_report(&path, &[], ReportOptions::default(), WriteMode::Truncate).unwrap_err();
        assert!(matches!(err, VsmError::Io { .. }));
    }
}
