use crate::lemmatizer::LemmatizerKind;
use crate::report::{ReportOptions, ScoreFormat, WriteMode};
use crate::tagger::TaggerKind;
use crate::vectorizer::FilterMode;
use crate::{Result, VsmError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryIds {
    /// Use the IDs from the `.I` lines.
    #[default]
    AsWritten,
    /// Number queries 1..N in file order.
    Sequential,
}

impl FromStr for QueryIds {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "as-written" => Ok(Self::AsWritten),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!(
                "unknown query id scheme `{other}` (expected as-written or sequential)"
            )),
        }
    }
}

/// Everything a ranking run needs besides the input and output paths.
///
/// Every field has a default, so a JSON config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub filter_mode: FilterMode,
    /// Keep only the best `top_k` documents per query.
    pub top_k: Option<usize>,
    pub suppress_zero: bool,
    pub score_format: ScoreFormat,
    pub write_mode: WriteMode,
    pub lemmatizer: LemmatizerKind,
    pub query_ids: QueryIds,
    pub tagger: TaggerKind,
    /// Directory holding a perceptron model. Without one, an installed NLTK
    /// model is looked up, then the lexicon tagger is used.
    pub tagger_model: Option<PathBuf>,
    /// Extra `word TAG..` lines layered over the bundled tagger lexicon.
    pub tagger_lexicon: Option<PathBuf>,
    /// Known noun base forms (WordNet `index.noun` or a plain word list).
    pub lemma_lexicon: Option<PathBuf>,
    /// Extra `inflected base` lines layered over the bundled exception table.
    pub lemma_exceptions: Option<PathBuf>,
    /// Replaces the built-in stop-word list.
    pub stopwords: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| VsmError::io(path, e))?;
        let config: PipelineConfig = serde_json::from_str(&src)
            .map_err(|e| VsmError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == Some(0) {
            return Err(VsmError::Config(
                "top_k must be at least 1 (omit it to keep every document)".into(),
            ));
        }
        let morphy_files = self.lemma_lexicon.is_some() || self.lemma_exceptions.is_some();
        if self.lemmatizer == LemmatizerKind::Snowball && morphy_files {
            return Err(VsmError::Config(
                "lemma_lexicon and lemma_exceptions only apply to the morphy lemmatizer".into(),
            ));
        }
        if self.tagger == TaggerKind::Lexicon && self.tagger_model.is_some() {
            let reason = "tagger_model only applies to the perceptron tagger";
            return Err(VsmError::Config(reason.into()));
        }
        Ok(())
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions { score_format: self.score_format, suppress_zero: self.suppress_zero }
    }
}
