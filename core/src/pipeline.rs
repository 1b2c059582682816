//! End-to-end ranking run: read, vectorize, rank, write.

use crate::config::{PipelineConfig, QueryIds};
use crate::lemmatizer::{Lemmatizer, LemmatizerKind, MorphyLemmatizer, SnowballLemmatizer};
use crate::perceptron::{find_installed_model, PerceptronTagger};
use crate::rank::rank_all;
use crate::reader::{read_documents, read_queries};
use crate::report::write_report;
use crate::stopwords::StopWords;
use crate::tagger::{LexiconTagger, Tagger, TaggerKind};
use crate::vectorizer::{FilterMode, Vectorizer};
use crate::{Corpus, Ranking, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct Pipeline {
    config: PipelineConfig,
    vectorizer: Vectorizer,
}

impl Pipeline {
    /// Validate the configuration and load every configured resource.
    ///
    /// A missing or malformed resource fails here, before any input is read.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let tagger = build_tagger(&config)?;
        let lemmatizer: Arc<dyn Lemmatizer> = match config.lemmatizer {
            LemmatizerKind::Morphy => {
                let mut m = MorphyLemmatizer::bundled();
                if let Some(path) = &config.lemma_exceptions {
                    m = m.with_exceptions_path(path)?;
                }
                if let Some(path) = &config.lemma_lexicon {
                    m = m.with_lexicon_path(path)?;
                }
                Arc::new(m)
            }
            LemmatizerKind::Snowball => Arc::new(SnowballLemmatizer::default()),
        };
        let stopwords = match &config.stopwords {
            Some(path) => StopWords::from_path(path)?,
            None => StopWords::default(),
        };

        let vectorizer =
            Vectorizer::new(config.filter_mode, tagger, lemmatizer, Arc::new(stopwords));
        Ok(Self { config, vectorizer })
    }

    pub fn vectorizer(&self) -> &Vectorizer { &self.vectorizer }

    /// Rank every document against every query, from raw texts.
    pub fn rank_texts(&self, docs: &Corpus<String>, queries: &Corpus<String>) -> Vec<Ranking> {
        let start = Instant::now();
        let doc_vecs = self.vectorizer.vectorize_corpus(docs);
        let query_vecs = self.vectorizer.vectorize_corpus(queries);
        info!(
            num_docs = doc_vecs.len(),
            num_queries = query_vecs.len(),
            took_s = start.elapsed().as_secs_f64(),
            "vectorized collections"
        );

        let start = Instant::now();
        let rankings = rank_all(&query_vecs, &doc_vecs, self.config.top_k);
        let num_results: usize = rankings.iter().map(|r| r.results.len()).sum();
        info!(num_results, took_s = start.elapsed().as_secs_f64(), "ranked queries");
        rankings
    }

    /// Read both collections, then rank. Both files are read before any processing.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        docs_path: P,
        queries_path: Q,
    ) -> Result<Vec<Ranking>> {
        let docs = read_documents(docs_path)?;
        let mut queries = read_queries(queries_path)?;
        if self.config.query_ids == QueryIds::Sequential {
            queries = queries.renumbered();
        }
        Ok(self.rank_texts(&docs, &queries))
    }

    /// Write rankings using the configured format, zero suppression and write mode.
    pub fn write<P: AsRef<Path>>(&self, rankings: &[Ranking], output: P) -> Result<usize> {
        write_report(output, rankings, self.config.report_options(), self.config.write_mode)
    }
}

/// Perceptron model from the config, else an installed NLTK model when tags
/// matter, else the lexicon tagger.
fn build_tagger(config: &PipelineConfig) -> Result<Arc<dyn Tagger>> {
    let lexicon = || -> Result<Arc<dyn Tagger>> {
        Ok(match &config.tagger_lexicon {
            Some(path) => Arc::new(LexiconTagger::from_path(path)?),
            None => Arc::new(LexiconTagger::bundled()),
        })
    };
    if config.tagger == TaggerKind::Lexicon {
        return lexicon();
    }
    let model = match &config.tagger_model {
        Some(dir) => Some(dir.clone()),
        None if config.filter_mode == FilterMode::PosAllowlist => find_installed_model(),
        None => None,
    };
    match model {
        Some(dir) => Ok(Arc::new(PerceptronTagger::load(dir)?)),
        None => {
            if config.filter_mode == FilterMode::PosAllowlist {
                warn!("no perceptron tagger model found; tagging with the lexicon tagger");
            }
            lexicon()
        }
    }
}
