use crate::lemmatizer::{Lemmatizer, MorphyLemmatizer};
use crate::stopwords::StopWords;
use crate::tagger::{LexiconTagger, PosTag, Tagger};
use crate::tokenizer::tokenize;
use crate::{Corpus, TermVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Tags kept in [`FilterMode::PosAllowlist`]: nouns, adjectives, adverbs, verbs, foreign words.
pub const CONTENT_TAGS: &[PosTag] = &[
    PosTag::FW,
    PosTag::JJ,
    PosTag::JJR,
    PosTag::JJS,
    PosTag::NN,
    PosTag::NNS,
    PosTag::NNP,
    PosTag::NNPS,
    PosTag::RB,
    PosTag::RBR,
    PosTag::RBS,
    PosTag::VB,
    PosTag::VBD,
    PosTag::VBG,
    PosTag::VBN,
    PosTag::VBP,
    PosTag::VBZ,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Keep tokens whose tag is in [`CONTENT_TAGS`]; surface forms are counted.
    PosAllowlist,
    /// Drop stop words, then count lemmas. Tags are not consulted.
    #[default]
    #[serde(rename = "stopwords")]
    StopWords,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pos-allowlist" | "pos" => Ok(Self::PosAllowlist),
            "stopwords" => Ok(Self::StopWords),
            other => {
                Err(format!("unknown filter mode `{other}` (expected pos-allowlist or stopwords)"))
            }
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PosAllowlist => "pos-allowlist",
            Self::StopWords => "stopwords",
        })
    }
}

/// Turns text into a term-count vector.
///
/// Tagger, lemmatizer and stop words are injected and shared read-only, so one
/// vectorizer can serve every worker thread.
#[derive(Clone)]
pub struct Vectorizer {
    mode: FilterMode,
    tagger: Arc<dyn Tagger>,
    lemmatizer: Arc<dyn Lemmatizer>,
    stopwords: Arc<StopWords>,
}

impl Vectorizer {
    pub fn new(
        mode: FilterMode,
        tagger: Arc<dyn Tagger>,
        lemmatizer: Arc<dyn Lemmatizer>,
        stopwords: Arc<StopWords>,
    ) -> Self {
        Self { mode, tagger, lemmatizer, stopwords }
    }

    /// Vectorizer over the bundled tagger lexicon, noun exceptions and stop words.
    pub fn with_defaults(mode: FilterMode) -> Self {
        Self::new(
            mode,
            Arc::new(LexiconTagger::bundled()),
            Arc::new(MorphyLemmatizer::bundled()),
            Arc::new(StopWords::default()),
        )
    }

    /// Count qualifying terms in `text`. Empty text yields an empty vector.
    pub fn vectorize(&self, text: &str) -> TermVector {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return TermVector::new();
        }
        match self.mode {
            FilterMode::PosAllowlist => self
                .tagger
                .tag(&tokens)
                .into_iter()
                .filter(|(_, tag)| CONTENT_TAGS.contains(tag))
                .map(|(token, _)| token)
                .collect(),
            FilterMode::StopWords => tokens
                .iter()
                .filter(|t| !self.stopwords.contains(t))
                .map(|t| self.lemmatizer.lemmatize(t))
                .collect(),
        }
    }

    /// Vectorize and normalize every text of a collection in parallel.
    pub fn vectorize_corpus(&self, texts: &Corpus<String>) -> Corpus<TermVector> {
        let vectors = texts.par_map(|text| self.vectorize(text).normalized());
        let empty = vectors.iter().filter(|(_, v)| v.is_empty()).count();
        debug!(texts = texts.len(), empty, mode = %self.mode, "vectorized collection");
        vectors
    }
}
