use crate::{Result, VsmError};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Closed-class words and punctuation tokens. Matched case-sensitively.
const DEFAULT_STOPWORDS: &[&str] = &[
    // articles and determiners
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "either", "neither", "any",
    "some", "no", "all", "both", "such", "another",
    // auxiliaries and modals
    "be", "am", "is", "are", "was", "were", "been", "being", "have", "has", "had", "having", "do",
    "does", "did", "doing", "can", "could", "may", "might", "must", "shall", "should", "will",
    "would", "ought",
    // pronouns
    "i", "me", "my", "myself", "we", "us", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself", "it",
    "its", "itself", "they", "them", "their", "theirs", "themselves",
    // prepositions
    "of", "in", "on", "at", "by", "for", "from", "with", "within", "without", "into", "onto",
    "upon", "about", "above", "below", "under", "over", "between", "among", "through", "across",
    "along", "against", "during", "before", "after", "since", "until", "toward", "towards", "to",
    "up", "down", "out", "off", "per", "via", "than",
    // conjunctions
    "and", "or", "but", "nor", "so", "yet", "if", "because", "although", "though", "while",
    "whereas", "unless", "whether", "as",
    // wh-words
    "what", "which", "who", "whom", "whose", "when", "where", "why", "how",
    // other function words
    "there", "here", "then", "thus", "not", "also", "only", "very", "too", "just", "more", "most",
    "other", "own", "same", "few", "further", "again", "once",
    // clitics
    "'s", "n't", "'re", "'ve", "'ll", "'d", "'m",
    // punctuation tokens
    ".", ",", ":", ";", "?", "!", "(", ")", "[", "]", "{", "}", "``", "''", "'", "\"", "-", "--",
    "...", "/", "=", "+",
];

/// Immutable stop-word set handed to the vectorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWords {
    words: HashSet<String>,
}

impl Default for StopWords {
    fn default() -> Self {
        Self::from_words(DEFAULT_STOPWORDS.iter().copied())
    }
}

impl StopWords {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { words: words.into_iter().map(Into::into).collect() }
    }

    /// One word per line; blank lines and `#` comments are skipped.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| VsmError::resource(path, e.to_string()))?;
        let words = Self::from_words(
            src.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')),
        );
        info!(path = %path.display(), entries = words.len(), "loaded stop-word list");
        Ok(words)
    }

    pub fn contains(&self, token: &str) -> bool { self.words.contains(token) }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}
