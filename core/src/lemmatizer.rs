//! Reduction of inflected tokens to a base form.

use crate::{Result, VsmError};
use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Maps a token to its dictionary base form. Shared read-only across threads.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, token: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LemmatizerKind {
    /// Noun morphology: exception table, then suffix rules.
    #[default]
    Morphy,
    /// Snowball English stemmer.
    Snowball,
}

impl FromStr for LemmatizerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "morphy" => Ok(Self::Morphy),
            "snowball" => Ok(Self::Snowball),
            other => Err(format!("unknown lemmatizer `{other}` (expected morphy or snowball)")),
        }
    }
}

impl fmt::Display for LemmatizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Morphy => "morphy",
            Self::Snowball => "snowball",
        })
    }
}

/// Noun detachment rules: inflected suffix -> replacement.
const NOUN_RULES: &[(&str, &str)] = &[
    ("s", ""),
    ("ses", "s"),
    ("ves", "f"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

lazy_static! {
    static ref BUNDLED_EXCEPTIONS: HashMap<String, String> =
        parse_exceptions(include_str!("../resources/noun_exceptions.txt"))
            .expect("bundled exceptions are well formed");
}

fn parse_exceptions(src: &str) -> std::result::Result<HashMap<String, String>, (usize, String)> {
    let mut map = HashMap::new();
    for (idx, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(inflected), Some(base)) => {
                map.insert(inflected.to_string(), base.to_string());
            }
            _ => return Err((idx + 1, format!("expected `inflected base`, got `{line}`"))),
        }
    }
    Ok(map)
}

/// Known base forms, one per line in the first column.
///
/// Indented lines are skipped, so a WordNet `index.noun` file loads as-is.
fn parse_lexicon(src: &str) -> HashSet<String> {
    src.lines()
        .filter(|l| !l.starts_with(char::is_whitespace) && !l.starts_with('#'))
        .filter_map(|l| l.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// WordNet-style noun lemmatizer.
///
/// Irregular forms come from an exception table. Otherwise suffix rules
/// produce candidates; with a lexicon loaded only known base forms are
/// accepted (shortest wins), without one a guarded rule choice is made.
/// Lookups are exact, so case is preserved.
pub struct MorphyLemmatizer {
    exceptions: HashMap<String, String>,
    lexicon: Option<HashSet<String>>,
}

impl Default for MorphyLemmatizer {
    fn default() -> Self { Self::bundled() }
}

impl MorphyLemmatizer {
    pub fn bundled() -> Self {
        Self { exceptions: BUNDLED_EXCEPTIONS.clone(), lexicon: None }
    }

    pub fn with_lexicon<I: IntoIterator<Item = String>>(mut self, words: I) -> Self {
        self.lexicon = Some(words.into_iter().collect());
        self
    }

    pub fn with_lexicon_path<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| VsmError::resource(path, e.to_string()))?;
        let words = parse_lexicon(&src);
        if words.is_empty() {
            return Err(VsmError::resource(path, "lexicon has no entries"));
        }
        info!(path = %path.display(), entries = words.len(), "loaded lemma lexicon");
        Ok(self.with_lexicon(words))
    }

    /// Layer an exception file (`inflected base` per line) over the bundled table.
    pub fn with_exceptions_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| VsmError::resource(path, e.to_string()))?;
        let extra = parse_exceptions(&src)
            .map_err(|(line, reason)| VsmError::resource(path, format!("line {line}: {reason}")))?;
        info!(path = %path.display(), entries = extra.len(), "loaded lemma exceptions");
        self.exceptions.extend(extra);
        Ok(self)
    }

    fn with_known_bases(&self, token: &str, lexicon: &HashSet<String>) -> String {
        let mut best: Option<String> = lexicon.contains(token).then(|| token.to_string());
        for (suffix, replacement) in NOUN_RULES {
            if let Some(stem) = token.strip_suffix(suffix) {
                let candidate = format!("{stem}{replacement}");
                if !candidate.is_empty()
                    && lexicon.contains(&candidate)
                    && best.as_ref().map_or(true, |b| candidate.len() < b.len())
                {
                    best = Some(candidate);
                }
            }
        }
        best.unwrap_or_else(|| token.to_string())
    }
}

/// Rule choice when no lexicon can validate candidates.
fn guess_base(token: &str) -> String {
    let len = token.chars().count();
    if len < 4 || !token.ends_with('s') {
        return token.to_string();
    }
    if ["ss", "us", "is", "ics"].iter().any(|s| token.ends_with(s)) {
        return token.to_string();
    }
    if len > 4 {
        if let Some(stem) = token.strip_suffix("ies") {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = token.strip_suffix("es") {
        if ["ss", "x", "zz", "ch", "sh"].iter().any(|s| stem.ends_with(s)) {
            return stem.to_string();
        }
    }
    token[..token.len() - 1].to_string()
}

impl Lemmatizer for MorphyLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        if let Some(base) = self.exceptions.get(token) {
            return base.clone();
        }
        match &self.lexicon {
            Some(lexicon) => self.with_known_bases(token, lexicon),
            None => guess_base(token),
        }
    }
}

/// Snowball stemmer behind the [`Lemmatizer`] interface.
///
/// Stems the lowercased token and restores a leading capital or full capitals.
pub struct SnowballLemmatizer {
    stemmer: Stemmer,
}

impl Default for SnowballLemmatizer {
    fn default() -> Self {
        Self { stemmer: Stemmer::create(Algorithm::English) }
    }
}

impl Lemmatizer for SnowballLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        let lower = token.to_lowercase();
        let stem = self.stemmer.stem(&lower).into_owned();
        let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
            return stem.to_uppercase();
        }
        if token.starts_with(char::is_uppercase) {
            let mut chars = stem.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => stem,
            };
        }
        stem
    }
}
