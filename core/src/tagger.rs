//! Part-of-speech tagging with the Penn Treebank tagset.
//!
//! The statistical tagger lives in [`crate::perceptron`]. [`LexiconTagger`]
//! is the fallback when no trained model is available: it assigns each token
//! its most frequent lexicon reading, guesses unknown words from shape and
//! suffix, then runs a small set of contextual correction rules.

use crate::{Result, VsmError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosTag {
    CC,
    CD,
    DT,
    EX,
    FW,
    IN,
    JJ,
    JJR,
    JJS,
    LS,
    MD,
    NN,
    NNS,
    NNP,
    NNPS,
    PDT,
    POS,
    PRP,
    /// `PRP$`
    PRPS,
    RB,
    RBR,
    RBS,
    RP,
    SYM,
    TO,
    UH,
    VB,
    VBD,
    VBG,
    VBN,
    VBP,
    VBZ,
    WDT,
    WP,
    /// `WP$`
    WPS,
    WRB,
    /// `$`
    Dollar,
    /// `#`
    Pound,
    /// opening quote
    OpenQuote,
    /// closing quote
    CloseQuote,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// sentence-final `.`, `?`, `!`
    Period,
    /// mid-sentence `:`, `;`, `...`, `--`
    Colon,
}

impl PosTag {
    pub fn as_str(&self) -> &'static str {
        use PosTag::*;
        match self {
            CC => "CC",
            CD => "CD",
            DT => "DT",
            EX => "EX",
            FW => "FW",
            IN => "IN",
            JJ => "JJ",
            JJR => "JJR",
            JJS => "JJS",
            LS => "LS",
            MD => "MD",
            NN => "NN",
            NNS => "NNS",
            NNP => "NNP",
            NNPS => "NNPS",
            PDT => "PDT",
            POS => "POS",
            PRP => "PRP",
            PRPS => "PRP$",
            RB => "RB",
            RBR => "RBR",
            RBS => "RBS",
            RP => "RP",
            SYM => "SYM",
            TO => "TO",
            UH => "UH",
            VB => "VB",
            VBD => "VBD",
            VBG => "VBG",
            VBN => "VBN",
            VBP => "VBP",
            VBZ => "VBZ",
            WDT => "WDT",
            WP => "WP",
            WPS => "WP$",
            WRB => "WRB",
            Dollar => "$",
            Pound => "#",
            OpenQuote => "``",
            CloseQuote => "''",
            LeftParen => "(",
            RightParen => ")",
            Comma => ",",
            Period => ".",
            Colon => ":",
        }
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        use PosTag::*;
        let tag = match s {
            "CC" => CC,
            "CD" => CD,
            "DT" => DT,
            "EX" => EX,
            "FW" => FW,
            "IN" => IN,
            "JJ" => JJ,
            "JJR" => JJR,
            "JJS" => JJS,
            "LS" => LS,
            "MD" => MD,
            "NN" => NN,
            "NNS" => NNS,
            "NNP" | "NP" => NNP,
            "NNPS" | "NPS" => NNPS,
            "PDT" => PDT,
            "POS" => POS,
            "PRP" => PRP,
            "PRP$" => PRPS,
            "RB" => RB,
            "RBR" => RBR,
            "RBS" => RBS,
            "RP" => RP,
            "SYM" => SYM,
            "TO" => TO,
            "UH" => UH,
            "VB" => VB,
            "VBD" => VBD,
            "VBG" => VBG,
            "VBN" => VBN,
            "VBP" => VBP,
            "VBZ" => VBZ,
            "WDT" => WDT,
            "WP" => WP,
            "WP$" => WPS,
            "WRB" => WRB,
            "$" => Dollar,
            "#" => Pound,
            "``" => OpenQuote,
            "''" => CloseQuote,
            "(" | "-LRB-" => LeftParen,
            ")" | "-RRB-" => RightParen,
            "," => Comma,
            "." => Period,
            ":" => Colon,
            other => return Err(format!("unknown Penn Treebank tag `{other}`")),
        };
        Ok(tag)
    }
}

/// Assigns one tag per token. Implementations are shared read-only across threads.
pub trait Tagger: Send + Sync {
    fn tag(&self, tokens: &[String]) -> Vec<(String, PosTag)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaggerKind {
    /// Pretrained averaged perceptron model; [`LexiconTagger`] when none is available.
    #[default]
    Perceptron,
    /// Lexicon lookup with suffix guesses and contextual rules.
    Lexicon,
}

impl FromStr for TaggerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "perceptron" => Ok(Self::Perceptron),
            "lexicon" => Ok(Self::Lexicon),
            other => Err(format!("unknown tagger `{other}` (expected perceptron or lexicon)")),
        }
    }
}

impl fmt::Display for TaggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Perceptron => "perceptron",
            Self::Lexicon => "lexicon",
        })
    }
}

type Lexicon = HashMap<String, Vec<PosTag>>;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^[+-]?(\d+([.,/]\d+)*|\.\d+)$").expect("valid regex");
    static ref ORDINAL: Regex = Regex::new(r"^\d+(st|nd|rd|th)$").expect("valid regex");
    static ref BUNDLED: Lexicon =
        parse_lexicon(include_str!("../resources/lexicon.txt"))
            .expect("bundled lexicon is well formed");
}

/// Parse `word TAG [TAG ..]` lines. Returns the failing line number and reason on error.
fn parse_lexicon(src: &str) -> std::result::Result<Lexicon, (usize, String)> {
    let mut lexicon = Lexicon::new();
    for (idx, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let word = match parts.next() {
            Some(w) => w.to_lowercase(),
            None => continue,
        };
        let tags = parts
            .map(|t| t.parse::<PosTag>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| (idx + 1, e))?;
        if tags.is_empty() {
            return Err((idx + 1, format!("no tags for `{word}`")));
        }
        lexicon.insert(word, tags);
    }
    Ok(lexicon)
}

pub struct LexiconTagger {
    lexicon: Lexicon,
}

impl Default for LexiconTagger {
    fn default() -> Self { Self::bundled() }
}

impl LexiconTagger {
    /// Tagger over the lexicon shipped with the crate.
    pub fn bundled() -> Self {
        Self { lexicon: BUNDLED.clone() }
    }

    /// Bundled lexicon with entries from `path` layered on top.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| VsmError::resource(path, e.to_string()))?;
        let extra = parse_lexicon(&src)
            .map_err(|(line, reason)| VsmError::resource(path, format!("line {line}: {reason}")))?;
        info!(path = %path.display(), entries = extra.len(), "loaded tagger lexicon");
        let mut tagger = Self::bundled();
        tagger.lexicon.extend(extra);
        Ok(tagger)
    }

    fn lookup(&self, token: &str) -> Option<&[PosTag]> {
        self.lexicon
            .get(token)
            .or_else(|| self.lexicon.get(&token.to_lowercase()))
            .map(Vec::as_slice)
    }

    fn allows(&self, token: &str, tag: PosTag) -> bool {
        match self.lookup(token) {
            Some(tags) => tags.contains(&tag),
            None => true,
        }
    }

    fn initial_tag(&self, token: &str, sentence_start: bool) -> PosTag {
        if let Some(tag) = punctuation_tag(token) {
            return tag;
        }
        if let Some(tags) = self.lookup(token) {
            return tags[0];
        }
        if ORDINAL.is_match(token) {
            return PosTag::JJ;
        }
        if NUMBER.is_match(token) || token.starts_with(|c: char| c.is_ascii_digit()) {
            return PosTag::CD;
        }
        if !token.chars().any(char::is_alphanumeric) {
            return PosTag::SYM;
        }
        guess_unknown(token, sentence_start)
    }

    /// Contextual corrections over the initial tags.
    fn apply_context(&self, tokens: &[String], tags: &mut [PosTag]) {
        use PosTag::*;
        for i in 1..tags.len() {
            let prev = tags[i - 1];
            let word = tokens[i].as_str();
            let cur = tags[i];

            // "to flow", "can be"
            if matches!(prev, TO | MD)
                && matches!(cur, NN | VBP | VBD | JJ)
                && self.allows(word, VB)
            {
                tags[i] = VB;
                continue;
            }
            // "the flow", "its use"
            if matches!(prev, DT | PRPS | JJ | POS | PDT)
                && matches!(cur, VB | VBP)
                && self.allows(word, NN)
            {
                tags[i] = NN;
                continue;
            }
            // "we study", "they use"
            let can_be_vbp = self.lookup(word).map_or(false, |t| t.contains(&VBP));
            if prev == PRP && matches!(cur, NN | VB) && can_be_vbp {
                tags[i] = VBP;
                continue;
            }
            // "it's" as a verb
            if cur == POS
                && word.eq_ignore_ascii_case("'s")
                && matches!(prev, PRP | EX | WP | WDT)
            {
                tags[i] = VBZ;
                continue;
            }
            if matches!(cur, VBD | VBN) {
                tags[i] = self.past_form(tokens, tags, i);
            }
        }
    }

    /// VBN after a form of "have"/"be" (adverbs skipped), VBD after a subject.
    fn past_form(&self, tokens: &[String], tags: &[PosTag], i: usize) -> PosTag {
        use PosTag::*;
        let cur = tags[i];
        let mut j = i;
        while j > 0 {
            j -= 1;
            if tags[j] == RB {
                continue;
            }
            let w = tokens[j].to_lowercase();
            let aux = matches!(
                w.as_str(),
                "have" | "has" | "had" | "having" | "'ve" | "be" | "is" | "are" | "was" | "were"
                    | "been"
                    | "being" | "'re" | "'m" | "am"
            );
            if aux && self.allows(&tokens[i], VBN) {
                return VBN;
            }
            let subject = matches!(tags[j], NN | NNS | NNP | NNPS | PRP | WDT | WP);
            if subject && self.allows(&tokens[i], VBD) {
                return VBD;
            }
            return cur;
        }
        cur
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, tokens: &[String]) -> Vec<(String, PosTag)> {
        let mut tags = Vec::with_capacity(tokens.len());
        let mut sentence_start = true;
        for token in tokens {
            let tag = self.initial_tag(token, sentence_start);
            sentence_start = tag == PosTag::Period;
            tags.push(tag);
        }
        self.apply_context(tokens, &mut tags);
        tokens.iter().cloned().zip(tags).collect()
    }
}

fn punctuation_tag(token: &str) -> Option<PosTag> {
    use PosTag::*;
    let tag = match token {
        "," => Comma,
        "." | "?" | "!" => Period,
        ":" | ";" | "..." | "--" | "-" => Colon,
        "``" | "`" => OpenQuote,
        "''" => CloseQuote,
        "(" | "[" | "{" => LeftParen,
        ")" | "]" | "}" => RightParen,
        "$" => Dollar,
        "#" => Pound,
        "%" => NN,
        _ => return None,
    };
    Some(tag)
}

fn has_vowel(s: &str) -> bool {
    s.chars().any(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y'))
}

const ADJECTIVE_SUFFIXES: &[&str] = &[
    "ous", "ful", "ive", "able", "ible", "ical", "ic", "al", "less", "ish", "ary", "ory", "ant",
    "ent",
];

/// Shape and suffix guess for a word missing from the lexicon.
fn guess_unknown(token: &str, sentence_start: bool) -> PosTag {
    use PosTag::*;
    let first_upper = token.chars().next().map_or(false, char::is_uppercase);
    let all_upper = token.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase);
    if first_upper && (!sentence_start || (all_upper && token.chars().count() > 1)) {
        return if token.ends_with('s') && !all_upper && token.len() > 3 { NNPS } else { NNP };
    }

    let w = token.to_lowercase();
    let len = w.chars().count();
    if w.contains('-') {
        return JJ;
    }
    if len > 4 && w.ends_with("ly") && !w.ends_with("ply") {
        return RB;
    }
    if let Some(stem) = w.strip_suffix("ing") {
        if stem.chars().count() >= 2 && has_vowel(stem) {
            return VBG;
        }
    }
    if let Some(stem) = w.strip_suffix("ed") {
        if !w.ends_with("eed") && stem.chars().count() >= 2 && has_vowel(stem) {
            return VBN;
        }
    }
    if len > 5 && w.ends_with("est") {
        return JJS;
    }
    if len > 3 && w.ends_with('s') && !["ss", "us", "is"].iter().any(|s| w.ends_with(s)) {
        return NNS;
    }
    if ["ize", "ise", "ify"].iter().any(|s| w.ends_with(s)) && len > 5 {
        return VB;
    }
    if ADJECTIVE_SUFFIXES.iter().any(|s| w.ends_with(s) && len > s.len() + 2) {
        return JJ;
    }
    NN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<PosTag> {
        let tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        LexiconTagger::bundled().tag(&tokens).into_iter().map(|(_, t)| t).collect()
    }

    #[test]
    fn bundled_lexicon_parses() {
        assert!(parse_lexicon(include_str!("../resources/lexicon.txt")).is_ok());
        assert!(BUNDLED.len() > 300);
    }

    #[test]
    fn closed_class_words() {
        use PosTag::*;
        assert_eq!(tags("the jet and the wing"), vec![DT, NN, CC, DT, NN]);
        assert_eq!(tags("it is in them"), vec![PRP, VBZ, IN, PRP]);
        assert_eq!(tags("what should we do"), vec![WP, MD, PRP, VBP]);
    }

    #[test]
    fn unknown_word_suffixes() {
        use PosTag::*;
        assert_eq!(guess_unknown("rapidly", false), RB);
        assert_eq!(guess_unknown("oscillating", false), VBG);
        assert_eq!(guess_unknown("cylinders", false), NNS);
        assert_eq!(guess_unknown("supersonic", false), JJ);
        assert_eq!(guess_unknown("high-speed", false), JJ);
        assert_eq!(guess_unknown("nozzle", false), NN);
        assert_eq!(guess_unknown("Prandtl", false), NNP);
        assert_eq!(guess_unknown("NACA", true), NNP);
        assert_eq!(guess_unknown("Nozzle", true), NN);
    }

    #[test]
    fn numbers_and_punctuation() {
        use PosTag::*;
        assert_eq!(
            tags("3,000 ft , 0.5 ( 2nd ) ."),
            vec![CD, NN, Comma, CD, LeftParen, JJ, RightParen, Period]
        );
    }

    #[test]
    fn contextual_rules() {
        use PosTag::*;
        // modal/infinitive pushes toward base verb
        assert_eq!(tags("to flow")[1], VB);
        // determiner pushes toward noun
        assert_eq!(tags("the use")[1], NN);
        // auxiliary makes a participle
        assert_eq!(tags("it was heated")[2], VBN);
        assert_eq!(tags("the model heated")[2], VBD);
    }

    #[test]
    fn common_adjectives_before_nouns() {
        use PosTag::*;
        let t = tags("the boundary layer flow over a flat plate was studied at high mach numbers");
        assert_eq!(t[6], JJ);
        assert_eq!(t[7], NN);
        assert_eq!(t[11], JJ);
        assert_eq!(t[13], NNS);
    }

    #[test]
    fn tagger_kind_parses() {
        assert_eq!("lexicon".parse::<TaggerKind>(), Ok(TaggerKind::Lexicon));
        assert_eq!(TaggerKind::default().to_string(), "perceptron");
        assert!("brill".parse::<TaggerKind>().is_err());
    }

    #[test]
    fn tag_round_trips_through_strings() {
        for t in ["NN", "PRP$", "WP$", "``", "''", ".", "VBZ"] {
            assert_eq!(t.parse::<PosTag>().map(|p| p.as_str()), Ok(t));
        }
        assert_eq!("NP".parse::<PosTag>(), Ok(PosTag::NNP));
        assert!("XYZ".parse::<PosTag>().is_err());
    }

    #[test]
    fn lexicon_file_overrides_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.txt");
        fs::write(&path, "# custom\nnozzle JJ\n").unwrap();
        let tagger = LexiconTagger::from_path(&path).unwrap();
        let out = tagger.tag(&["nozzle".to_string()]);
        assert_eq!(out[0].1, PosTag::JJ);
    }

    #[test]
    fn malformed_lexicon_is_a_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "nozzle QQ\n").unwrap();
        assert!(matches!(LexiconTagger::from_path(&path), Err(VsmError::Resource { .. })));
        let missing = LexiconTagger::from_path(dir.path().join("missing.txt"));
        assert!(matches!(missing, Err(VsmError::Resource { .. })));
    }
}
