use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Penn Treebank conventions, applied in order to a space-padded string.
    static ref RULES: Vec<(Regex, &'static str)> = [
        // opening double quotes
        (r#"^\s*""#, " `` "),
        (r#"([ (\[{<])("|'')"#, "${1} `` "),
        // punctuation
        (r"([:,])([^\d])", " ${1} ${2}"),
        (r"([:,])$", " ${1} "),
        (r"\.\.\.", " ... "),
        (r"[;@#$%&]", " ${0} "),
        (r"[?!]", " ${0} "),
        (r"([^'])' ", "${1} ' "),
        // brackets and dashes
        (r"[\]\[(){}<>]", " ${0} "),
        (r"--", " -- "),
        // closing quotes and clitics
        (r#"""#, " '' "),
        (r"(\S)('')", "${1} ${2} "),
        (r"([^' ])('[sS]|'[mM]|'[dD]|') ", "${1} ${2} "),
        (r"([^' ])('ll|'LL|'re|'RE|'ve|'VE|n't|N'T) ", "${1} ${2} "),
        (r"(?i)\b(can)(not)\b", " ${1} ${2} "),
        (r"(?i)\b(gon)(na)\b", " ${1} ${2} "),
        (r"(?i)\b(wan)(na)\b", " ${1} ${2} "),
    ]
    .into_iter()
    .map(|(pat, rep)| (Regex::new(pat).expect("valid regex"), rep))
    .collect();

    static ref ABBREVIATIONS: HashSet<&'static str> = [
        "al", "approx", "cf", "dr", "e.g", "eq", "eqs", "etc", "fig", "figs", "i.e", "jr", "mr",
        "mrs", "ms", "no", "nos", "prof", "ref", "refs", "sr", "st", "vol", "vs",
    ]
    .into_iter()
    .collect();
}

/// Split a sentence-final period off a whitespace chunk.
///
/// Chunks with an interior period (`U.S.`, `3.5.`) and known abbreviations keep
/// it, as does a lone run of periods.
fn split_period(chunk: &str) -> (&str, Option<&str>) {
    let Some(stem) = chunk.strip_suffix('.') else {
        return (chunk, None);
    };
    if stem.is_empty() || stem.ends_with('.') || stem.contains('.') {
        return (chunk, None);
    }
    if ABBREVIATIONS.contains(stem.to_lowercase().as_str()) {
        return (chunk, None);
    }
    (stem, Some("."))
}

/// Tokenize text into word and punctuation tokens.
///
/// Text is NFKC-normalized but not case-folded; the tagger and the term vector
/// both see the original case.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect();
    if normalized.trim().is_empty() {
        return Vec::new();
    }

    let mut padded = String::with_capacity(normalized.len() + 16);
    padded.push(' ');
    for chunk in normalized.split_whitespace() {
        let (word, period) = split_period(chunk);
        padded.push_str(word);
        padded.push(' ');
        if let Some(p) = period {
            padded.push_str(p);
            padded.push(' ');
        }
    }

    for (re, rep) in RULES.iter() {
        padded = re.replace_all(&padded, *rep).into_owned();
    }
    padded.split_whitespace().map(str::to_string).collect()
}
