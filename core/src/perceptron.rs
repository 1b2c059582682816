//! Averaged perceptron part-of-speech tagger.
//!
//! Models are stored in the JSON layout NLTK uses for its pretrained
//! `averaged_perceptron_tagger_eng`: a directory holding
//! `<name>.weights.json` (feature -> tag -> weight), `<name>.tagdict.json`
//! (unambiguous word -> tag) and `<name>.classes.json` (tag list). An installed
//! NLTK model loads as is, and [`PerceptronTagger::save`] writes the same files.

use crate::tagger::{PosTag, Tagger};
use crate::{Result, VsmError};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MODEL_NAME: &str = "averaged_perceptron_tagger_eng";
pub const DEFAULT_ITERATIONS: usize = 5;

const START: [&str; 2] = ["-START-", "-START2-"];
const END: [&str; 2] = ["-END-", "-END2-"];

// A word joins the tag dictionary when seen this often with one dominant tag.
const TAGDICT_MIN_FREQ: usize = 20;
const TAGDICT_MIN_SHARE: f64 = 0.97;

type Features = HashMap<String, f64>;
type Weights = HashMap<String, HashMap<PosTag, f64>>;

/// One training sentence: tokens with their gold tags.
pub type TaggedSentence = Vec<(String, PosTag)>;

#[derive(Debug, Clone, Default)]
pub struct PerceptronTagger {
    weights: Weights,
    classes: Vec<PosTag>,
    tagdict: HashMap<String, PosTag>,
}

impl PerceptronTagger {
    /// Load a model directory holding the three `MODEL_NAME.*.json` files.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let raw_weights: HashMap<String, HashMap<String, f64>> =
            read_json(&model_file(dir, "weights"))?;
        let raw_tagdict: HashMap<String, String> = read_json(&model_file(dir, "tagdict"))?;
        let raw_classes: Vec<String> = read_json(&model_file(dir, "classes"))?;

        let mut unknown: Vec<String> = Vec::new();
        let mut known = |label: &str| match label.parse::<PosTag>() {
            Ok(tag) => Some(tag),
            Err(_) => {
                if !unknown.iter().any(|u| u == label) {
                    unknown.push(label.to_string());
                }
                None
            }
        };

        let classes: Vec<PosTag> = raw_classes.iter().filter_map(|c| known(c.as_str())).collect();
        if classes.is_empty() {
            let path = model_file(dir, "classes");
            return Err(VsmError::resource(path, "model has no Penn Treebank classes"));
        }
        let weights: Weights = raw_weights
            .into_iter()
            .map(|(feat, per_tag)| {
                let per_tag: HashMap<PosTag, f64> =
                    per_tag.into_iter().filter_map(|(l, w)| known(&l).map(|t| (t, w))).collect();
                (feat, per_tag)
            })
            .collect();
        let tagdict = raw_tagdict
            .into_iter()
            .filter_map(|(word, l)| known(&l).map(|t| (word, t)))
            .collect();

        if !unknown.is_empty() {
            warn!(
                path = %dir.display(),
                labels = ?unknown,
                "ignoring tags outside the Penn Treebank set"
            );
        }
        let tagger = Self { weights, classes, tagdict };
        info!(
            path = %dir.display(),
            features = tagger.weights.len(),
            classes = tagger.classes.len(),
            tagdict = tagger.tagdict.len(),
            "loaded perceptron tagger model"
        );
        Ok(tagger)
    }

    /// Write the model in the layout [`PerceptronTagger::load`] reads.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| VsmError::io(dir, e))?;

        let weights: BTreeMap<&str, BTreeMap<&str, f64>> = self
            .weights
            .iter()
            .map(|(feat, per_tag)| {
                (feat.as_str(), per_tag.iter().map(|(t, w)| (t.as_str(), *w)).collect())
            })
            .collect();
        let tagdict: BTreeMap<&str, &str> =
            self.tagdict.iter().map(|(w, t)| (w.as_str(), t.as_str())).collect();
        let classes: Vec<&str> = self.classes.iter().map(PosTag::as_str).collect();

        write_json(&model_file(dir, "weights"), &weights)?;
        write_json(&model_file(dir, "tagdict"), &tagdict)?;
        write_json(&model_file(dir, "classes"), &classes)?;
        info!(path = %dir.display(), features = weights.len(), "saved perceptron tagger model");
        Ok(())
    }

    /// Train on gold-tagged sentences.
    ///
    /// Each iteration visits the sentences in order; weights are averaged over
    /// every update at the end.
    pub fn train(sentences: &[TaggedSentence], iterations: usize) -> Self {
        let mut classes: Vec<PosTag> = sentences.iter().flatten().map(|(_, t)| *t).collect();
        classes.sort_by_key(|t| t.as_str());
        classes.dedup();

        let mut trainer = Trainer {
            model: Self { weights: Weights::new(), classes, tagdict: build_tagdict(sentences) },
            totals: HashMap::new(),
            stamps: HashMap::new(),
            instances: 0,
        };

        for iteration in 0..iterations {
            let (mut correct, mut seen) = (0usize, 0usize);
            for sentence in sentences {
                let words: Vec<String> = sentence.iter().map(|(w, _)| w.clone()).collect();
                let context = context(&words);
                let (mut prev, mut prev2) = (START[0], START[1]);
                for (i, (word, truth)) in sentence.iter().enumerate() {
                    let guess = match trainer.model.tagdict.get(word) {
                        Some(tag) => *tag,
                        None => {
                            let feats = features(i, word, &context, prev, prev2);
                            let guess = trainer.model.predict(&feats);
                            trainer.update(*truth, guess, &feats);
                            guess
                        }
                    };
                    prev2 = prev;
                    prev = guess.as_str();
                    correct += usize::from(guess == *truth);
                    seen += 1;
                }
            }
            debug!(iteration = iteration + 1, correct, seen, "perceptron training pass");
        }
        let model = trainer.average();
        info!(
            sentences = sentences.len(),
            iterations,
            features = model.weights.len(),
            tagdict = model.tagdict.len(),
            "trained perceptron tagger"
        );
        model
    }

    /// Highest scoring class; equal scores go to the lexically greater tag.
    fn predict(&self, feats: &Features) -> PosTag {
        let mut scores: HashMap<PosTag, f64> = HashMap::new();
        for (feat, value) in feats {
            if *value == 0.0 {
                continue;
            }
            if let Some(per_tag) = self.weights.get(feat) {
                for (tag, weight) in per_tag {
                    *scores.entry(*tag).or_insert(0.0) += value * weight;
                }
            }
        }
        let score = |t: &PosTag| scores.get(t).copied().unwrap_or(0.0);
        self.classes
            .iter()
            .copied()
            .max_by(|a, b| score(a).total_cmp(&score(b)).then_with(|| a.as_str().cmp(b.as_str())))
            .unwrap_or(PosTag::NN)
    }
}

impl Tagger for PerceptronTagger {
    fn tag(&self, tokens: &[String]) -> Vec<(String, PosTag)> {
        let context = context(tokens);
        let (mut prev, mut prev2): (&str, &str) = (START[0], START[1]);
        tokens
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let tag = match self.tagdict.get(word) {
                    Some(tag) => *tag,
                    None => self.predict(&features(i, word, &context, prev, prev2)),
                };
                prev2 = prev;
                prev = tag.as_str();
                (word.clone(), tag)
            })
            .collect()
    }
}

struct Trainer {
    model: PerceptronTagger,
    totals: HashMap<(String, PosTag), f64>,
    stamps: HashMap<(String, PosTag), usize>,
    instances: usize,
}

impl Trainer {
    fn update(&mut self, truth: PosTag, guess: PosTag, feats: &Features) {
        self.instances += 1;
        if truth == guess {
            return;
        }
        for feat in feats.keys() {
            self.bump(feat, truth, 1.0);
            self.bump(feat, guess, -1.0);
        }
    }

    fn bump(&mut self, feat: &str, tag: PosTag, delta: f64) {
        let weight =
            self.model.weights.entry(feat.to_string()).or_default().entry(tag).or_insert(0.0);
        let key = (feat.to_string(), tag);
        let stamp = self.stamps.entry(key.clone()).or_insert(0);
        *self.totals.entry(key).or_insert(0.0) += (self.instances - *stamp) as f64 * *weight;
        *stamp = self.instances;
        *weight += delta;
    }

    fn average(self) -> PerceptronTagger {
        let Trainer { mut model, totals, stamps, instances } = self;
        let n = instances.max(1) as f64;
        for (feat, per_tag) in model.weights.iter_mut() {
            per_tag.retain(|tag, weight| {
                let key = (feat.clone(), *tag);
                let since = instances - stamps.get(&key).copied().unwrap_or(0);
                let total = totals.get(&key).copied().unwrap_or(0.0) + since as f64 * *weight;
                *weight = (total / n * 1000.0).round() / 1000.0;
                *weight != 0.0
            });
        }
        model.weights.retain(|_, per_tag| !per_tag.is_empty());
        model
    }
}

fn build_tagdict(sentences: &[TaggedSentence]) -> HashMap<String, PosTag> {
    let mut counts: HashMap<&str, HashMap<PosTag, usize>> = HashMap::new();
    for (word, tag) in sentences.iter().flatten() {
        *counts.entry(word.as_str()).or_default().entry(*tag).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter_map(|(word, freqs)| {
            let n: usize = freqs.values().sum();
            let (tag, mode) = freqs
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.as_str().cmp(a.0.as_str())))?;
            let dominant = mode as f64 / n as f64 >= TAGDICT_MIN_SHARE;
            (n >= TAGDICT_MIN_FREQ && dominant).then(|| (word.to_string(), tag))
        })
        .collect()
}

/// Shape classes for rare token kinds, lowercase otherwise.
fn normalize(word: &str) -> String {
    if word.contains('-') && !word.starts_with('-') {
        "!HYPHEN".to_string()
    } else if word.chars().count() == 4 && word.chars().all(|c| c.is_ascii_digit()) {
        "!YEAR".to_string()
    } else if word.starts_with(|c: char| c.is_ascii_digit()) {
        "!DIGITS".to_string()
    } else {
        word.to_lowercase()
    }
}

fn context(tokens: &[String]) -> Vec<String> {
    START
        .iter()
        .map(|s| s.to_string())
        .chain(tokens.iter().map(|t| normalize(t)))
        .chain(END.iter().map(|s| s.to_string()))
        .collect()
}

/// Last three characters (or the whole word when shorter).
fn suffix(word: &str) -> &str {
    let start = word.char_indices().rev().nth(2).map_or(0, |(i, _)| i);
    &word[start..]
}

fn features(i: usize, word: &str, context: &[String], prev: &str, prev2: &str) -> Features {
    let i = i + START.len();
    let c = move |k: usize| context[k].as_str();
    let first: String = word.chars().take(1).collect();
    let keys = [
        "bias".to_string(),
        format!("i suffix {}", suffix(word)),
        format!("i pref1 {first}"),
        format!("i-1 tag {prev}"),
        format!("i-2 tag {prev2}"),
        format!("i tag+i-2 tag {prev} {prev2}"),
        format!("i word {}", c(i)),
        format!("i-1 tag+i word {prev} {}", c(i)),
        format!("i-1 word {}", c(i - 1)),
        format!("i-1 suffix {}", suffix(c(i - 1))),
        format!("i-2 word {}", c(i - 2)),
        format!("i+1 word {}", c(i + 1)),
        format!("i+1 suffix {}", suffix(c(i + 1))),
        format!("i+2 word {}", c(i + 2)),
    ];
    let mut feats = Features::new();
    for key in keys {
        *feats.entry(key).or_insert(0.0) += 1.0;
    }
    feats
}

fn model_file(dir: &Path, part: &str) -> PathBuf {
    dir.join(format!("{MODEL_NAME}.{part}.json"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = fs::File::open(path).map_err(|e| VsmError::resource(path, e.to_string()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| VsmError::resource(path, e.to_string()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| VsmError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|e| VsmError::resource(path, e.to_string()))?;
    writer.flush().map_err(|e| VsmError::io(path, e))
}

/// Look for an installed NLTK English tagger model.
///
/// Searches `$NLTK_DATA` entries, then `~/nltk_data` and the usual system
/// data directories, for `taggers/averaged_perceptron_tagger_eng`.
pub fn find_installed_model() -> Option<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    if let Some(paths) = std::env::var_os("NLTK_DATA") {
        roots.extend(std::env::split_paths(&paths));
    }
    if let Some(home) = std::env::var_os("HOME") {
        roots.push(PathBuf::from(home).join("nltk_data"));
    }
    for sys in [
        "/usr/share/nltk_data",
        "/usr/local/share/nltk_data",
        "/usr/lib/nltk_data",
        "/usr/local/lib/nltk_data",
    ] {
        roots.push(PathBuf::from(sys));
    }
    roots
        .into_iter()
        .map(|root| root.join("taggers").join(MODEL_NAME))
        .find(|dir| model_file(dir, "weights").is_file())
}

/// Parse `word/TAG word/TAG ..` lines, one sentence per line.
///
/// The tag follows the last `/`, so tokens such as `1/2/CD` keep their slash.
pub fn parse_tagged_sentences(
    src: &str,
) -> std::result::Result<Vec<TaggedSentence>, (usize, String)> {
    let mut sentences = Vec::new();
    for (idx, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sentence = line
            .split_whitespace()
            .map(|pair| {
                let (word, tag) = pair
                    .rsplit_once('/')
                    .filter(|(w, _)| !w.is_empty())
                    .ok_or_else(|| (idx + 1, format!("expected `word/TAG`, got `{pair}`")))?;
                let tag = tag.parse::<PosTag>().map_err(|e| (idx + 1, e))?;
                Ok((word.to_string(), tag))
            })
            .collect::<std::result::Result<TaggedSentence, (usize, String)>>()?;
        sentences.push(sentence);
    }
    Ok(sentences)
}

pub fn read_tagged_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<TaggedSentence>> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| VsmError::io(path, e))?;
    let sentences = parse_tagged_sentences(&src)
        .map_err(|(line, reason)| VsmError::resource(path, format!("line {line}: {reason}")))?;
    if sentences.is_empty() {
        return Err(VsmError::resource(path, "no tagged sentences"));
    }
    Ok(sentences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use PosTag::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn tags_of(tagger: &PerceptronTagger, text: &str) -> Vec<PosTag> {
        tagger.tag(&words(text)).into_iter().map(|(_, t)| t).collect()
    }

    fn training_set() -> Vec<TaggedSentence> {
        let src = "the/DT flow/NN is/VBZ fast/JJ ./.\n\
                   they/PRP flow/VBP fast/RB ./.\n\
                   a/DT flat/JJ plate/NN ./.\n\
                   at/IN high/JJ speed/NN ./.\n";
        let once = parse_tagged_sentences(src).unwrap();
        (0..5).flat_map(|_| once.clone()).collect()
    }

    #[test]
    fn word_shapes() {
        assert_eq!(normalize("high-speed"), "!HYPHEN");
        assert_eq!(normalize("-5"), "-5");
        assert_eq!(normalize("1957"), "!YEAR");
        assert_eq!(normalize("3.5"), "!DIGITS");
        assert_eq!(normalize("Mach"), "mach");
        assert_eq!(suffix("flowing"), "ing");
        assert_eq!(suffix("at"), "at");
        assert_eq!(suffix("ÿéü"), "ÿéü");
    }

    #[test]
    fn feature_keys_use_context_window() {
        let tokens = words("Flow over plates");
        let ctx = context(&tokens);
        let feats = features(0, "Flow", &ctx, START[0], START[1]);
        for key in [
            "bias",
            "i suffix low",
            "i pref1 F",
            "i word flow",
            "i-1 word -START2-",
            "i-2 word -START-",
            "i+1 word over",
            "i+2 word plates",
            "i tag+i-2 tag -START- -START2-",
        ] {
            assert_eq!(feats.get(key), Some(&1.0), "missing {key}");
        }
        assert_eq!(feats.len(), 14);
    }

    #[test]
    fn prediction_and_tie_break() {
        let mut tagger = PerceptronTagger { classes: vec![JJ, NN, VB], ..Default::default() };
        // no evidence: lexically greatest tag
        assert_eq!(tags_of(&tagger, "plate"), vec![VB]);

        tagger.weights.insert("i word plate".into(), HashMap::from([(NN, 2.0), (VB, 0.5)]));
        tagger.weights.insert("i-1 tag NN".into(), HashMap::from([(JJ, 3.0)]));
        assert_eq!(tags_of(&tagger, "plate plate"), vec![NN, JJ]);

        tagger.tagdict.insert("plate".into(), VB);
        assert_eq!(tags_of(&tagger, "plate"), vec![VB]);
    }

    #[test]
    fn trained_model_tags_adjectives_in_context() {
        let tagger = PerceptronTagger::train(&training_set(), 10);
        assert_eq!(tags_of(&tagger, "the flow is fast ."), vec![DT, NN, VBZ, JJ, Period]);
        assert_eq!(tags_of(&tagger, "they flow fast ."), vec![PRP, VBP, RB, Period]);
        assert_eq!(tags_of(&tagger, "a flat plate ."), vec![DT, JJ, NN, Period]);

        let unseen = tags_of(&tagger, "they flow over a flat plate at high speed .");
        assert_eq!(unseen[1], VBP);
        assert_eq!(unseen[4], JJ);
        assert_eq!(unseen[7], JJ);
    }

    #[test]
    fn frequent_unambiguous_words_enter_tagdict() {
        let tagger = PerceptronTagger::train(&training_set(), 1);
        // "." appears 20 times, everything else 5 or 10
        assert_eq!(tagger.tagdict.len(), 1);
        assert_eq!(tagger.tagdict.get("."), Some(&Period));
    }

    #[test]
    fn saved_model_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let tagger = PerceptronTagger::train(&training_set(), 10);
        tagger.save(dir.path()).unwrap();
        assert!(dir.path().join("averaged_perceptron_tagger_eng.weights.json").is_file());

        let loaded = PerceptronTagger::load(dir.path()).unwrap();
        let text = "they flow over a flat plate at high speed .";
        assert_eq!(tags_of(&loaded, text), tags_of(&tagger, text));
    }

    #[test]
    fn foreign_labels_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let weights = r#"{"bias": {"NN": 1.0, "-NONE-": 9.0}}"#;
        fs::write(model_file(dir.path(), "weights"), weights).unwrap();
        fs::write(model_file(dir.path(), "tagdict"), r#"{"the": "DT", "foo": "XX"}"#).unwrap();
        fs::write(model_file(dir.path(), "classes"), r#"["NN", "DT", "-NONE-"]"#).unwrap();
        let tagger = PerceptronTagger::load(dir.path()).unwrap();
        assert_eq!(tags_of(&tagger, "the foo"), vec![DT, NN]);
    }

    #[test]
    fn missing_or_broken_model_is_a_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(PerceptronTagger::load(dir.path()), Err(VsmError::Resource { .. })));
        fs::write(model_file(dir.path(), "weights"), "{not json").unwrap();
        fs::write(model_file(dir.path(), "tagdict"), "{}").unwrap();
        fs::write(model_file(dir.path(), "classes"), "[]").unwrap();
        assert!(matches!(PerceptronTagger::load(dir.path()), Err(VsmError::Resource { .. })));
    }

    #[test]
    fn tagged_corpus_lines() {
        let s = parse_tagged_sentences("# comment\nThe/DT 1/2/CD ./.\n\nIt/PRP is/VBZ\n").unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0][1], ("1/2".to_string(), CD));
        assert_eq!(parse_tagged_sentences("ok/NN flow\n").unwrap_err().0, 1);
        assert_eq!(parse_tagged_sentences("a/DT\nb/QQ\n").unwrap_err().0, 2);
        assert!(parse_tagged_sentences("/NN\n").is_err());
    }
}
