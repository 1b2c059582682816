use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use vsm_core::config::{PipelineConfig, QueryIds};
use vsm_core::eval::{evaluate, read_run, Qrels};
use vsm_core::lemmatizer::LemmatizerKind;
use vsm_core::perceptron::{read_tagged_corpus, PerceptronTagger, DEFAULT_ITERATIONS};
use vsm_core::pipeline::Pipeline;
use vsm_core::report::{ScoreFormat, WriteMode};
use vsm_core::tagger::TaggerKind;
use vsm_core::vectorizer::FilterMode;

#[derive(Parser)]
#[command(name = "ranker")]
#[command(
    about = "Rank a document collection against a query collection by cosine similarity",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every document for every query and write the listing
    Rank(RankArgs),
    /// Score a ranking listing against relevance judgments
    Eval {
        /// Listing written by `rank`
        #[arg(long)]
        run: PathBuf,
        /// Relevance judgments (`qid docid grade` per line)
        #[arg(long)]
        qrels: PathBuf,
        /// Cutoff for precision and recall
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// Print the full per-query breakdown as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Train a perceptron tagger model from a `word/TAG` corpus
    TrainTagger {
        /// One sentence per line, tokens written `word/TAG`
        #[arg(long)]
        corpus: PathBuf,
        /// Model directory to write
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,
    },
}

#[derive(Args)]
struct RankArgs {
    /// Document collection (.I/.T/.A/.B/.W records)
    #[arg(long)]
    docs: PathBuf,
    /// Query collection (.I/.W records)
    #[arg(long)]
    queries: PathBuf,
    /// Output listing path
    #[arg(long, default_value = "output.txt")]
    output: PathBuf,
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// pos-allowlist or stopwords
    #[arg(long)]
    filter_mode: Option<FilterMode>,
    /// Keep only the best K documents per query
    #[arg(long)]
    top_k: Option<usize>,
    /// Omit results with a score of exactly zero
    #[arg(long, default_value_t = false)]
    suppress_zero: bool,
    /// Write scores at full precision instead of three decimals
    #[arg(long, default_value_t = false)]
    full_precision: bool,
    /// Append to the output instead of replacing it
    #[arg(long, default_value_t = false)]
    append: bool,
    /// morphy or snowball
    #[arg(long)]
    lemmatizer: Option<LemmatizerKind>,
    /// perceptron or lexicon
    #[arg(long)]
    tagger: Option<TaggerKind>,
    /// Perceptron model directory (NLTK `averaged_perceptron_tagger_eng` layout)
    #[arg(long)]
    tagger_model: Option<PathBuf>,
    /// Extra tagger lexicon (`word TAG..` per line)
    #[arg(long)]
    tagger_lexicon: Option<PathBuf>,
    /// Noun base forms for the morphy lemmatizer (e.g. WordNet index.noun)
    #[arg(long)]
    lemma_lexicon: Option<PathBuf>,
    /// Extra irregular forms (`inflected base` per line)
    #[arg(long)]
    lemma_exceptions: Option<PathBuf>,
    /// Stop-word list replacing the built-in one
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Number queries 1..N in file order instead of using their .I ids
    #[arg(long, default_value_t = false)]
    sequential_query_ids: bool,
    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank(args) => rank(args),
        Commands::Eval { run, qrels, k, json } => eval(run, qrels, k, json),
        Commands::TrainTagger { corpus, out, iterations } => train_tagger(corpus, out, iterations),
    }
}

/// Config file first, then flags on top.
fn build_config(args: &RankArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(mode) = args.filter_mode {
        config.filter_mode = mode;
    }
    if args.top_k.is_some() {
        config.top_k = args.top_k;
    }
    if args.suppress_zero {
        config.suppress_zero = true;
    }
    if args.full_precision {
        config.score_format = ScoreFormat::Full;
    }
    if args.append {
        config.write_mode = WriteMode::Append;
    }
    if let Some(kind) = args.lemmatizer {
        config.lemmatizer = kind;
    }
    if let Some(kind) = args.tagger {
        config.tagger = kind;
    }
    if args.sequential_query_ids {
        config.query_ids = QueryIds::Sequential;
    }
    for (flag, slot) in [
        (&args.tagger_model, &mut config.tagger_model),
        (&args.tagger_lexicon, &mut config.tagger_lexicon),
        (&args.lemma_lexicon, &mut config.lemma_lexicon),
        (&args.lemma_exceptions, &mut config.lemma_exceptions),
        (&args.stopwords, &mut config.stopwords),
    ] {
        if flag.is_some() {
            *slot = flag.clone();
        }
    }
    Ok(config)
}

fn rank(args: RankArgs) -> Result<()> {
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring worker threads")?;
    }
    let config = build_config(&args)?;
    tracing::info!(
        filter_mode = %config.filter_mode,
        top_k = ?config.top_k,
        lemmatizer = %config.lemmatizer,
        tagger = %config.tagger,
        "starting ranking run"
    );
    let pipeline = Pipeline::from_config(config).context("loading language resources")?;
    let rankings = pipeline
        .run(&args.docs, &args.queries)
        .context("reading input collections")?;
    let lines = pipeline
        .write(&rankings, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    tracing::info!(output = %args.output.display(), lines, "ranking complete");
    Ok(())
}

fn eval(run: PathBuf, qrels: PathBuf, k: usize, json: bool) -> Result<()> {
    let rankings = read_run(&run).with_context(|| format!("reading run {}", run.display()))?;
    let judgments = Qrels::from_path(&qrels)
        .with_context(|| format!("reading qrels {}", qrels.display()))?;
    let summary = evaluate(&rankings, &judgments, k);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("queries  {}", summary.queries_evaluated);
        println!("MAP      {:.4}", summary.map);
        println!("P@{:<6} {:.4}", k, summary.precision_at_k);
        println!("R@{:<6} {:.4}", k, summary.recall_at_k);
        println!("MRR      {:.4}", summary.mrr);
    }
    Ok(())
}

fn train_tagger(corpus: PathBuf, out: PathBuf, iterations: usize) -> Result<()> {
    let sentences = read_tagged_corpus(&corpus)
        .with_context(|| format!("reading tagged corpus {}", corpus.display()))?;
    let tagger = PerceptronTagger::train(&sentences, iterations);
    tagger.save(&out).with_context(|| format!("writing model to {}", out.display()))?;
    tracing::info!(model = %out.display(), sentences = sentences.len(), "tagger model written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("run.json");
        let json = r#"{"filter_mode": "pos-allowlist", "top_k": 50, "suppress_zero": true}"#;
        std::fs::write(&cfg, json).unwrap();

        let cli = Cli::parse_from([
            "ranker",
            "rank",
            "--docs",
            "d",
            "--queries",
            "q",
            "--config",
            cfg.to_str().unwrap(),
            "--top-k",
            "5",
            "--full-precision",
            "--lemmatizer",
            "snowball",
            "--tagger-model",
            "models/eng",
        ]);
        let Commands::Rank(args) = cli.command else { panic!("expected rank") };
        let config = build_config(&args).unwrap();
        assert_eq!(config.filter_mode, FilterMode::PosAllowlist);
        assert_eq!(config.top_k, Some(5));
        assert!(config.suppress_zero);
        assert_eq!(config.score_format, ScoreFormat::Full);
        assert_eq!(config.lemmatizer, LemmatizerKind::Snowball);
        assert_eq!(config.write_mode, WriteMode::Truncate);
        assert_eq!(config.tagger, TaggerKind::Perceptron);
        assert_eq!(config.tagger_model, Some(PathBuf::from("models/eng")));
    }

    #[test]
    fn bad_flag_value_is_rejected() {
        let base = ["ranker", "rank", "--docs", "d", "--queries", "q"];
        let parsed = Cli::try_parse_from(base.into_iter().chain(["--filter-mode", "nouns"]));
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from(base.into_iter().chain(["--tagger", "brill"]));
        assert!(parsed.is_err());
    }

    #[test]
    fn train_tagger_writes_loadable_model() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("tagged.txt");
        let out = dir.path().join("model");
        std::fs::write(&corpus, "a/DT flat/JJ plate/NN ./.\nat/IN high/JJ speed/NN ./.\n").unwrap();

        let cli = Cli::parse_from([
            "ranker",
            "train-tagger",
            "--corpus",
            corpus.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ]);
        let Commands::TrainTagger { corpus, out, iterations } = cli.command else {
            panic!("expected train-tagger")
        };
        assert_eq!(iterations, DEFAULT_ITERATIONS);
        train_tagger(corpus, out.clone(), iterations).unwrap();
        assert!(PerceptronTagger::load(&out).is_ok());
    }
}
