//! Topictrack CLI - Multi-Document Topic Tracking Segmentation
//!
//! Command-line interface for generating synthetic corpora and segmenting
//! document collections.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use log::error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use topictrack::{
    window_diff_per_document, Config, Corpus, CorpusSource, DiagnosticKind, DpSegmentor, GreedySegmentor,
    LanguageModelDp, LogSink, NullSink, Result, SegmentationConfig, SegmentationResult, Segmentor, SyntheticCorpus,
    TraceSink, WriterSink,
};

#[derive(Parser)]
#[command(name = "topictrack")]
#[command(author = "Topictrack Contributors")]
#[command(version)]
#[command(about = "Multi-document topic tracking segmentation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Engine {
    /// Exact dynamic programming over document subsets
    Dp,
    /// Beam search over a bounded candidate cache
    Greedy,
    /// Per-document DP over language-model columns
    LmDp,
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Segmentation engine
    #[arg(short, long, value_enum, default_value = "greedy")]
    engine: Engine,

    /// Symmetric Dirichlet prior
    #[arg(short, long)]
    beta: Option<f64>,

    /// Greedy beam width
    #[arg(long)]
    max_cache: Option<usize>,

    /// Maximum number of topics per candidate
    #[arg(long)]
    max_topics: Option<usize>,

    /// Shard the greedy beam across worker threads
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic corpus with reference boundaries
    Generate {
        /// Output corpus file (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Number of documents
        #[arg(long)]
        docs: Option<usize>,

        /// Sentences per document
        #[arg(long)]
        doc_len: Option<usize>,

        /// Vocabulary size
        #[arg(long)]
        vocab: Option<usize>,

        /// Number of topics
        #[arg(long)]
        topics: Option<usize>,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Segment a corpus
    Segment {
        /// Input corpus file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Check the greedy beam against reference boundaries
        #[arg(long)]
        check_cache: bool,

        /// Prefer balanced segment counts at the last DP position
        #[arg(long)]
        min_seg_diff: bool,

        /// Write a likelihood tracker to this file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Compare segmenting documents one by one against segmenting them jointly
    Compare {
        /// Input corpus file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Commands::Generate {
            output,
            docs,
            doc_len,
            vocab,
            topics,
            seed,
        } => generate_corpus(config, output, docs, doc_len, vocab, topics, seed),

        Commands::Segment {
            input,
            engine,
            check_cache,
            min_seg_diff,
            trace,
        } => {
            let mut segmentation = engine.apply(config.segmentation);
            segmentation.check_cache |= check_cache;
            segmentation.min_seg_diff |= min_seg_diff;
            segment_corpus(input, engine.engine, segmentation, trace, cli.verbose)
        }

        Commands::Compare { input, engine } => {
            let segmentation = engine.apply(config.segmentation);
            compare_corpus(input, engine.engine, segmentation)
        }
    });

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

impl EngineArgs {
    fn apply(&self, mut config: SegmentationConfig) -> SegmentationConfig {
        if let Some(beta) = self.beta {
            config.beta = topictrack::BetaPrior::Symmetric(beta);
        }
        if let Some(max_cache) = self.max_cache {
            config.max_cache = max_cache;
        }
        if self.max_topics.is_some() {
            config.max_topics = self.max_topics;
        }
        if let Some(threads) = self.threads {
            config.num_threads = threads;
        }
        config.run_parallel |= self.parallel;
        config
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn build_segmentor(engine: Engine, config: &SegmentationConfig, vocab_size: usize) -> Result<Box<dyn Segmentor>> {
    Ok(match engine {
        Engine::Dp => Box::new(DpSegmentor::new(config, vocab_size)?),
        Engine::Greedy => Box::new(GreedySegmentor::new(config, vocab_size)?),
        Engine::LmDp => Box::new(LanguageModelDp::new(config, vocab_size)?),
    })
}

fn spinner(message: String) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn format_scores(scores: &[Option<f64>]) -> String {
    let parts: Vec<String> = scores
        .iter()
        .map(|s| match s {
            Some(wd) => format!("{:.3}", wd),
            None => "-".to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

fn generate_corpus(
    config: Config,
    output: PathBuf,
    docs: Option<usize>,
    doc_len: Option<usize>,
    vocab: Option<usize>,
    topics: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut synthetic = config.synthetic;
    synthetic.n_docs = docs.unwrap_or(synthetic.n_docs);
    synthetic.doc_len = doc_len.unwrap_or(synthetic.doc_len);
    synthetic.vocab_size = vocab.unwrap_or(synthetic.vocab_size);
    synthetic.n_topics = topics.unwrap_or(synthetic.n_topics);
    synthetic.seed = seed.or(synthetic.seed);

    let generated = SyntheticCorpus::generate(&synthetic)?;
    generated.corpus.save(&output)?;

    println!("✓ Generated {} documents -> {}", generated.corpus.document_count(), output.display());
    for (i, doc) in generated.corpus.documents().iter().enumerate() {
        if let Some(rho) = doc.boundaries() {
            println!("  doc {}: {:?}", i, rho);
        }
    }
    Ok(())
}

fn run_engine(
    engine: Engine,
    config: &SegmentationConfig,
    corpus: &Corpus,
    sink: &mut dyn TraceSink,
) -> Result<SegmentationResult> {
    let segmentor = build_segmentor(engine, config, corpus.vocab_size())?;
    let pb = spinner(format!(
        "Segmenting {} documents with {}...",
        corpus.document_count(),
        segmentor.name()
    ));
    let result = segmentor.segment_with_trace(corpus, sink);
    pb.finish_and_clear();
    result
}

fn segment_corpus(
    input: PathBuf,
    engine: Engine,
    config: SegmentationConfig,
    trace: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let corpus = Corpus::load(&input)?;
    let start_time = Instant::now();

    let result = match &trace {
        Some(path) => {
            let mut sink = WriterSink::new(BufWriter::new(File::create(path)?));
            let result = run_engine(engine, &config, &corpus, &mut sink)?;
            sink.into_inner().flush()?;
            result
        }
        None if verbose => run_engine(engine, &config, &corpus, &mut LogSink)?,
        None => run_engine(engine, &config, &corpus, &mut NullSink)?,
    };

    println!("Segmentation of {}", input.display());
    for (i, rho) in result.boundaries.iter().enumerate() {
        println!("  doc {}: {:?}", i, rho);
    }
    println!("  Log-likelihood: {:.3}", result.log_likelihood);
    println!("  Topics: {}", result.segmentation.len());

    let scores = window_diff_per_document(&result, &corpus)?;
    if scores.iter().any(Option::is_some) {
        println!("  WindowDiff: {}", format_scores(&scores));
    }

    if !result.diagnostics.is_empty() {
        println!("  Cache diagnostics:");
        for d in &result.diagnostics {
            match d.kind {
                DiagnosticKind::BeamTooSmall { required } => println!(
                    "    ({}) doc {}: reference needs a cache of {}",
                    d.position, d.document, required
                ),
                DiagnosticKind::Lost => println!("    ({}) doc {}: reference lost", d.position, d.document),
            }
        }
    }
    if let Some(path) = trace {
        println!("  Trace written to {}", path.display());
    }
    println!("  Elapsed: {}", HumanDuration(start_time.elapsed()));
    Ok(())
}

fn compare_corpus(input: PathBuf, engine: Engine, config: SegmentationConfig) -> Result<()> {
    let corpus = Corpus::load(&input)?;

    let single_start = Instant::now();
    let mut single_scores = Vec::with_capacity(corpus.document_count());
    for single in corpus.single_documents() {
        let result = run_engine(engine, &config, &single, &mut NullSink)?;
        single_scores.extend(window_diff_per_document(&result, &single)?);
    }
    let single_time = single_start.elapsed();

    let multi_start = Instant::now();
    let result = run_engine(engine, &config, &corpus, &mut NullSink)?;
    let multi_scores = window_diff_per_document(&result, &corpus)?;
    let multi_time = multi_start.elapsed();

    println!(
        "Single: {} time: {:.3}s",
        format_scores(&single_scores),
        single_time.as_secs_f64()
    );
    println!(
        "Multi:  {} time: {:.3}s",
        format_scores(&multi_scores),
        multi_time.as_secs_f64()
    );
    Ok(())
}
