//! # Topictrack - Multi-Document Topic Tracking Segmentation
//!
//! Topictrack segments a collection of related documents into topically
//! coherent runs of sentences, tracking which segments of different documents
//! discuss the same topic.
//!
//! ## Overview
//!
//! Each document is a sequence of sentences, each sentence a vector of word
//! counts. A segmentation assigns every sentence to a segment, and segments of
//! different documents may be merged into one *sentence cluster* that shares a
//! single word distribution. Clusters are scored by the Dirichlet-multinomial
//! marginal likelihood of their pooled word counts; the best segmentation
//! maximises the sum over clusters.
//!
//! ## Key Features
//!
//! - **Exact DP** over segment start/end positions and document subsets
//! - **Greedy beam search** with a bounded candidate cache, optionally sharded
//!   across worker threads
//! - **Language-model-column DP** borrowing counts across documents
//! - **Cache diagnostics** against reference boundaries
//! - **Synthetic corpora** with known boundaries and WindowDiff evaluation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use topictrack::{
//!     CorpusSource, GreedySegmentor, Segmentor, SegmentationConfig, SyntheticConfig, SyntheticCorpus,
//! };
//!
//! let synthetic = SyntheticCorpus::generate(&SyntheticConfig::default())?;
//! let corpus = &synthetic.corpus;
//!
//! let segmentor = GreedySegmentor::new(&SegmentationConfig::default(), corpus.vocab_size())?;
//! let result = segmentor.segment(corpus)?;
//! for rho in &result.boundaries {
//!     println!("{:?}", rho);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`likelihood`] - Dirichlet-multinomial segment likelihood
//! - [`cluster`] - Sentence clusters and their pooled counts
//! - [`segmentation`] - Candidate segmentations and the three engines
//! - [`corpus`] - Corpus access, persistence and synthetic generation
//! - [`trace`] - Observational sinks for likelihood traces
//! - [`eval`] - WindowDiff

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod config;
pub mod corpus;
pub mod dirichlet;
pub mod error;
pub mod eval;
pub mod likelihood;
pub mod segmentation;
pub mod trace;

// Re-export commonly used types
pub use cluster::SentenceCluster;
pub use config::{BetaPrior, Config, SegmentationConfig, SyntheticConfig};
pub use corpus::{Corpus, CorpusSource, Document, SyntheticCorpus};
pub use error::{Result, TopicTrackError};
pub use eval::{default_window, window_diff, window_diff_per_document};
pub use likelihood::SegmentLikelihood;
pub use segmentation::{
    CacheDiagnostic, CacheEntry, DiagnosticKind, DpSegmentor, GreedySegmentor, LanguageModelDp, Segmentation,
    SegmentationResult, Segmentor,
};
pub use trace::{LogSink, MemorySink, NullSink, TraceSink, TraceStep, WriterSink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default symmetric Dirichlet concentration.
pub const DEFAULT_BETA: f64 = 0.6;

/// Default greedy beam width.
pub const DEFAULT_MAX_CACHE: usize = 50;
