//! Configuration for the topic-tracking segmentation engines.

use crate::error::{Result, TopicTrackError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration for a segmentation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Segmentation engine configuration.
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Synthetic corpus generator configuration.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TopicTrackError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Checks every section for values no run could accept.
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        self.synthetic.validate()
    }
}

/// Dirichlet prior over the vocabulary.
///
/// Either one value shared by every word or an explicit vector whose length
/// must equal the vocabulary size of the corpus being segmented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BetaPrior {
    /// Symmetric prior: the same concentration for every word.
    Symmetric(f64),
    /// One concentration per vocabulary entry.
    Vector(Vec<f64>),
}

impl Default for BetaPrior {
    fn default() -> Self {
        BetaPrior::Symmetric(0.6)
    }
}

impl BetaPrior {
    /// Expands the prior to a vector of length `vocab_size`.
    ///
    /// Fails when an entry is not strictly positive and finite, or when an
    /// explicit vector does not match the vocabulary size.
    pub fn resolve(&self, vocab_size: usize) -> Result<Vec<f64>> {
        if vocab_size == 0 {
            return Err(TopicTrackError::Config("vocabulary size must be positive".to_string()));
        }
        let beta = match self {
            BetaPrior::Symmetric(value) => vec![*value; vocab_size],
            BetaPrior::Vector(values) => {
                if values.len() != vocab_size {
                    return Err(TopicTrackError::Config(format!(
                        "prior has {} entries but the vocabulary has {} words",
                        values.len(),
                        vocab_size
                    )));
                }
                values.clone()
            }
        };
        check_positive(&beta)?;
        Ok(beta)
    }

    fn validate(&self) -> Result<()> {
        match self {
            BetaPrior::Symmetric(value) => check_positive(std::slice::from_ref(value)),
            BetaPrior::Vector(values) if values.is_empty() => {
                Err(TopicTrackError::Config("prior vector is empty".to_string()))
            }
            BetaPrior::Vector(values) => check_positive(values),
        }
    }
}

fn check_positive(values: &[f64]) -> Result<()> {
    for (i, &v) in values.iter().enumerate() {
        if !(v.is_finite() && v > 0.0) {
            return Err(TopicTrackError::Config(format!(
                "prior entry {} is {}, must be positive and finite",
                i, v
            )));
        }
    }
    Ok(())
}

/// Segmentation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Dirichlet prior over words.
    /// Default: symmetric 0.6.
    pub beta: BetaPrior,

    /// Maximum number of clusters (topics) a candidate may hold.
    /// Default: None (the longest document length).
    pub max_topics: Option<usize>,

    /// Beam width of the greedy engine.
    /// Default: 50.
    pub max_cache: usize,

    /// Shard the greedy beam expansion across worker threads.
    /// Default: false.
    pub run_parallel: bool,

    /// Number of worker threads for the parallel path.
    /// Default: 0 (use all available cores).
    pub num_threads: usize,

    /// Check the beam against reference boundaries after every step.
    /// Observational only; requires reference boundaries in the corpus.
    /// Default: false.
    pub check_cache: bool,

    /// At the last DP position, prefer the candidate whose segment counts
    /// are most balanced across documents.
    /// Default: false.
    pub min_seg_diff: bool,

    /// Keep per-topic word distributions with every greedy cache entry and
    /// report them to the trace sink.
    /// Default: false.
    pub track_topics: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            beta: BetaPrior::default(),
            max_topics: None,
            max_cache: 50,
            run_parallel: false,
            num_threads: 0,
            check_cache: false,
            min_seg_diff: false,
            track_topics: false,
        }
    }
}

impl SegmentationConfig {
    /// Validates the parts of the configuration that do not depend on a corpus.
    pub fn validate(&self) -> Result<()> {
        self.beta.validate()?;
        if self.max_cache == 0 {
            return Err(TopicTrackError::Config("max_cache must be at least 1".to_string()));
        }
        if self.max_topics == Some(0) {
            return Err(TopicTrackError::Config("max_topics must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Effective topic cap for a corpus whose longest document has `max_doc_len` sentences.
    #[inline]
    pub fn topic_cap(&self, max_doc_len: usize) -> usize {
        self.max_topics.unwrap_or(max_doc_len).max(1)
    }
}

/// Synthetic corpus generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Number of related documents.
    /// Default: 3.
    pub n_docs: usize,

    /// Sentences per document.
    /// Default: 20.
    pub doc_len: usize,

    /// Words per sentence.
    /// Default: 5.
    pub sent_len: usize,

    /// Vocabulary size.
    /// Default: 10.
    pub vocab_size: usize,

    /// Number of topics.
    /// Default: 6.
    pub n_topics: usize,

    /// Probability that a sentence ends a segment.
    /// Default: 0.2.
    pub pi: f64,

    /// Dirichlet prior over topic proportions.
    /// Default: 0.1.
    pub alpha: f64,

    /// Dirichlet prior over topic word distributions.
    /// Default: 0.6.
    pub beta: f64,

    /// Draw each segment's topic proportions from a Dirichlet centred on the
    /// previous segment's proportions instead of independently.
    /// Default: false.
    pub chained: bool,

    /// Concentration of the chain: `θ_s ~ Dir(chain_concentration · θ_{s-1})`.
    /// Default: 10.0.
    pub chain_concentration: f64,

    /// Random seed for reproducibility.
    /// Default: None (random).
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_docs: 3,
            doc_len: 20,
            sent_len: 5,
            vocab_size: 10,
            n_topics: 6,
            pi: 0.2,
            alpha: 0.1,
            beta: 0.6,
            chained: false,
            chain_concentration: 10.0,
            seed: None,
        }
    }
}

impl SyntheticConfig {
    /// Validates generator parameters.
    pub fn validate(&self) -> Result<()> {
        if self.n_docs == 0 || self.doc_len == 0 || self.sent_len == 0 {
            return Err(TopicTrackError::Config(
                "n_docs, doc_len and sent_len must be positive".to_string(),
            ));
        }
        if self.vocab_size == 0 || self.n_topics == 0 {
            return Err(TopicTrackError::Config(
                "vocab_size and n_topics must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pi) {
            return Err(TopicTrackError::Config(format!("pi = {} is not a probability", self.pi)));
        }
        check_positive(&[self.alpha, self.beta, self.chain_concentration])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.segmentation.max_cache, 50);
        assert_eq!(config.segmentation.beta, BetaPrior::Symmetric(0.6));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_symmetric() {
        let beta = BetaPrior::Symmetric(0.5).resolve(4).unwrap();
        assert_eq!(beta, vec![0.5; 4]);
    }

    #[test]
    fn test_resolve_rejects_mismatch() {
        let prior = BetaPrior::Vector(vec![0.5, 0.5]);
        assert!(matches!(prior.resolve(3), Err(TopicTrackError::Config(_))));
    }

    #[test]
    fn test_resolve_rejects_non_positive() {
        assert!(BetaPrior::Symmetric(0.0).resolve(3).is_err());
        assert!(BetaPrior::Vector(vec![0.5, -1.0]).resolve(2).is_err());
        assert!(BetaPrior::Symmetric(f64::NAN).resolve(2).is_err());
    }

    #[test]
    fn test_topic_cap() {
        let mut config = SegmentationConfig::default();
        assert_eq!(config.topic_cap(12), 12);
        config.max_topics = Some(3);
        assert_eq!(config.topic_cap(12), 3);
        config.max_topics = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_beta_prior_json() {
        let config: SegmentationConfig =
            serde_json::from_str(r#"{ "beta": [0.1, 0.2, 0.3], "max_cache": 8 }"#).unwrap();
        assert_eq!(config.beta, BetaPrior::Vector(vec![0.1, 0.2, 0.3]));
        assert_eq!(config.max_cache, 8);
        assert!(!config.run_parallel);
    }
}
