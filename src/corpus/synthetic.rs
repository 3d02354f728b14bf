//! Synthetic corpora with known segment boundaries.
//!
//! A collection of related documents is generated from one set of topics.
//! Segment `s` of every document draws its words from the same topic
//! proportions `θ_s`, so documents share topic order but not boundary
//! positions.

use crate::config::SyntheticConfig;
use crate::corpus::{Corpus, Document};
use crate::dirichlet;
use crate::error::{Result, TopicTrackError};
use log::debug;
use ndarray::Array2;
use rand::distributions::{Bernoulli, Distribution};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A generated corpus together with the parameters that produced it.
#[derive(Debug, Clone)]
pub struct SyntheticCorpus {
    /// The generated documents, with reference boundaries attached.
    pub corpus: Corpus,
    /// Topic word distributions (`n_topics` rows).
    pub phi: Vec<Vec<f64>>,
    /// Topic proportions per segment position (shared by all documents).
    pub theta: Vec<Vec<f64>>,
}

impl SyntheticCorpus {
    /// Generates a multi-document corpus.
    pub fn generate(config: &SyntheticConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        // Boundary indicators over the concatenated collection, then the last
        // sentence of every document is forced to close its final segment.
        let coin = Bernoulli::new(config.pi)
            .map_err(|e| TopicTrackError::Config(format!("pi = {}: {}", config.pi, e)))?;
        let mut segment_ends: Vec<Vec<u8>> = (0..config.n_docs)
            .map(|_| {
                let mut rho: Vec<u8> = (0..config.doc_len)
                    .map(|_| coin.sample(&mut rng) as u8)
                    .collect();
                rho[config.doc_len - 1] = 1;
                rho
            })
            .collect();

        let docs_n_segs: Vec<usize> = segment_ends
            .iter()
            .map(|rho| rho.iter().filter(|&&b| b == 1).count())
            .collect();
        let max_segs = docs_n_segs.iter().copied().max().unwrap_or(1);

        let phi = (0..config.n_topics)
            .map(|_| dirichlet::draw_symmetric(config.beta, config.vocab_size, &mut rng))
            .collect::<Result<Vec<_>>>()?;

        let mut theta: Vec<Vec<f64>> = Vec::with_capacity(max_segs);
        for s in 0..max_segs {
            let next = if config.chained && s > 0 {
                dirichlet::draw_chained(config.chain_concentration, &theta[s - 1], &mut rng)?
            } else {
                dirichlet::draw_symmetric(config.alpha, config.n_topics, &mut rng)?
            };
            theta.push(next);
        }

        let mut documents = Vec::with_capacity(config.n_docs);
        for (d, rho) in segment_ends.iter_mut().enumerate() {
            let mut counts = Array2::<u32>::zeros((config.doc_len, config.vocab_size));
            let mut segment = 0;
            for u in 0..config.doc_len {
                for _ in 0..config.sent_len {
                    let z = dirichlet::draw_categorical(&theta[segment], &mut rng)?;
                    let w = dirichlet::draw_categorical(&phi[z], &mut rng)?;
                    counts[[u, w]] += 1;
                }
                if rho[u] == 1 {
                    segment += 1;
                }
            }

            // A boundary after the last sentence carries no information.
            rho[config.doc_len - 1] = 0;
            debug!("synthetic document {}: {} segments", d, docs_n_segs[d]);
            documents.push(Document::new(counts).with_boundaries(rho.clone())?);
        }

        Ok(Self {
            corpus: Corpus::new(config.vocab_size, documents)?,
            phi,
            theta,
        })
    }

    /// A collection of `n_copies` identical copies of `document`.
    pub fn ditto(document: &Document, vocab_size: usize, n_copies: usize) -> Result<Corpus> {
        if n_copies == 0 {
            return Err(TopicTrackError::EmptyInput("ditto corpus needs at least one copy".to_string()));
        }
        Corpus::new(vocab_size, vec![document.clone(); n_copies])
    }
}
