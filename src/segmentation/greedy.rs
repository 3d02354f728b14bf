//! Greedy segmentation with a bounded cache of candidates.
//!
//! Sentences are consumed position by position, and at each position document
//! by document. Every cached candidate is extended by assigning the sentence
//! to each valid target cluster (the document's current cluster, any later
//! cluster, or a new one). Expanded candidates are ranked by log-likelihood,
//! exact duplicates are dropped and the best `max_cache` survive.

use crate::cluster::SentenceCluster;
use crate::config::SegmentationConfig;
use crate::corpus::{validate_source, CorpusSource};
use crate::error::Result;
use crate::likelihood::SegmentLikelihood;
use crate::segmentation::{trace_candidate, Segmentation, SegmentationResult, Segmentor};
use crate::trace::TraceSink;
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;

/// One candidate held in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Total log-likelihood (−∞ only for the initial placeholder).
    pub log_likelihood: f64,
    /// The candidate segmentation.
    pub segmentation: Segmentation,
    /// Word distribution of every cluster, when topic tracking is enabled.
    pub topics: Option<Vec<Vec<f64>>>,
}

impl CacheEntry {
    fn placeholder() -> Self {
        Self {
            log_likelihood: f64::NEG_INFINITY,
            segmentation: Segmentation::new(),
            topics: None,
        }
    }
}

/// What the reference check found wrong with the beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The reference candidate was generated but ranked past the beam width.
    BeamTooSmall {
        /// Beam width that would have retained it.
        required: usize,
    },
    /// No expanded candidate matches the reference.
    Lost,
}

/// A beam anomaly at one `(position, document)` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDiagnostic {
    /// Sentence position.
    pub position: usize,
    /// Document whose sentence was being assigned.
    pub document: usize,
    /// The anomaly.
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Existing(usize),
    Open,
}

/// Beam-search segmentor.
#[derive(Debug, Clone)]
pub struct GreedySegmentor {
    likelihood: SegmentLikelihood,
    config: SegmentationConfig,
}

impl GreedySegmentor {
    /// Creates a segmentor for a corpus with `vocab_size` words.
    pub fn new(config: &SegmentationConfig, vocab_size: usize) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            likelihood: SegmentLikelihood::from_prior(&config.beta, vocab_size)?,
            config: config.clone(),
        })
    }

    /// The likelihood evaluator.
    pub fn likelihood(&self) -> &SegmentLikelihood {
        &self.likelihood
    }

    /// Clusters that may receive the next sentence of `doc`.
    ///
    /// A document may stay in its current cluster or move to any later one;
    /// a document without clusters may join any. A new cluster is offered
    /// while the candidate has fewer than `max_topics` clusters.
    fn insert_targets(segmentation: &Segmentation, doc: usize, max_topics: usize) -> Vec<Target> {
        let first = segmentation.last_cluster_of(doc).unwrap_or(0);
        let mut targets: Vec<Target> = (first..segmentation.len()).map(Target::Existing).collect();
        if segmentation.len() < max_topics {
            targets.push(Target::Open);
        }
        targets.truncate(max_topics);
        targets
    }

    /// Extends every entry with sentence `u` of `doc` assigned to each valid target.
    fn expand(
        &self,
        entries: &[CacheEntry],
        doc: usize,
        u: usize,
        max_topics: usize,
        source: &dyn CorpusSource,
    ) -> Result<Vec<CacheEntry>> {
        let mut expanded = Vec::with_capacity(entries.len() * 2);
        for entry in entries {
            for target in Self::insert_targets(&entry.segmentation, doc, max_topics) {
                let mut segmentation = entry.segmentation.clone();
                match target {
                    Target::Existing(k) => {
                        if let Some(cluster) = segmentation.cluster_mut(k) {
                            cluster.add_sentences(u, u, doc, source);
                        }
                    }
                    Target::Open => segmentation.push(SentenceCluster::create(u, u, &[doc], source)),
                }
                let log_likelihood = segmentation.log_likelihood(&self.likelihood)?;
                let topics = self
                    .config
                    .track_topics
                    .then(|| segmentation.topic_distributions(&self.likelihood));
                expanded.push(CacheEntry {
                    log_likelihood,
                    segmentation,
                    topics,
                });
            }
        }
        Ok(expanded)
    }

    /// Shards the beam across the pool's workers and concatenates their
    /// expansions in shard order.
    fn expand_parallel(
        &self,
        pool: &ThreadPool,
        beam: &[CacheEntry],
        doc: usize,
        u: usize,
        max_topics: usize,
        source: &dyn CorpusSource,
    ) -> Result<Vec<CacheEntry>> {
        let shard = beam.len().div_ceil(pool.current_num_threads()).max(1);
        let shards = pool.install(|| {
            beam.par_chunks(shard)
                .map(|chunk| self.expand(chunk, doc, u, max_topics, source))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(shards.into_iter().flatten().collect())
    }

    /// Whether `segmentation` reproduces the reference boundaries of
    /// documents `0..=doc` over the sentences up to `u`.
    fn matches_reference(segmentation: &Segmentation, doc: usize, u: usize, source: &dyn CorpusSource) -> bool {
        (0..=doc).all(|d| {
            let Some(reference) = source.reference_boundaries(d) else {
                return false;
            };
            let len = source.document_length(d).min(u + 1);
            if len == 0 {
                return true;
            }
            let mut hyp = segmentation.boundaries(d, len);
            let mut gold = reference[..len].to_vec();
            // The open segment at the end of the prefix counts as closed.
            hyp[len - 1] = 1;
            gold[len - 1] = 1;
            hyp == gold
        })
    }

    /// Reports where the reference candidate sits in the ranked expansion.
    ///
    /// Never changes the beam.
    fn check_cache(
        &self,
        ranked: &[CacheEntry],
        doc: usize,
        u: usize,
        source: &dyn CorpusSource,
    ) -> Option<CacheDiagnostic> {
        if u <= 1 {
            return None;
        }
        if (0..=doc).any(|d| source.reference_boundaries(d).is_none()) {
            debug!("cache check skipped: no reference boundaries for document {}", doc);
            return None;
        }

        let found = ranked
            .iter()
            .position(|entry| Self::matches_reference(&entry.segmentation, doc, u, source));
        let kind = match found {
            None => {
                warn!("lost the reference segmentation at sentence {} of document {}", u, doc);
                DiagnosticKind::Lost
            }
            Some(rank) if rank >= self.config.max_cache => {
                warn!(
                    "cache of {} too small at sentence {} of document {}: reference ranked {}",
                    self.config.max_cache, u, doc, rank
                );
                DiagnosticKind::BeamTooSmall { required: rank + 1 }
            }
            Some(_) => return None,
        };
        Some(CacheDiagnostic {
            position: u,
            document: doc,
            kind,
        })
    }
}

/// Sorts by descending log-likelihood, keeping insertion order on ties, and
/// drops entries whose score equals the preceding one.
fn rank_candidates(mut entries: Vec<CacheEntry>) -> Vec<CacheEntry> {
    entries.sort_by(|a, b| b.log_likelihood.total_cmp(&a.log_likelihood));
    entries.dedup_by(|later, earlier| later.log_likelihood == earlier.log_likelihood);
    entries
}

impl Segmentor for GreedySegmentor {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn segment_with_trace(
        &self,
        source: &dyn CorpusSource,
        sink: &mut dyn TraceSink,
    ) -> Result<SegmentationResult> {
        validate_source(source, self.likelihood.vocab_size())?;

        let n_docs = source.document_count();
        let max_len = source.max_document_length();
        if max_len == 0 {
            return Ok(SegmentationResult::new(Segmentation::new(), 0.0, source));
        }
        let max_topics = self.config.topic_cap(max_len);

        let pool = if self.config.run_parallel {
            Some(ThreadPoolBuilder::new().num_threads(self.config.num_threads).build()?)
        } else {
            None
        };

        let start = Instant::now();
        let mut beam = vec![CacheEntry::placeholder()];
        let mut diagnostics = Vec::new();

        for u in 0..max_len {
            for doc in 0..n_docs {
                if u >= source.document_length(doc) {
                    continue;
                }
                let expanded = match &pool {
                    Some(pool) => self.expand_parallel(pool, &beam, doc, u, max_topics, source)?,
                    None => self.expand(&beam, doc, u, max_topics, source)?,
                };
                let ranked = rank_candidates(expanded);
                if self.config.check_cache {
                    diagnostics.extend(self.check_cache(&ranked, doc, u, source));
                }
                beam = ranked;
                beam.truncate(self.config.max_cache);
            }

            debug!(
                "greedy ({}) {} cached, best ll {:.3}",
                u,
                beam.len(),
                beam.first().map_or(f64::NEG_INFINITY, |e| e.log_likelihood)
            );
            for (rank, entry) in beam.iter().enumerate() {
                trace_candidate(sink, source, u, rank, entry.log_likelihood, &entry.segmentation)?;
            }
            if let Some(topics) = beam.first().and_then(|e| e.topics.as_ref()) {
                for (topic, probabilities) in topics.iter().enumerate() {
                    sink.record_topics(u, topic, probabilities)?;
                }
            }
            sink.end_position(u)?;
        }

        let best = beam.into_iter().next().unwrap_or_else(CacheEntry::placeholder);
        info!(
            "greedy segmentation of {} documents finished in {:?}: ll {:.3}, {} segments, {} diagnostics",
            n_docs,
            start.elapsed(),
            best.log_likelihood,
            best.segmentation.len(),
            diagnostics.len()
        );

        let mut result = SegmentationResult::new(best.segmentation, best.log_likelihood, source);
        result.diagnostics = diagnostics;
        Ok(result)
    }
}
