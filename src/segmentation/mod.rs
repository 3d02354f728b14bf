//! Topic-tracking segmentation engines.
//!
//! Three strategies share one candidate representation:
//!
//! - [`DpSegmentor`]: exact dynamic programming over segment end and start
//!   positions, with every document subset considered for a joint boundary.
//! - [`GreedySegmentor`]: sentence-by-sentence beam search over a bounded
//!   cache of candidates, optionally sharded across worker threads.
//! - [`LanguageModelDp`]: per-document DP over language-model columns that
//!   borrows counts from the other documents.
//!
//! Candidates share unchanged clusters between branches through `Arc`; a
//! cluster is copied the first time a branch extends it.

mod dp;
mod greedy;
mod lm_dp;

pub use dp::{DpSegmentor, MAX_DP_DOCUMENTS};
pub use greedy::{CacheDiagnostic, CacheEntry, DiagnosticKind, GreedySegmentor};
pub use lm_dp::LanguageModelDp;

use crate::cluster::SentenceCluster;
use crate::corpus::CorpusSource;
use crate::error::Result;
use crate::likelihood::{ensure_finite, SegmentLikelihood};
use crate::trace::{NullSink, TraceSink, TraceStep};
use std::sync::Arc;

/// An ordered list of sentence clusters covering a prefix of every document.
///
/// For each document, the clusters containing it appear in sentence order and
/// cover a contiguous range starting at sentence 0.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    clusters: Vec<Arc<SentenceCluster>>,
}

impl Segmentation {
    /// Creates an empty segmentation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clusters.
    #[inline]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether there are no clusters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// The clusters, in order.
    pub fn clusters(&self) -> impl Iterator<Item = &SentenceCluster> {
        self.clusters.iter().map(|c| c.as_ref())
    }

    /// Cluster at `index`.
    #[inline]
    pub fn cluster(&self, index: usize) -> Option<&SentenceCluster> {
        self.clusters.get(index).map(|c| c.as_ref())
    }

    /// Mutable access to the cluster at `index`.
    ///
    /// Copies the cluster first if another candidate still shares it.
    pub fn cluster_mut(&mut self, index: usize) -> Option<&mut SentenceCluster> {
        self.clusters.get_mut(index).map(Arc::make_mut)
    }

    /// Appends a cluster.
    pub fn push(&mut self, cluster: SentenceCluster) {
        self.clusters.push(Arc::new(cluster));
    }

    /// Whether `self` and `other` hold the very same cluster allocation at `index`.
    pub fn shares_cluster(&self, other: &Segmentation, index: usize) -> bool {
        match (self.clusters.get(index), other.clusters.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Index of the last cluster containing `doc`.
    pub fn last_cluster_of(&self, doc: usize) -> Option<usize> {
        self.clusters.iter().rposition(|c| c.has_document(doc))
    }

    /// Number of segments assigned to `doc`.
    pub fn segment_count(&self, doc: usize) -> usize {
        self.clusters.iter().filter(|c| c.has_document(doc)).count()
    }

    /// Boundary vector of `doc` over its first `len` sentences.
    ///
    /// Entry `u` is 1 when a segment of `doc` ends at sentence `u`; the last
    /// entry is always 0.
    pub fn boundaries(&self, doc: usize, len: usize) -> Vec<u8> {
        let mut rho = vec![0u8; len];
        for cluster in self.clusters() {
            if let Some(last) = cluster.last_sentence(doc) {
                if last < len {
                    rho[last] = 1;
                }
            }
        }
        if let Some(end) = rho.last_mut() {
            *end = 0;
        }
        rho
    }

    /// Boundary vectors of every document over the sentences up to `position`.
    pub fn prefix_boundaries(&self, source: &dyn CorpusSource, position: usize) -> Vec<Vec<u8>> {
        (0..source.document_count())
            .map(|doc| self.boundaries(doc, source.document_length(doc).min(position + 1)))
            .collect()
    }

    /// Sum of the segment log-likelihoods of every cluster.
    ///
    /// Fails on a NaN or infinite total.
    pub fn log_likelihood(&self, likelihood: &SegmentLikelihood) -> Result<f64> {
        let total: f64 = self
            .clusters()
            .map(|c| likelihood.log_likelihood(c.word_counts()))
            .sum();
        ensure_finite(total, "segmentation log-likelihood")
    }

    /// Posterior mean word distribution of every cluster.
    pub fn topic_distributions(&self, likelihood: &SegmentLikelihood) -> Vec<Vec<f64>> {
        self.clusters()
            .map(|c| likelihood.topic_distribution(c.word_counts()))
            .collect()
    }

    /// Difference between the largest and smallest per-document segment count.
    pub fn segment_count_spread(&self, n_docs: usize) -> usize {
        let counts: Vec<usize> = (0..n_docs).map(|d| self.segment_count(d)).collect();
        match (counts.iter().max(), counts.iter().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }
}

/// Outcome of a segmentation run.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// The winning candidate.
    pub segmentation: Segmentation,
    /// Its total log-likelihood.
    pub log_likelihood: f64,
    /// One boundary vector per document, last entry 0.
    pub boundaries: Vec<Vec<u8>>,
    /// Beam diagnostics raised during the run (greedy engine only).
    pub diagnostics: Vec<CacheDiagnostic>,
}

impl SegmentationResult {
    /// Builds a result from a finished candidate.
    pub fn new(segmentation: Segmentation, log_likelihood: f64, source: &dyn CorpusSource) -> Self {
        let boundaries = (0..source.document_count())
            .map(|doc| segmentation.boundaries(doc, source.document_length(doc)))
            .collect();
        Self {
            segmentation,
            log_likelihood,
            boundaries,
            diagnostics: Vec::new(),
        }
    }

    /// Every document's boundary vector, concatenated.
    pub fn all_boundaries(&self) -> Vec<u8> {
        self.boundaries.iter().flatten().copied().collect()
    }
}

/// A segmentation strategy.
pub trait Segmentor {
    /// Short name used in logs and the CLI.
    fn name(&self) -> &'static str;

    /// Segments every document of `source`, reporting progress to `sink`.
    fn segment_with_trace(
        &self,
        source: &dyn CorpusSource,
        sink: &mut dyn TraceSink,
    ) -> Result<SegmentationResult>;

    /// Segments every document of `source`.
    fn segment(&self, source: &dyn CorpusSource) -> Result<SegmentationResult> {
        self.segment_with_trace(source, &mut NullSink)
    }
}

/// Reports one ranked candidate to a sink.
pub(crate) fn trace_candidate(
    sink: &mut dyn TraceSink,
    source: &dyn CorpusSource,
    position: usize,
    rank: usize,
    log_likelihood: f64,
    segmentation: &Segmentation,
) -> Result<()> {
    sink.record_step(&TraceStep {
        position,
        rank,
        log_likelihood,
        boundaries: segmentation.prefix_boundaries(source, position),
    })
}
