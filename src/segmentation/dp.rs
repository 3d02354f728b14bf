//! Exact dynamic-programming segmentation over one or several documents.
//!
//! `table[u_end][k]` holds the highest-likelihood segmentation of every
//! document's sentences up to `u_end` that uses exactly `k` clusters. Row
//! `u_end` is built from every entry of row `u_begin - 1` for every start
//! position `u_begin`, letting each non-empty subset of documents open a new
//! segment at `u_begin` while the others extend their current one. Keeping one
//! entry per cluster count keeps the search exact under `max_topics`.
//! The cost is `O(max_len² · max_topics · 2^n_docs)`, which restricts the exact
//! search to small document counts.

use crate::cluster::SentenceCluster;
use crate::config::SegmentationConfig;
use crate::corpus::{validate_source, CorpusSource};
use crate::error::{Result, TopicTrackError};
use crate::likelihood::SegmentLikelihood;
use crate::segmentation::{trace_candidate, Segmentation, SegmentationResult, Segmentor};
use crate::trace::TraceSink;
use log::{debug, info};
use std::time::Instant;

/// Largest document count the subset enumeration accepts.
pub const MAX_DP_DOCUMENTS: usize = 16;

/// Exact DP segmentor.
#[derive(Debug, Clone)]
pub struct DpSegmentor {
    likelihood: SegmentLikelihood,
    config: SegmentationConfig,
}

impl DpSegmentor {
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

    /// Extends `base` with sentences `[u_begin, u_end]` of every document.
    ///
    /// Documents in `openers` (and documents not yet in any cluster) move to
    /// the cluster after their current one, joining it when another document
    /// already opened it and creating it otherwise. The rest extend their
    /// current cluster.
    fn extend(
        &self,
        base: &Segmentation,
        u_begin: usize,
        u_end: usize,
        openers: &[usize],
        source: &dyn CorpusSource,
    ) -> Segmentation {
        let mut candidate = base.clone();
        let mut opening = Vec::with_capacity(source.document_count());

        for doc in 0..source.document_count() {
            if u_begin >= source.document_length(doc) {
                continue;
            }
            match candidate.last_cluster_of(doc) {
                Some(k) if !openers.contains(&doc) => {
                    if let Some(cluster) = candidate.cluster_mut(k) {
                        cluster.add_sentences(u_begin, u_end, doc, source);
                    }
                }
                _ => opening.push(doc),
            }
        }

        for doc in opening {
            let target = candidate.last_cluster_of(doc).map_or(0, |k| k + 1);
            match candidate.cluster_mut(target) {
                Some(cluster) => cluster.add_sentences(u_begin, u_end, doc, source),
                None => candidate.push(SentenceCluster::create(u_begin, u_end, &[doc], source)),
            }
        }
        candidate
    }

    /// Among the two lowest-likelihood final candidates, picks the one whose
    /// per-document segment counts are most balanced.
    ///
    /// On an equal spread the lowest-likelihood candidate is kept.
    fn balance_segment_counts(
        &self,
        mut finals: Vec<(f64, Segmentation)>,
        n_docs: usize,
    ) -> Option<(f64, Segmentation)> {
        finals.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut lowest = finals.into_iter().take(2);
        let first = lowest.next()?;
        match lowest.next() {
            Some(second)
                if second.1.segment_count_spread(n_docs) < first.1.segment_count_spread(n_docs) =>
            {
                Some(second)
            }
            _ => Some(first),
        }
    }
}

/// Best segmentation ending at one position with a given cluster count.
struct Cell {
    log_likelihood: f64,
    /// Evaluation order, used to break likelihood ties across cluster counts.
    order: usize,
    segmentation: Segmentation,
}

impl Segmentor for DpSegmentor {
    fn name(&self) -> &'static str {
        "dp"
    }

    fn segment_with_trace(
        &self,
        source: &dyn CorpusSource,
        sink: &mut dyn TraceSink,
    ) -> Result<SegmentationResult> {
        validate_source(source, self.likelihood.vocab_size())?;

        let n_docs = source.document_count();
        if n_docs > MAX_DP_DOCUMENTS {
            return Err(TopicTrackError::Config(format!(
                "exact DP enumerates 2^n document subsets; {} documents exceed the limit of {}",
                n_docs, MAX_DP_DOCUMENTS
            )));
        }
        let max_len = source.max_document_length();
        if max_len == 0 {
            return Ok(SegmentationResult::new(Segmentation::new(), 0.0, source));
        }
        // A segmentation never holds more clusters than there are sentences.
        let total_sentences: usize = (0..n_docs).map(|d| source.document_length(d)).sum();
        let max_topics = self.config.topic_cap(max_len).min(total_sentences);

        let subsets: Vec<Vec<usize>> = (1u32..(1u32 << n_docs))
            .map(|mask| (0..n_docs).filter(|&d| mask & (1 << d) != 0).collect())
            .collect();

        let start = Instant::now();
        let empty = Segmentation::new();
        let mut table: Vec<Vec<Option<Cell>>> = Vec::with_capacity(max_len);
        let mut order = 0usize;
        let mut result = None;

        for u_end in 0..max_len {
            let last_position = u_end + 1 == max_len;
            let collect_finals = self.config.min_seg_diff && last_position;
            let mut finals = Vec::new();
            let mut row: Vec<Option<Cell>> = (0..=max_topics).map(|_| None).collect();

            for u_begin in 0..=u_end {
                let bases: Vec<&Segmentation> = match u_begin {
                    0 => vec![&empty],
                    _ => table[u_begin - 1].iter().flatten().map(|cell| &cell.segmentation).collect(),
                };
                for base in bases {
                    for openers in &subsets {
                        let candidate = self.extend(base, u_begin, u_end, openers, source);
                        let k = candidate.len();
                        if k > max_topics {
                            continue;
                        }
                        let ll = candidate.log_likelihood(&self.likelihood)?;
                        order += 1;

                        // Non-strict: on an exact tie the last evaluated candidate wins.
                        if row[k].as_ref().map_or(true, |cell| ll >= cell.log_likelihood) {
                            row[k] = Some(Cell {
                                log_likelihood: ll,
                                order,
                                segmentation: candidate.clone(),
                            });
                        }
                        if collect_finals {
                            finals.push((ll, candidate));
                        }
                    }
                }
            }

            let mut best_here = row
                .iter()
                .flatten()
                .max_by(|a, b| {
                    a.log_likelihood
                        .total_cmp(&b.log_likelihood)
                        .then(a.order.cmp(&b.order))
                })
                .map(|cell| (cell.log_likelihood, cell.segmentation.clone()));
            if collect_finals {
                best_here = self.balance_segment_counts(finals, n_docs).or(best_here);
            }
            let (ll, segmentation) = best_here.ok_or_else(|| {
                TopicTrackError::Config(format!(
                    "no candidate fits max_topics = {} at sentence {}",
                    max_topics, u_end
                ))
            })?;

            debug!("dp ({}) best ll {:.3} with {} segments", u_end, ll, segmentation.len());
            trace_candidate(sink, source, u_end, 0, ll, &segmentation)?;
            sink.end_position(u_end)?;
            table.push(row);
            result = Some((ll, segmentation));
        }

        let (ll, segmentation) = result.unwrap_or_default();
        info!(
            "dp segmentation of {} documents finished in {:?}: ll {:.3}, {} segments",
            n_docs,
            start.elapsed(),
            ll,
            segmentation.len()
        );
        Ok(SegmentationResult::new(segmentation, ll, source))
    }
}
