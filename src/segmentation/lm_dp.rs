//! Per-document DP over language-model columns.
//!
//! For every document `d`, sentence `u` and segment start `lm`, the cell
//! `dp[d][u][lm]` scores the best prefix ending right before `lm` plus the
//! segment `[lm, u]`. The segment is scored together with the word counts
//! carried for column `lm`, and sentence `u` of every other document joins
//! those counts whenever it strictly raises the segment likelihood. Columns
//! remember the counts that produced their best total so far.
//!
//! With one document nothing is borrowed and the recursion is the exact
//! single-document optimum.

use crate::cluster::SentenceCluster;
use crate::config::SegmentationConfig;
use crate::corpus::{validate_source, CorpusSource};
use crate::error::Result;
use crate::likelihood::{ensure_finite, SegmentLikelihood};
use crate::segmentation::{trace_candidate, Segmentation, SegmentationResult, Segmentor};
use crate::trace::TraceSink;
use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use std::time::Instant;

/// Language-model-column DP segmentor.
#[derive(Debug, Clone)]
pub struct LanguageModelDp {
    likelihood: SegmentLikelihood,
}

/// DP state of one document.
struct DocumentTable {
    /// `prefix[u]` is the sum of rows `0..u`.
    prefix: Array2<u32>,
    /// `scores[u][lm]`.
    scores: Vec<Vec<f64>>,
    /// Best total and carried counts per column.
    carried: Vec<(f64, Array1<u32>)>,
    /// First argmax of `scores[u]`.
    tracker: Vec<usize>,
}

impl DocumentTable {
    fn new(source: &dyn CorpusSource, doc: usize) -> Self {
        let counts = source.word_counts(doc);
        let (len, vocab) = counts.dim();
        let mut prefix = Array2::zeros((len + 1, vocab));
        for (u, row) in counts.axis_iter(Axis(0)).enumerate() {
            let next = &prefix.row(u) + &row;
            prefix.row_mut(u + 1).assign(&next);
        }
        Self {
            prefix,
            scores: (0..len).map(|u| vec![f64::NEG_INFINITY; u + 1]).collect(),
            carried: (0..len).map(|_| (f64::NEG_INFINITY, Array1::zeros(vocab))).collect(),
            tracker: vec![0; len],
        }
    }

    fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Word counts of sentences `[lm, u]`.
    fn segment_counts(&self, lm: usize, u: usize) -> Array1<u32> {
        &self.prefix.row(u + 1) - &self.prefix.row(lm)
    }

    fn best_score(&self, u: usize) -> f64 {
        self.scores[u][self.tracker[u]]
    }

    /// Segments `(start, end)` of the best prefix ending at `last`, in order.
    fn backtrack(&self, last: usize) -> Vec<(usize, usize)> {
        let mut segments = Vec::new();
        let mut u = last;
        loop {
            let start = self.tracker[u];
            segments.push((start, u));
            if start == 0 {
                break;
            }
            u = start - 1;
        }
        segments.reverse();
        segments
    }
}

impl LanguageModelDp {
    /// Creates a segmentor for a corpus with `vocab_size` words.
    pub fn new(config: &SegmentationConfig, vocab_size: usize) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            likelihood: SegmentLikelihood::from_prior(&config.beta, vocab_size)?,
        })
    }

    /// The likelihood evaluator.
    pub fn likelihood(&self) -> &SegmentLikelihood {
        &self.likelihood
    }

    /// Fills column `lm` of row `u` for `doc`.
    fn score_cell(&self, tables: &mut [DocumentTable], source: &dyn CorpusSource, doc: usize, u: usize, lm: usize) {
        let table = &tables[doc];
        let carried = &table.carried[lm].1;
        let base = carried + &table.segment_counts(lm, u);

        let mut borrowed = Array1::<u32>::zeros(base.len());
        let mut segment_ll = self.likelihood.log_likelihood(base.view());
        for other in (0..source.document_count()).filter(|&o| o != doc) {
            if u >= source.document_length(other) {
                continue;
            }
            let row = source.word_counts(other).row(u).to_owned();
            let trial = &base + &borrowed + &row;
            let ll = self.likelihood.log_likelihood(trial.view());
            if ll > segment_ll {
                borrowed += &row;
                segment_ll = ll;
            }
        }

        let previous = match lm {
            0 => 0.0,
            _ => table.best_score(lm - 1),
        };
        let total = previous + segment_ll;

        let table = &mut tables[doc];
        if total > table.carried[lm].0 {
            let counts = &table.carried[lm].1 + &borrowed;
            table.carried[lm] = (total, counts);
        }
        table.scores[u][lm] = total;
    }

    /// Best segmentation of every document's prefix up to `position`.
    fn assemble(tables: &[DocumentTable], source: &dyn CorpusSource, position: usize) -> Result<(f64, Segmentation)> {
        let mut total = 0.0;
        let mut segments = Vec::new();
        for (doc, table) in tables.iter().enumerate() {
            if table.len() == 0 {
                continue;
            }
            let last = position.min(table.len() - 1);
            total += table.best_score(last);
            segments.extend(table.backtrack(last).into_iter().map(|(start, end)| (start, doc, end)));
        }
        segments.sort_unstable();

        let mut segmentation = Segmentation::new();
        for (start, doc, end) in segments {
            segmentation.push(SentenceCluster::create(start, end, &[doc], source));
        }
        Ok((ensure_finite(total, "language-model DP score")?, segmentation))
    }
}

impl Segmentor for LanguageModelDp {
    fn name(&self) -> &'static str {
        "lm-dp"
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

        let start = Instant::now();
        let mut tables: Vec<DocumentTable> = (0..n_docs).map(|doc| DocumentTable::new(source, doc)).collect();

        for u in 0..max_len {
            for lm in 0..=u {
                for doc in 0..n_docs {
                    if u < tables[doc].len() {
                        self.score_cell(&mut tables, source, doc, u, lm);
                    }
                }
            }
            for table in tables.iter_mut().filter(|t| u < t.len()) {
                let row = &table.scores[u];
                // First maximum wins.
                let mut best = 0;
                for (lm, &score) in row.iter().enumerate() {
                    if score > row[best] {
                        best = lm;
                    }
                }
                table.tracker[u] = best;
            }

            let (ll, prefix) = Self::assemble(&tables, source, u)?;
            debug!("lm-dp ({}) ll {:.3} with {} segments", u, ll, prefix.len());
            trace_candidate(sink, source, u, 0, ll, &prefix)?;
            sink.end_position(u)?;
        }

        let (ll, segmentation) = Self::assemble(&tables, source, max_len - 1)?;
        info!(
            "lm-dp segmentation of {} documents finished in {:?}: ll {:.3}, {} segments",
            n_docs,
            start.elapsed(),
            ll,
            segmentation.len()
        );
        Ok(SegmentationResult::new(segmentation, ll, source))
    }
}
