//! Sentence clusters: the evidence behind one segment.
//!
//! A cluster owns a set of `(document, sentence)` pairs, possibly spanning
//! several documents, and the running sum of their word-count vectors. The
//! sum is only ever updated incrementally as sentences join.

use crate::corpus::CorpusSource;
use ndarray::{Array1, ArrayView1};
use std::collections::{BTreeMap, BTreeSet};

/// Sentences assigned to one segment and their summed word counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceCluster {
    members: BTreeMap<usize, BTreeSet<usize>>,
    word_counts: Array1<u32>,
}

impl SentenceCluster {
    /// Creates a cluster with no sentences.
    pub fn empty(vocab_size: usize) -> Self {
        Self {
            members: BTreeMap::new(),
            word_counts: Array1::zeros(vocab_size),
        }
    }

    /// Creates a cluster holding sentences `[u_begin, u_end]` of each listed document.
    ///
    /// The range is clipped to each document's length; a document whose last
    /// sentence comes before `u_begin` contributes nothing.
    pub fn create(
        u_begin: usize,
        u_end: usize,
        documents: &[usize],
        source: &dyn CorpusSource,
    ) -> Self {
        let mut cluster = Self::empty(source.vocab_size());
        for &doc in documents {
            cluster.add_sentences(u_begin, u_end, doc, source);
        }
        cluster
    }

    /// Adds sentences `[u_begin, u_end]` of `doc`, clipped to the document length.
    ///
    /// Sentences already in the cluster are not counted twice.
    pub fn add_sentences(&mut self, u_begin: usize, u_end: usize, doc: usize, source: &dyn CorpusSource) {
        let len = source.document_length(doc);
        if len == 0 || u_begin >= len || u_begin > u_end {
            return;
        }
        let last = u_end.min(len - 1);
        let counts = source.word_counts(doc);

        let sentences = self.members.entry(doc).or_default();
        for u in u_begin..=last {
            if sentences.insert(u) {
                self.word_counts += &counts.row(u);
            }
        }
    }

    /// Whether any sentence of `doc` belongs to the cluster.
    #[inline]
    pub fn has_document(&self, doc: usize) -> bool {
        self.members.get(&doc).is_some_and(|s| !s.is_empty())
    }

    /// Summed word counts of every member sentence.
    #[inline]
    pub fn word_counts(&self) -> ArrayView1<'_, u32> {
        self.word_counts.view()
    }

    /// Documents with at least one sentence in the cluster, ascending.
    pub fn documents(&self) -> impl Iterator<Item = usize> + '_ {
        self.members
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(&doc, _)| doc)
    }

    /// Member sentences of `doc`, ascending.
    pub fn sentences(&self, doc: usize) -> impl Iterator<Item = usize> + '_ {
        self.members.get(&doc).into_iter().flat_map(|s| s.iter().copied())
    }

    /// First member sentence of `doc`.
    #[inline]
    pub fn first_sentence(&self, doc: usize) -> Option<usize> {
        self.members.get(&doc).and_then(|s| s.first().copied())
    }

    /// Last member sentence of `doc`.
    #[inline]
    pub fn last_sentence(&self, doc: usize) -> Option<usize> {
        self.members.get(&doc).and_then(|s| s.last().copied())
    }

    /// Total number of member sentences.
    pub fn len(&self) -> usize {
        self.members.values().map(BTreeSet::len).sum()
    }

    /// Whether the cluster has no sentences.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;

    fn corpus() -> Corpus {
        Corpus::from_rows(
            3,
            &[
                vec![vec![1, 0, 0], vec![0, 2, 0], vec![0, 0, 3], vec![1, 1, 1]],
                vec![vec![5, 0, 0], vec![0, 5, 0]],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_create_across_documents() {
        let corpus = corpus();
        let cluster = SentenceCluster::create(0, 1, &[0, 1], &corpus);
        assert_eq!(cluster.word_counts().to_vec(), vec![6, 7, 0]);
        assert!(cluster.has_document(0));
        assert!(cluster.has_document(1));
        assert_eq!(cluster.len(), 4);
    }

    #[test]
    fn test_clips_short_documents() {
        let corpus = corpus();
        // Document 1 has two sentences: [1, 3] clips to [1, 1].
        let cluster = SentenceCluster::create(1, 3, &[0, 1], &corpus);
        assert_eq!(cluster.sentences(1).collect::<Vec<_>>(), vec![1]);
        assert_eq!(cluster.sentences(0).collect::<Vec<_>>(), vec![1, 2, 3]);

        // Starting past the end of document 1 skips it entirely.
        let cluster = SentenceCluster::create(2, 3, &[1], &corpus);
        assert!(cluster.is_empty());
        assert!(!cluster.has_document(1));
        assert_eq!(cluster.word_counts().to_vec(), vec![0, 0, 0]);
    }

    #[test]
    fn test_add_sentences_no_double_count() {
        let corpus = corpus();
        let mut cluster = SentenceCluster::create(0, 1, &[0], &corpus);
        cluster.add_sentences(1, 2, 0, &corpus);
        assert_eq!(cluster.word_counts().to_vec(), vec![1, 2, 3]);
        assert_eq!(cluster.first_sentence(0), Some(0));
        assert_eq!(cluster.last_sentence(0), Some(2));
    }

    #[test]
    fn test_documents_iterator() {
        let corpus = corpus();
        let mut cluster = SentenceCluster::empty(3);
        cluster.add_sentences(1, 1, 1, &corpus);
        cluster.add_sentences(3, 3, 0, &corpus);
        assert_eq!(cluster.documents().collect::<Vec<_>>(), vec![0, 1]);
    }
}
