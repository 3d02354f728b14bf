//! Corpus data source.
//!
//! Engines only see documents through [`CorpusSource`]: per-document
//! sentence-by-word count matrices, lengths, and optional reference
//! boundaries used for diagnostics and evaluation.

pub mod synthetic;

pub use synthetic::SyntheticCorpus;

use crate::error::{Result, TopicTrackError};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Read access to a collection of bag-of-words documents.
pub trait CorpusSource: Sync {
    /// Number of documents.
    fn document_count(&self) -> usize;

    /// Number of sentences in `doc`.
    fn document_length(&self, doc: usize) -> usize;

    /// Sentence-by-word count matrix of `doc`.
    fn word_counts(&self, doc: usize) -> ArrayView2<'_, u32>;

    /// Vocabulary size shared by all documents.
    fn vocab_size(&self) -> usize;

    /// Length of the longest document.
    fn max_document_length(&self) -> usize {
        (0..self.document_count())
            .map(|d| self.document_length(d))
            .max()
            .unwrap_or(0)
    }

    /// Reference boundary vector of `doc`, when known.
    fn reference_boundaries(&self, _doc: usize) -> Option<&[u8]> {
        None
    }

    /// Word counts of sentence `u` of `doc`.
    fn sentence(&self, doc: usize, u: usize) -> ArrayView1<'_, u32> {
        self.word_counts(doc).index_axis_move(Axis(0), u)
    }
}

/// Fail-fast check run by every engine before its first step.
///
/// Verifies the vocabulary size against the prior and that every document's
/// count matrix has the declared shape.
pub fn validate_source(source: &dyn CorpusSource, vocab_size: usize) -> Result<()> {
    if source.vocab_size() != vocab_size {
        return Err(TopicTrackError::Config(format!(
            "prior covers {} words but the corpus vocabulary has {}",
            vocab_size,
            source.vocab_size()
        )));
    }

    let max_len = source.max_document_length();
    for doc in 0..source.document_count() {
        let len = source.document_length(doc);
        if len > max_len {
            return Err(TopicTrackError::Shape(format!(
                "document {} has {} sentences, more than the declared maximum {}",
                doc, len, max_len
            )));
        }
        let counts = source.word_counts(doc);
        if counts.nrows() != len || counts.ncols() != vocab_size {
            return Err(TopicTrackError::Shape(format!(
                "document {} count matrix is {}x{}, expected {}x{}",
                doc,
                counts.nrows(),
                counts.ncols(),
                len,
                vocab_size
            )));
        }
    }
    Ok(())
}

/// One document: a sentence-by-word count matrix and optional reference boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    word_counts: Array2<u32>,
    boundaries: Option<Vec<u8>>,
}

impl Document {
    /// Creates a document from its count matrix.
    pub fn new(word_counts: Array2<u32>) -> Self {
        Self {
            word_counts,
            boundaries: None,
        }
    }

    /// Creates a document from one count vector per sentence.
    pub fn from_rows(rows: &[Vec<u32>], vocab_size: usize) -> Result<Self> {
        let mut flat = Vec::with_capacity(rows.len() * vocab_size);
        for (u, row) in rows.iter().enumerate() {
            if row.len() != vocab_size {
                return Err(TopicTrackError::Shape(format!(
                    "sentence {} has {} word counts, expected {}",
                    u,
                    row.len(),
                    vocab_size
                )));
            }
            flat.extend_from_slice(row);
        }
        let word_counts = Array2::from_shape_vec((rows.len(), vocab_size), flat)
            .map_err(|e| TopicTrackError::Shape(e.to_string()))?;
        Ok(Self::new(word_counts))
    }

    /// Attaches reference boundaries (one 0/1 entry per sentence).
    pub fn with_boundaries(mut self, boundaries: Vec<u8>) -> Result<Self> {
        if boundaries.len() != self.len() {
            return Err(TopicTrackError::Shape(format!(
                "boundary vector has {} entries for {} sentences",
                boundaries.len(),
                self.len()
            )));
        }
        if let Some(bad) = boundaries.iter().find(|&&b| b > 1) {
            return Err(TopicTrackError::Shape(format!("boundary value {} is not 0 or 1", bad)));
        }
        self.boundaries = Some(boundaries);
        Ok(self)
    }

    /// Number of sentences.
    #[inline]
    pub fn len(&self) -> usize {
        self.word_counts.nrows()
    }

    /// Whether the document has no sentences.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sentence-by-word count matrix.
    #[inline]
    pub fn word_counts(&self) -> ArrayView2<'_, u32> {
        self.word_counts.view()
    }

    /// Reference boundaries, if attached.
    #[inline]
    pub fn boundaries(&self) -> Option<&[u8]> {
        self.boundaries.as_deref()
    }
}

/// An in-memory collection of documents over one vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    vocab_size: usize,
    documents: Vec<Document>,
}

impl Corpus {
    /// Creates a corpus, checking every document against the vocabulary size.
    pub fn new(vocab_size: usize, documents: Vec<Document>) -> Result<Self> {
        if vocab_size == 0 {
            return Err(TopicTrackError::Config("vocabulary size must be positive".to_string()));
        }
        for (i, doc) in documents.iter().enumerate() {
            if doc.word_counts.ncols() != vocab_size {
                return Err(TopicTrackError::Shape(format!(
                    "document {} has {} vocabulary columns, expected {}",
                    i,
                    doc.word_counts.ncols(),
                    vocab_size
                )));
            }
        }
        Ok(Self {
            vocab_size,
            documents,
        })
    }

    /// Builds a corpus from nested count rows, one `Vec<Vec<u32>>` per document.
    pub fn from_rows(vocab_size: usize, docs: &[Vec<Vec<u32>>]) -> Result<Self> {
        let documents = docs
            .iter()
            .map(|rows| Document::from_rows(rows, vocab_size))
            .collect::<Result<Vec<_>>>()?;
        Self::new(vocab_size, documents)
    }

    /// The documents.
    #[inline]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Splits the collection into one single-document corpus per document.
    pub fn single_documents(&self) -> Vec<Corpus> {
        self.documents
            .iter()
            .map(|doc| Corpus {
                vocab_size: self.vocab_size,
                documents: vec![doc.clone()],
            })
            .collect()
    }

    /// Loads a corpus from its JSON file format.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TopicTrackError::FileNotFound(path.to_path_buf()));
        }
        let file: CorpusFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        file.into_corpus()
    }

    /// Saves the corpus in its JSON file format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string(&CorpusFile::from(self))?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl CorpusSource for Corpus {
    fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn document_length(&self, doc: usize) -> usize {
        self.documents[doc].len()
    }

    fn word_counts(&self, doc: usize) -> ArrayView2<'_, u32> {
        self.documents[doc].word_counts()
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn reference_boundaries(&self, doc: usize) -> Option<&[u8]> {
        self.documents.get(doc).and_then(Document::boundaries)
    }
}

/// On-disk corpus representation.
#[derive(Debug, Serialize, Deserialize)]
struct CorpusFile {
    vocab_size: usize,
    documents: Vec<DocumentFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentFile {
    word_counts: Vec<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    boundaries: Option<Vec<u8>>,
}

impl CorpusFile {
    fn into_corpus(self) -> Result<Corpus> {
        let documents = self
            .documents
            .into_iter()
            .map(|d| {
                let doc = Document::from_rows(&d.word_counts, self.vocab_size)?;
                match d.boundaries {
                    Some(b) => doc.with_boundaries(b),
                    None => Ok(doc),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Corpus::new(self.vocab_size, documents)
    }
}

impl From<&Corpus> for CorpusFile {
    fn from(corpus: &Corpus) -> Self {
        let documents = corpus
            .documents
            .iter()
            .map(|d| DocumentFile {
                word_counts: d.word_counts.rows().into_iter().map(|r| r.to_vec()).collect(),
                boundaries: d.boundaries.clone(),
            })
            .collect();
        Self {
            vocab_size: corpus.vocab_size,
            documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Corpus {
        Corpus::from_rows(
            2,
            &[
                vec![vec![1, 0], vec![0, 2], vec![0, 1]],
                vec![vec![3, 0]],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_source_contract() {
        let corpus = sample();
        assert_eq!(corpus.document_count(), 2);
        assert_eq!(corpus.document_length(0), 3);
        assert_eq!(corpus.document_length(1), 1);
        assert_eq!(corpus.max_document_length(), 3);
        assert_eq!(corpus.sentence(0, 1).to_vec(), vec![0, 2]);
        assert!(corpus.reference_boundaries(0).is_none());
    }

    #[test]
    fn test_sentence_views_borrow_the_source() {
        fn first_sentences(source: &dyn CorpusSource) -> Vec<ArrayView1<'_, u32>> {
            (0..source.document_count()).map(|d| source.sentence(d, 0)).collect()
        }
        let corpus = sample();
        let rows = first_sentences(&corpus);
        assert_eq!(rows[0].to_vec(), vec![1, 0]);
        assert_eq!(rows[1].to_vec(), vec![3, 0]);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Corpus::from_rows(2, &[vec![vec![1, 0], vec![1]]]).unwrap_err();
        assert!(matches!(err, TopicTrackError::Shape(_)));
    }

    #[test]
    fn test_boundaries_validation() {
        let doc = Document::from_rows(&[vec![1], vec![1]], 1).unwrap();
        assert!(doc.clone().with_boundaries(vec![1]).is_err());
        assert!(doc.clone().with_boundaries(vec![2, 0]).is_err());
        let doc = doc.with_boundaries(vec![1, 0]).unwrap();
        assert_eq!(doc.boundaries(), Some(&[1u8, 0][..]));
    }

    #[test]
    fn test_validate_source_vocab_mismatch() {
        let corpus = sample();
        assert!(validate_source(&corpus, 2).is_ok());
        assert!(matches!(validate_source(&corpus, 3), Err(TopicTrackError::Config(_))));
    }

    #[test]
    fn test_single_documents() {
        let singles = sample().single_documents();
        assert_eq!(singles.len(), 2);
        assert_eq!(singles[1].document_count(), 1);
        assert_eq!(singles[1].document_length(0), 1);
    }
}
