//! Segmentation quality metrics.

use crate::corpus::CorpusSource;
use crate::error::{Result, TopicTrackError};
use crate::segmentation::SegmentationResult;

/// WindowDiff (Pevzner & Hearst, 2002) between two boundary vectors.
///
/// Slides a window of `k` sentences over both vectors and counts the windows
/// where the number of boundaries differs. Returns the fraction of such
/// windows: 0 for identical segmentations, up to 1.
pub fn window_diff(reference: &[u8], hypothesis: &[u8], k: usize) -> Result<f64> {
    if reference.len() != hypothesis.len() {
        return Err(TopicTrackError::Shape(format!(
            "reference has {} sentences, hypothesis has {}",
            reference.len(),
            hypothesis.len()
        )));
    }
    if reference.is_empty() {
        return Ok(0.0);
    }
    if k == 0 || k > reference.len() {
        return Err(TopicTrackError::Config(format!(
            "window size {} must be between 1 and {}",
            k,
            reference.len()
        )));
    }

    let boundaries = |window: &[u8]| window.iter().filter(|&&b| b != 0).count();
    let windows = reference.len() - k + 1;
    let errors = reference
        .windows(k)
        .zip(hypothesis.windows(k))
        .filter(|(r, h)| boundaries(*r) != boundaries(*h))
        .count();
    Ok(errors as f64 / windows as f64)
}

/// Half the mean segment length of `reference`, at least 1 and at most its length.
pub fn default_window(reference: &[u8]) -> usize {
    if reference.is_empty() {
        return 1;
    }
    let segments = reference.iter().filter(|&&b| b != 0).count() + 1;
    let mean = reference.len() as f64 / segments as f64;
    ((mean / 2.0).round() as usize).clamp(1, reference.len())
}

/// WindowDiff of every document against its reference boundaries.
///
/// Documents without a reference, and empty ones, yield `None`.
pub fn window_diff_per_document(
    result: &SegmentationResult,
    source: &dyn CorpusSource,
) -> Result<Vec<Option<f64>>> {
    if result.boundaries.len() != source.document_count() {
        return Err(TopicTrackError::Shape(format!(
            "result covers {} documents, corpus has {}",
            result.boundaries.len(),
            source.document_count()
        )));
    }
    result
        .boundaries
        .iter()
        .enumerate()
        .map(|(doc, hypothesis)| match source.reference_boundaries(doc) {
            Some(reference) if !reference.is_empty() => {
                window_diff(reference, hypothesis, default_window(reference)).map(Some)
            }
            _ => Ok(None),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Corpus, Document};
    use crate::segmentation::Segmentation;

    #[test]
    fn test_identical_is_zero() {
        let rho = [0, 0, 1, 0, 0, 1, 0, 0];
        assert_eq!(window_diff(&rho, &rho, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_missed_boundary() {
        let reference = [0, 1, 0, 0];
        let hypothesis = [0, 0, 0, 0];
        // Windows [0,1] [1,0] [0,0]: two disagree.
        let wd = window_diff(&reference, &hypothesis, 2).unwrap();
        assert!((wd - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_near_miss_is_cheaper_than_miss() {
        let reference = [0, 0, 1, 0, 0, 0];
        let near = [0, 0, 0, 1, 0, 0];
        let none = [0, 0, 0, 0, 0, 0];
        let near_wd = window_diff(&reference, &near, 3).unwrap();
        let none_wd = window_diff(&reference, &none, 3).unwrap();
        assert!(near_wd < none_wd);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(window_diff(&[0, 1], &[0], 1), Err(TopicTrackError::Shape(_))));
        assert!(matches!(window_diff(&[0, 1], &[0, 1], 0), Err(TopicTrackError::Config(_))));
        assert!(matches!(window_diff(&[0, 1], &[0, 1], 3), Err(TopicTrackError::Config(_))));
        assert_eq!(window_diff(&[], &[], 1).unwrap(), 0.0);
    }

    #[test]
    fn test_default_window() {
        assert_eq!(default_window(&[0, 0, 0, 1, 0, 0, 0, 0]), 2);
        assert_eq!(default_window(&[0; 10]), 5);
        assert_eq!(default_window(&[1, 1, 0]), 1);
        assert_eq!(default_window(&[]), 1);
    }

    #[test]
    fn test_per_document() {
        let with_reference = Document::from_rows(&[vec![1], vec![1], vec![1], vec![1]], 1)
            .unwrap()
            .with_boundaries(vec![0, 1, 0, 0])
            .unwrap();
        let without = Document::from_rows(&[vec![1], vec![1]], 1).unwrap();
        let corpus = Corpus::new(1, vec![with_reference, without]).unwrap();

        let result = SegmentationResult::new(Segmentation::new(), 0.0, &corpus);
        let scores = window_diff_per_document(&result, &corpus).unwrap();
        assert_eq!(scores.len(), 2);
        // Half of a mean segment length of 2 rounds to 1.
        assert!((scores[0].unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(scores[1], None);
    }
}
