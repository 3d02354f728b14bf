//! Dirichlet-multinomial segment likelihood.
//!
//! A segment's word counts `c` are scored by their marginal likelihood with
//! the segment's word distribution integrated out under a Dirichlet prior `β`:
//!
//! ```text
//! ll(c) = [lnΓ(Σβ) − Σ lnΓ(β_i)] + Σ lnΓ(c_i + β_i) − lnΓ(Σ(c_i + β_i))
//! ```
//!
//! The bracketed term only depends on `β` and is computed once.

use crate::config::BetaPrior;
use crate::dirichlet;
use crate::error::{Result, TopicTrackError};
use ndarray::ArrayView1;
use statrs::function::gamma::ln_gamma;

/// Closed-form log marginal likelihood of word counts under a Dirichlet prior.
#[derive(Debug, Clone)]
pub struct SegmentLikelihood {
    beta: Vec<f64>,
    beta_sum: f64,
    constant: f64,
}

impl SegmentLikelihood {
    /// Creates an evaluator for the given prior vector.
    ///
    /// Every entry must be strictly positive and finite.
    pub fn new(beta: Vec<f64>) -> Result<Self> {
        if beta.is_empty() {
            return Err(TopicTrackError::Config("prior vector is empty".to_string()));
        }
        if let Some((i, v)) = beta.iter().enumerate().find(|(_, v)| !(v.is_finite() && **v > 0.0)) {
            return Err(TopicTrackError::Config(format!(
                "prior entry {} is {}, must be positive and finite",
                i, v
            )));
        }

        let beta_sum: f64 = beta.iter().sum();
        let constant = ln_gamma(beta_sum) - beta.iter().map(|&b| ln_gamma(b)).sum::<f64>();

        Ok(Self {
            beta,
            beta_sum,
            constant,
        })
    }

    /// Creates an evaluator from a configured prior and a vocabulary size.
    pub fn from_prior(prior: &BetaPrior, vocab_size: usize) -> Result<Self> {
        Self::new(prior.resolve(vocab_size)?)
    }

    /// Vocabulary size the prior was built for.
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.beta.len()
    }

    /// The prior vector.
    #[inline]
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// The cached normalisation term `lnΓ(Σβ) − Σ lnΓ(β_i)`.
    #[inline]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Log marginal likelihood of one segment's word counts.
    ///
    /// `counts` must have one entry per vocabulary word.
    pub fn log_likelihood(&self, counts: ArrayView1<'_, u32>) -> f64 {
        debug_assert_eq!(counts.len(), self.beta.len());

        let mut total = 0.0;
        let mut f1 = 0.0;
        for (&c, &b) in counts.iter().zip(self.beta.iter()) {
            let shifted = c as f64 + b;
            f1 += ln_gamma(shifted);
            total += c as f64;
        }
        self.constant + f1 - ln_gamma(total + self.beta_sum)
    }

    /// Log-likelihood of a plain count slice.
    #[inline]
    pub fn log_likelihood_slice(&self, counts: &[u32]) -> f64 {
        self.log_likelihood(ArrayView1::from(counts))
    }

    /// Posterior mean word distribution of a segment with these counts.
    pub fn topic_distribution(&self, counts: ArrayView1<'_, u32>) -> Vec<f64> {
        dirichlet::posterior_mean(counts, &self.beta)
    }
}

/// Fails when a log-likelihood is NaN or infinite.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TopicTrackError::Numeric(format!("{} evaluated to {}", what, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_counts() {
        let lik = SegmentLikelihood::new(vec![0.3, 0.7, 1.5]).unwrap();
        let ll = lik.log_likelihood_slice(&[0, 0, 0]);
        assert!(ll.abs() < 1e-10);
    }

    #[test]
    fn test_known_value() {
        // Uniform prior over two words, one observation: P = 1/2.
        let lik = SegmentLikelihood::new(vec![1.0, 1.0]).unwrap();
        assert!(lik.constant().abs() < 1e-12);
        let ll = lik.log_likelihood_slice(&[1, 0]);
        assert!((ll - 0.5f64.ln()).abs() < 1e-10);

        // Two observations of the same word: 1/2 * 2/3.
        let ll = lik.log_likelihood_slice(&[2, 0]);
        assert!((ll - (1.0f64 / 3.0).ln()).abs() < 1e-10);
    }

    #[test]
    fn test_large_counts_are_finite() {
        let lik = SegmentLikelihood::new(vec![0.1; 50]).unwrap();
        let counts: Vec<u32> = (0..50).map(|i| 1000 + i * 37).collect();
        let ll = lik.log_likelihood_slice(&counts);
        assert!(ll.is_finite());
        assert!(ll < 0.0);
    }

    #[test]
    fn test_rejects_bad_prior() {
        assert!(SegmentLikelihood::new(vec![]).is_err());
        assert!(SegmentLikelihood::new(vec![0.5, 0.0]).is_err());
        assert!(SegmentLikelihood::new(vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_from_prior() {
        let lik = SegmentLikelihood::from_prior(&BetaPrior::Symmetric(0.5), 3).unwrap();
        assert_eq!(lik.vocab_size(), 3);
        assert!(SegmentLikelihood::from_prior(&BetaPrior::Vector(vec![0.5]), 3).is_err());
    }

    #[test]
    fn test_topic_distribution_sums_to_one() {
        let lik = SegmentLikelihood::new(vec![0.5; 3]).unwrap();
        let phi = lik.topic_distribution(ArrayView1::from(&[3u32, 0, 1][..]));
        let total: f64 = phi.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(phi[0] > phi[2] && phi[2] > phi[1]);
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite(-3.0, "x").is_ok());
        assert!(matches!(ensure_finite(f64::NAN, "x"), Err(TopicTrackError::Numeric(_))));
    }
}
