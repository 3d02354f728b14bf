//! Stateless Dirichlet and categorical primitives.
//!
//! Shared by the synthetic corpus generator and the segmentation models so
//! neither has to borrow the other's update rules.

use crate::error::{Result, TopicTrackError};
use ndarray::ArrayView1;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Gamma;

/// Smallest concentration handed to the Gamma sampler.
pub const MIN_CONCENTRATION: f64 = 1e-6;

/// Draws a probability vector from `Dir(alpha)`.
///
/// Sampled through independent `Gamma(alpha_i, 1)` variables. When every
/// variable underflows to zero (tiny concentrations) the mass is put on a
/// single component chosen proportionally to `alpha`.
pub fn draw<R: Rng + ?Sized>(alpha: &[f64], rng: &mut R) -> Result<Vec<f64>> {
    if alpha.is_empty() {
        return Err(TopicTrackError::Config("Dirichlet parameter is empty".to_string()));
    }

    let mut sample = Vec::with_capacity(alpha.len());
    for &a in alpha {
        let gamma = Gamma::new(a.max(MIN_CONCENTRATION), 1.0)
            .map_err(|e| TopicTrackError::Config(format!("invalid Dirichlet parameter {}: {}", a, e)))?;
        sample.push(gamma.sample(rng));
    }

    let total: f64 = sample.iter().sum();
    if total > 0.0 && total.is_finite() {
        for v in &mut sample {
            *v /= total;
        }
    } else {
        let winner = draw_categorical(alpha, rng)?;
        sample.iter_mut().for_each(|v| *v = 0.0);
        sample[winner] = 1.0;
    }
    Ok(sample)
}

/// Draws from a symmetric `Dir(alpha, ..., alpha)` of dimension `k`.
pub fn draw_symmetric<R: Rng + ?Sized>(alpha: f64, k: usize, rng: &mut R) -> Result<Vec<f64>> {
    draw(&vec![alpha; k], rng)
}

/// Draws the next link of a Dirichlet chain: `θ_t ~ Dir(c · θ_{t-1})`.
///
/// Components of `previous` are floored so the parameter stays positive.
pub fn draw_chained<R: Rng + ?Sized>(
    concentration: f64,
    previous: &[f64],
    rng: &mut R,
) -> Result<Vec<f64>> {
    let params: Vec<f64> = previous
        .iter()
        .map(|&p| (concentration * p).max(MIN_CONCENTRATION))
        .collect();
    draw(&params, rng)
}

/// Draws an index proportionally to `weights`.
pub fn draw_categorical<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<usize> {
    let dist = WeightedIndex::new(weights)
        .map_err(|e| TopicTrackError::Config(format!("invalid categorical weights: {}", e)))?;
    Ok(dist.sample(rng))
}

/// Posterior mean of a Dirichlet-multinomial: `(c_i + β_i) / Σ(c_j + β_j)`.
pub fn posterior_mean(counts: ArrayView1<'_, u32>, beta: &[f64]) -> Vec<f64> {
    let shifted: Vec<f64> = counts
        .iter()
        .zip(beta.iter())
        .map(|(&c, &b)| c as f64 + b)
        .collect();
    let total: f64 = shifted.iter().sum();
    shifted.into_iter().map(|v| v / total).collect()
}
