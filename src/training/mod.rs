//! Training helpers: monitoring metrics and convergence-driven loops.
//!
//! The core kernel performs exactly one CD-k step per call and knows nothing
//! about stopping criteria. The helpers here drive it: [`train_step`] runs
//! one step and reports the monitoring loss, [`train_until_converged`]
//! repeats steps on a fixed batch until the loss stops improving.

use ndarray::Array2;

use crate::core::{Rbm, RbmResult, SampleSource};
use crate::utils::cross_entropy;
use crate::CdConfig;

/// Metrics computed alongside a training step.
///
/// The cross-entropy is evaluated on a deterministic reconstruction of the
/// training batch after the update; it monitors progress and never feeds
/// back into the gradients.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Mean per-example reconstruction cross-entropy
    pub cross_entropy: f64,
    /// Number of examples in the batch
    pub batch_size: usize,
}

/// Options for [`train_until_converged`].
#[derive(Debug, Clone)]
pub struct ConvergenceOptions {
    /// Safety cap on the number of CD steps
    pub max_steps: usize,
    /// Stop once the loss improves by less than this between steps
    pub tolerance: f64,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            tolerance: 1e-6,
        }
    }
}

/// Outcome of a convergence-driven run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    /// CD steps actually performed (may be fewer than the cap)
    pub steps_taken: usize,
    /// Reconstruction cross-entropy after the last step
    pub final_cross_entropy: f64,
}

/// Run one CD-k step on `input` and report the monitoring loss.
pub fn train_step(
    rbm: &mut Rbm,
    input: &Array2<f64>,
    config: &CdConfig,
    source: &mut dyn SampleSource,
) -> RbmResult<Metrics> {
    rbm.contrastive_divergence(Some(input), config, source)?;
    let reconstruction = rbm.reconstruct(input);
    Ok(Metrics {
        cross_entropy: cross_entropy(input, &reconstruction),
        batch_size: input.nrows(),
    })
}

/// Repeat CD-k steps on a fixed batch until the reconstruction
/// cross-entropy stops improving.
///
/// # Algorithm
///
/// ```text
/// loop up to max_steps:
///     one CD step
///     h = cross_entropy(input, reconstruct(input))
///     stop when |h_prev - h| < tolerance
/// ```
///
/// The loss is stochastic across steps (each step resamples the chain), so
/// `tolerance` should be loose enough to absorb sampling noise, or
/// `max_steps` treated as the real stopping rule.
pub fn train_until_converged(
    rbm: &mut Rbm,
    input: &Array2<f64>,
    config: &CdConfig,
    source: &mut dyn SampleSource,
    options: &ConvergenceOptions,
) -> RbmResult<TrainingSummary> {
    let mut previous = f64::INFINITY;
    let mut steps_taken = 0;
    let mut loss = cross_entropy(input, &rbm.reconstruct(input));

    for step in 0..options.max_steps {
        let metrics = train_step(rbm, input, config, source)?;
        loss = metrics.cross_entropy;
        steps_taken = step + 1;

        if (previous - loss).abs() < options.tolerance {
            break;
        }
        previous = loss;
    }

    Ok(TrainingSummary {
        steps_taken,
        final_cross_entropy: loss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParameterSet, RngSource};
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn toy_batch() -> Array2<f64> {
        arr2(&[
            [1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            [0.0, 0.0, 0.0, 1.0, 0.0, 1.0],
        ])
    }

    #[test]
    fn test_train_step_reports_metrics() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rbm = Rbm::random(6, 3, &mut rng);
        let mut source = RngSource::new(rng);
        let config = CdConfig {
            learning_rate: 0.1,
            k: 1,
        };

        let input = toy_batch();
        let metrics = train_step(&mut rbm, &input, &config, &mut source).unwrap();
        assert_eq!(metrics.batch_size, 4);
        assert!(metrics.cross_entropy.is_finite());
        assert!(metrics.cross_entropy > 0.0);
    }

    #[test]
    fn test_training_improves_reconstruction() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut rbm = Rbm::random(6, 4, &mut rng);
        let mut source = RngSource::new(rng);
        let config = CdConfig {
            learning_rate: 0.2,
            k: 1,
        };

        let input = toy_batch();
        let before = cross_entropy(&input, &rbm.reconstruct(&input));
        for _ in 0..300 {
            train_step(&mut rbm, &input, &config, &mut source).unwrap();
        }
        let after = cross_entropy(&input, &rbm.reconstruct(&input));
        assert!(
            after < before,
            "cross-entropy should drop: before={before}, after={after}"
        );
    }

    #[test]
    fn test_convergence_respects_step_cap() {
        let mut rbm = Rbm::new(ParameterSet::zeroed(6, 2));
        let mut rng = StdRng::seed_from_u64(3);
        let mut source = RngSource::new(&mut rng);
        let config = CdConfig {
            learning_rate: 0.05,
            k: 1,
        };
        let options = ConvergenceOptions {
            max_steps: 25,
            tolerance: 0.0, // never triggers; the cap is the stopping rule
        };

        let input = toy_batch();
        let summary =
            train_until_converged(&mut rbm, &input, &config, &mut source, &options).unwrap();
        assert_eq!(summary.steps_taken, 25);
        assert!(summary.final_cross_entropy.is_finite());
    }
}
