//! # RBM (Restricted Boltzmann Machine)
//!
//! The training kernel of a Restricted Boltzmann Machine: an energy-based
//! generative model trained by k-step Contrastive Divergence (CD-k) with
//! block Gibbs sampling between a visible and a hidden layer. Typically one
//! trainable layer of a deep belief network, learning a weight matrix and
//! two bias vectors that let the model reconstruct its input.
//!
//! ## Overview
//!
//! Each training call runs one positive phase, `k` Gibbs transitions
//! (hidden → visible → hidden), and applies the resulting weight and bias
//! deltas in place. Sampling draws from an explicitly injected
//! [`SampleSource`], so seeded runs are reproducible and tests can
//! substitute a deterministic stub.
//!
//! ## Structure
//!
//! - [`core`] — parameters, Gibbs sampling kernel, CD-k driver, update stage
//! - [`training`] — convergence-driving loops and monitoring metrics
//! - [`utils`] — stable sigmoid, reductions, reconstruction cross-entropy
//! - [`checkpoint`] — JSON save/load of trained parameters

pub mod checkpoint;
pub mod core;
pub mod training;
pub mod utils;

pub use crate::core::{
    cd_update, CdUpdate, GibbsTransition, MeanSamplePair, ParameterSet, Rbm, RbmError, RbmResult,
    RngSource, SampleSource,
};
pub use crate::training::{
    train_step, train_until_converged, ConvergenceOptions, Metrics, TrainingSummary,
};

/// Configuration for one contrastive-divergence training call.
///
/// Momentum and weight decay live on [`ParameterSet`] instead: they belong
/// to the model, while the learning rate and chain length vary per call.
#[derive(Debug, Clone)]
pub struct CdConfig {
    /// Step size applied to every gradient term; must be positive
    pub learning_rate: f64,
    /// Gibbs chain length; must be at least 1
    pub k: usize,
}

impl Default for CdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            k: 1,
        }
    }
}
