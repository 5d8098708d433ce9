//! Core RBM algorithm implementation.
//!
//! This module provides the fundamental RBM structures and operations:
//! - Block Gibbs sampling between the visible and hidden layer
//! - The CD-k chain (one positive phase, k Markov transitions)
//! - Gradient computation from positive vs. negative phase statistics
//! - The in-place parameter update with momentum and weight decay
//!
//! ## Contrastive Divergence
//!
//! Training approximates the log-likelihood gradient by running the Gibbs
//! chain for only `k` steps instead of sampling to equilibrium:
//! ```text
//! ΔW  = (vᵀ h⁺ - v̂ᵀ ĥ) · η · momentum
//! Δb_v = mean(v - v̂) · η
//! Δb_h = mean(h⁺ - ĥ) · η
//!
//! where (v̂, ĥ) are the chain's statistics after k transitions
//! ```
//!
//! Sampling consumes an explicitly injected [`SampleSource`], so a fixed
//! source state and call sequence reproduce a training step bit-for-bit.

use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::Rng;
use std::error::Error;
use std::fmt;

use crate::utils::{row_mean, sigmoid_matrix};
use crate::CdConfig;

/// Error type for RBM operations.
#[derive(Debug, Clone)]
pub enum RbmError {
    /// Input shape does not match the layer dimensions
    DimensionMismatch(String),
    /// Invalid training configuration (e.g. `k = 0`)
    InvalidArgument(String),
    /// Training was invoked with no input and no cached batch
    MissingInput,
    /// A computed update contained NaN or infinite entries
    NumericInstability(String),
}

impl fmt::Display for RbmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RbmError::DimensionMismatch(msg) => write!(f, "Dimension mismatch: {}", msg),
            RbmError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            RbmError::MissingInput => write!(f, "No input provided and no cached batch available"),
            RbmError::NumericInstability(msg) => write!(f, "Numeric instability: {}", msg),
        }
    }
}

impl Error for RbmError {}

pub type RbmResult<T> = Result<T, RbmError>;

/// Source of Bernoulli draws for the sampling kernel.
///
/// Each call draws one unit activation: `1.0` with the given probability,
/// `0.0` otherwise. The kernel consumes draws in a fixed order (row-major
/// over each sampled matrix), so a deterministic source makes a whole CD-k
/// step deterministic. Tests substitute a thresholding stub.
pub trait SampleSource {
    /// Draw a single binary sample with success probability `probability`.
    fn draw(&mut self, probability: f64) -> f64;
}

/// Adapter making any [`rand::Rng`] usable as a [`SampleSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SampleSource for RngSource<R> {
    fn draw(&mut self, probability: f64) -> f64 {
        // NaN probability compares false and yields 0.0; instability is
        // caught later at the update boundary.
        if self.rng.gen::<f64>() < probability {
            1.0
        } else {
            0.0
        }
    }
}

/// One propagation + stochastic sampling step.
///
/// `mean` holds the per-unit activation probabilities (each in `[0, 1]`),
/// `sample` the corresponding Bernoulli draws (each exactly `0.0` or `1.0`).
/// Both have shape `(batch, units)` of the target layer.
#[derive(Debug, Clone)]
pub struct MeanSamplePair {
    pub mean: Array2<f64>,
    pub sample: Array2<f64>,
}

/// One full Markov transition of the Gibbs chain: hidden → visible → hidden.
#[derive(Debug, Clone)]
pub struct GibbsTransition {
    /// Visible layer resampled from the incoming hidden sample
    pub visible: MeanSamplePair,
    /// Hidden layer resampled from that visible sample
    pub hidden: MeanSamplePair,
}

/// The weights and biases of one RBM layer pair, plus the update
/// coefficients that belong to the model rather than to a single call.
///
/// # Shapes
///
/// - `weights`: `(n_visible, n_hidden)` — used untransposed for
///   up-propagation and transposed for down-propagation
/// - `hidden_bias`: `(n_hidden,)`
/// - `visible_bias`: `(n_visible,)`
///
/// Dimensions never change after construction; training mutates the values
/// in place through [`ParameterSet::apply_update`].
#[derive(Debug, Clone)]
pub struct ParameterSet {
    /// Weight matrix, shape (n_visible, n_hidden)
    pub weights: Array2<f64>,
    /// Hidden bias vector, length n_hidden
    pub hidden_bias: Array1<f64>,
    /// Visible bias vector, length n_visible
    pub visible_bias: Array1<f64>,
    /// Scale applied to the weight gradient of each update (1.0 = plain CD)
    pub momentum: f64,
    /// Weight-decay coefficient; 0.0 disables regularization
    pub weight_decay: f64,
}

impl ParameterSet {
    /// Create a parameter set with all weights and biases zero.
    ///
    /// Useful for tests and for callers supplying their own initial values;
    /// real training should start from [`ParameterSet::random`] so hidden
    /// units are not symmetric.
    pub fn zeroed(n_visible: usize, n_hidden: usize) -> Self {
        Self {
            weights: Array2::zeros((n_visible, n_hidden)),
            hidden_bias: Array1::zeros(n_hidden),
            visible_bias: Array1::zeros(n_visible),
            momentum: 1.0,
            weight_decay: 0.0,
        }
    }

    /// Create a parameter set with uniformly initialized weights.
    ///
    /// Weights are drawn from `U(-limit, limit)` with
    /// `limit = sqrt(6 / (n_visible + n_hidden))` to break symmetry without
    /// excessive scale; biases start at zero.
    pub fn random<R: Rng>(n_visible: usize, n_hidden: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (n_visible + n_hidden) as f64).sqrt();
        let dist = Uniform::new(-limit, limit);
        Self {
            weights: Array2::random_using((n_visible, n_hidden), dist, rng),
            hidden_bias: Array1::zeros(n_hidden),
            visible_bias: Array1::zeros(n_visible),
            momentum: 1.0,
            weight_decay: 0.0,
        }
    }

    /// Number of visible units.
    pub fn n_visible(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of hidden units.
    pub fn n_hidden(&self) -> usize {
        self.weights.ncols()
    }

    /// Hidden activation probabilities given visible values.
    ///
    /// `sigmoid(v · W + hidden_bias)`, shape `(batch, n_hidden)`.
    pub fn propagate_up(&self, visible: &Array2<f64>) -> Array2<f64> {
        let mut pre = visible.dot(&self.weights);
        pre += &self.hidden_bias;
        sigmoid_matrix(&pre)
    }

    /// Visible activation probabilities given hidden values.
    ///
    /// `sigmoid(h · Wᵀ + visible_bias)`, shape `(batch, n_visible)`.
    pub fn propagate_down(&self, hidden: &Array2<f64>) -> Array2<f64> {
        let mut pre = hidden.dot(&self.weights.t());
        pre += &self.visible_bias;
        sigmoid_matrix(&pre)
    }

    /// Sample the hidden layer given visible values.
    ///
    /// Computes the hidden means via [`ParameterSet::propagate_up`] and
    /// draws one Bernoulli sample per entry from `source`.
    pub fn sample_hidden_given_visible(
        &self,
        visible: &Array2<f64>,
        source: &mut dyn SampleSource,
    ) -> MeanSamplePair {
        let mean = self.propagate_up(visible);
        let sample = bernoulli(&mean, source);
        MeanSamplePair { mean, sample }
    }

    /// Sample the visible layer given hidden values.
    ///
    /// Symmetric to [`ParameterSet::sample_hidden_given_visible`], using
    /// [`ParameterSet::propagate_down`].
    pub fn sample_visible_given_hidden(
        &self,
        hidden: &Array2<f64>,
        source: &mut dyn SampleSource,
    ) -> MeanSamplePair {
        let mean = self.propagate_down(hidden);
        let sample = bernoulli(&mean, source);
        MeanSamplePair { mean, sample }
    }

    /// One Gibbs transition: hidden → visible → hidden.
    ///
    /// Resamples the visible layer from `hidden_sample`, then resamples the
    /// hidden layer from that visible **sample** (not its mean). Returns
    /// both intermediate pairs; the caller chains transitions by feeding
    /// `transition.hidden.sample` back in.
    pub fn gibbs_step(
        &self,
        hidden_sample: &Array2<f64>,
        source: &mut dyn SampleSource,
    ) -> GibbsTransition {
        let visible = self.sample_visible_given_hidden(hidden_sample, source);
        let hidden = self.sample_hidden_given_visible(&visible.sample, source);
        GibbsTransition { visible, hidden }
    }

    /// Deterministic reconstruction of a visible batch.
    ///
    /// `propagate_down(propagate_up(v))` — means only, no sampling. Used by
    /// external evaluation (reconstruction cross-entropy), not by training.
    pub fn reconstruct(&self, visible: &Array2<f64>) -> Array2<f64> {
        self.propagate_down(&self.propagate_up(visible))
    }

    /// Apply a computed update to the parameters in place.
    ///
    /// Mutation order: weight gradient, then weight decay (proportional to
    /// the updated weights, the learning rate, and `1/batch`), then visible
    /// bias, then hidden bias. The update's deltas were validated finite
    /// before this is called, so the mutation is all-or-nothing.
    ///
    /// Taking `&mut self` for the whole window keeps partially updated
    /// parameters from being observed mid-update.
    pub fn apply_update(&mut self, update: &CdUpdate) {
        self.weights += &update.weight_delta;
        if self.weight_decay != 0.0 {
            let shrink = self.weight_decay * update.learning_rate / update.batch_size as f64;
            self.weights *= 1.0 - shrink;
        }
        self.visible_bias += &update.visible_bias_delta;
        self.hidden_bias += &update.hidden_bias_delta;
    }
}

/// Parameter deltas computed by one CD-k pass, not yet applied.
///
/// Produced by [`cd_update`]; consumed by [`ParameterSet::apply_update`].
/// `learning_rate` and `batch_size` are carried along because the
/// weight-decay term applied at update time scales by both.
#[derive(Debug, Clone)]
pub struct CdUpdate {
    /// ΔW, shape (n_visible, n_hidden); momentum already folded in
    pub weight_delta: Array2<f64>,
    /// Δ visible bias, length n_visible
    pub visible_bias_delta: Array1<f64>,
    /// Δ hidden bias, length n_hidden
    pub hidden_bias_delta: Array1<f64>,
    /// Learning rate the deltas were scaled by
    pub learning_rate: f64,
    /// Number of examples in the batch the deltas were computed from
    pub batch_size: usize,
}

/// Run one CD-k pass and compute the resulting parameter update.
///
/// Pure with respect to `params`: nothing is mutated, so the sampling and
/// gradient logic is testable without a live model. The enclosing
/// [`Rbm`](crate::Rbm) pairs this with [`ParameterSet::apply_update`].
///
/// # Algorithm
///
/// 1. Positive phase: sample the hidden layer once from `input`.
/// 2. Seed the chain with the positive hidden **sample** and run `k`
///    Gibbs transitions.
/// 3. Take the negative statistics from the last transition: the visible
///    **sample** and the hidden **mean**.
/// 4. Form the deltas of §"Contrastive Divergence" in the module docs.
///
/// The positive weight term uses the sampled hidden activations while the
/// negative term uses the hidden means. The asymmetry is intentional and
/// load-bearing; do not symmetrize it.
///
/// # Errors
///
/// - `InvalidArgument` if `k = 0` (no negative-phase statistics), the
///   learning rate is not a positive finite number, or the batch is empty
/// - `DimensionMismatch` if `input` has a column count other than
///   `n_visible`
/// - `NumericInstability` if any computed delta is NaN or infinite
pub fn cd_update(
    params: &ParameterSet,
    input: &Array2<f64>,
    config: &CdConfig,
    source: &mut dyn SampleSource,
) -> RbmResult<CdUpdate> {
    if config.k == 0 {
        return Err(RbmError::InvalidArgument(
            "k must be >= 1; a zero-length chain yields no negative-phase statistics".to_string(),
        ));
    }
    if !(config.learning_rate > 0.0) || !config.learning_rate.is_finite() {
        return Err(RbmError::InvalidArgument(format!(
            "learning rate must be a positive finite number, got {}",
            config.learning_rate
        )));
    }
    if input.ncols() != params.n_visible() {
        return Err(RbmError::DimensionMismatch(format!(
            "input has {} columns but the model has {} visible units",
            input.ncols(),
            params.n_visible()
        )));
    }
    if input.nrows() == 0 {
        return Err(RbmError::InvalidArgument(
            "input batch is empty".to_string(),
        ));
    }

    // Positive phase: one hidden sample driven by the data.
    let pos_hidden = params.sample_hidden_given_visible(input, source);

    // k Gibbs transitions, chained on the hidden samples.
    let mut transition = params.gibbs_step(&pos_hidden.sample, source);
    for _ in 1..config.k {
        let next = params.gibbs_step(&transition.hidden.sample, source);
        transition = next;
    }
    let neg_visible_sample = &transition.visible.sample;
    let neg_hidden_mean = &transition.hidden.mean;

    let lr = config.learning_rate;
    let weight_delta = (input.t().dot(&pos_hidden.sample)
        - neg_visible_sample.t().dot(neg_hidden_mean))
        * (lr * params.momentum);
    let visible_bias_delta = row_mean(&(input - neg_visible_sample)) * lr;
    let hidden_bias_delta = row_mean(&(&pos_hidden.sample - neg_hidden_mean)) * lr;

    let update = CdUpdate {
        weight_delta,
        visible_bias_delta,
        hidden_bias_delta,
        learning_rate: lr,
        batch_size: input.nrows(),
    };
    ensure_finite(&update)?;
    Ok(update)
}

/// Validate an update at the boundary before any parameter is mutated.
///
/// Unstable arithmetic upstream (e.g. NaN in the input batch) propagates
/// silently through the chain; this is the one place it is caught, which
/// also guarantees updates are applied all-or-nothing.
fn ensure_finite(update: &CdUpdate) -> RbmResult<()> {
    let finite = update.weight_delta.iter().all(|v| v.is_finite())
        && update.visible_bias_delta.iter().all(|v| v.is_finite())
        && update.hidden_bias_delta.iter().all(|v| v.is_finite());
    if finite {
        Ok(())
    } else {
        Err(RbmError::NumericInstability(
            "computed update contains non-finite entries; no parameters were changed".to_string(),
        ))
    }
}

/// Draw one Bernoulli sample per entry of `mean`, in row-major order.
fn bernoulli(mean: &Array2<f64>, source: &mut dyn SampleSource) -> Array2<f64> {
    mean.mapv(|p| source.draw(p))
}

/// A Restricted Boltzmann Machine: a [`ParameterSet`] plus the cached last
/// training batch.
///
/// The model owns its parameters for the whole training run; each call to
/// [`Rbm::contrastive_divergence`] performs one optimization step. Not safe
/// for concurrent training on the same instance — the sample source and the
/// in-place parameter mutation are both consumed sequentially, so callers
/// must serialize steps per model.
#[derive(Debug, Clone)]
pub struct Rbm {
    /// Weights, biases, and update coefficients
    pub params: ParameterSet,
    /// Last batch handed to training; reused when a call omits its input
    cached_input: Option<Array2<f64>>,
}

impl Rbm {
    /// Wrap an existing parameter set.
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            cached_input: None,
        }
    }

    /// Create a model with randomly initialized weights and zero biases.
    pub fn random<R: Rng>(n_visible: usize, n_hidden: usize, rng: &mut R) -> Self {
        Self::new(ParameterSet::random(n_visible, n_hidden, rng))
    }

    /// Number of visible units.
    pub fn n_visible(&self) -> usize {
        self.params.n_visible()
    }

    /// Number of hidden units.
    pub fn n_hidden(&self) -> usize {
        self.params.n_hidden()
    }

    /// The batch a subsequent input-less training call would reuse.
    pub fn cached_input(&self) -> Option<&Array2<f64>> {
        self.cached_input.as_ref()
    }

    /// One CD-k training step: compute the update and apply it in place.
    ///
    /// When `input` is `Some`, the batch is validated and cached before the
    /// chain runs; when `None`, the previously cached batch is reused. All
    /// failures leave the parameters untouched.
    ///
    /// # Errors
    ///
    /// `MissingInput` if no batch was given and none is cached, plus every
    /// error of [`cd_update`].
    pub fn contrastive_divergence(
        &mut self,
        input: Option<&Array2<f64>>,
        config: &CdConfig,
        source: &mut dyn SampleSource,
    ) -> RbmResult<()> {
        if let Some(batch) = input {
            if batch.ncols() != self.n_visible() {
                return Err(RbmError::DimensionMismatch(format!(
                    "input has {} columns but the model has {} visible units",
                    batch.ncols(),
                    self.n_visible()
                )));
            }
            self.cached_input = Some(batch.clone());
        }
        let batch = self.cached_input.as_ref().ok_or(RbmError::MissingInput)?;

        let update = cd_update(&self.params, batch, config, source)?;
        self.params.apply_update(&update);
        Ok(())
    }

    /// Deterministic reconstruction of a visible batch (means only).
    pub fn reconstruct(&self, visible: &Array2<f64>) -> Array2<f64> {
        self.params.reconstruct(visible)
    }
}
