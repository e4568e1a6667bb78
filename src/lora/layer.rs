//! LoRA-adapted dense linear layer
//!
//! Augments a dense transform y = x·Wᵀ + b with a low-rank correction
//! ΔW = B @ A where A ∈ ℝ^(r × d_in) and B ∈ ℝ^(d_out × r), scaled by
//! alpha/r. The correction lives in one of two representations:
//!
//! - **Demerged** (training): W holds only the base value and the correction
//!   is added at forward time, so gradients flow only into A and B.
//! - **Merged** (evaluation): the correction is folded into W and inference
//!   costs the same single matrix multiply as an unadapted layer.

use super::LoraConfig;
use crate::error::Result;
use crate::nn::{flatten_to_2d, init, qualify, Dropout, Linear, Module};
use crate::tensor::{matmul, transpose, Tensor};
use ndarray::{Array1, ArrayD};
use rand::Rng;
use std::fmt;

/// Representation of the correction relative to the base weight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeState {
    /// Correction kept separate and applied additively at forward time
    Demerged,
    /// Correction folded into the base weight
    Merged,
}

/// Low-rank factor pair attached to a linear layer
struct LoraAdapter {
    /// Downprojection A stored as 1D [rank * in_features]
    lora_a: Tensor,
    /// Upprojection B stored as 1D [out_features * rank]
    lora_b: Tensor,
    rank: usize,
    /// Scaling factor (alpha / rank)
    scaling: f32,
    dropout: Dropout,
    state: MergeState,
}

impl LoraAdapter {
    /// scaling * (B @ A), flat [out_features * in_features]
    fn scaled_delta(&self, out_features: usize, in_features: usize) -> Array1<f32> {
        let ba = matmul(
            self.lora_b.data(),
            self.lora_a.data(),
            out_features,
            self.rank,
            in_features,
        );
        ba * self.scaling
    }
}

/// Dense linear layer with an optional trainable low-rank adapter
pub struct LoraLinear {
    base: Linear,
    adapter: Option<LoraAdapter>,
    training: bool,
}

impl LoraLinear {
    /// Create a new adapted layer
    ///
    /// With `config.rank == 0` no adapter is allocated and the layer behaves
    /// as a plain dense layer. Otherwise the factors are allocated frozen
    /// (`requires_grad = false`); only `mark_only_lora_as_trainable` unfreezes
    /// them.
    pub fn new(
        in_features: usize,
        out_features: usize,
        bias: bool,
        config: &LoraConfig,
    ) -> Result<Self> {
        let base = Linear::new(in_features, out_features, bias)?;

        let adapter = if config.is_enabled() {
            Some(LoraAdapter {
                lora_a: Tensor::zeros(config.rank * in_features, false),
                lora_b: Tensor::zeros(out_features * config.rank, false),
                rank: config.rank,
                scaling: config.scaling(),
                dropout: Dropout::new(config.dropout)?,
                state: MergeState::Demerged,
            })
        } else {
            None
        };

        let mut layer = Self {
            base,
            adapter,
            training: true,
        };
        layer.reset_parameters(&mut rand::rng());
        Ok(layer)
    }

    /// Re-initialize base parameters and adapter factors
    ///
    /// A gets a fan-in-aware Kaiming-uniform fill (slope √5); B is zeroed so
    /// ΔW = B·A = 0 and the layer is numerically identical to the bare dense
    /// layer until training moves B away from zero.
    pub fn reset_parameters<R: Rng>(&mut self, rng: &mut R) {
        self.base.reset_parameters(rng);
        if let Some(adapter) = self.adapter.as_mut() {
            init::kaiming_uniform(
                &mut adapter.lora_a,
                self.base.in_features(),
                init::DENSE_INIT_SLOPE,
                rng,
            );
            init::zeros(&mut adapter.lora_b);
        }
    }

    /// Forward pass over a 2-D (rows × in_features) or 3-D
    /// (batch × rows × in_features) input
    ///
    /// The base transform is always computed. The correction
    /// scaling · dropout(B @ (A @ xᵀ))ᵀ is added only when an adapter is
    /// present and demerged; dropout draws randomness only in training mode
    /// and never touches the base path.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let base_out = self.base.forward(input)?;

        let adapter = match &self.adapter {
            Some(adapter) if adapter.state == MergeState::Demerged => adapter,
            // Correction absent or already folded into the weight
            _ => return Ok(base_out),
        };

        let in_features = self.base.in_features();
        let out_features = self.base.out_features();

        let block = flatten_to_2d(input, in_features)?;
        let n = block.nrows();
        let x: Array1<f32> = block.iter().copied().collect();

        // (B @ (A @ xᵀ))ᵀ, staged through the rank-r bottleneck
        let xt = transpose(&x, n, in_features);
        let ax = matmul(adapter.lora_a.data(), &xt, adapter.rank, in_features, n);
        let bax = matmul(adapter.lora_b.data(), &ax, out_features, adapter.rank, n);
        let correction = transpose(&bax, out_features, n);

        let correction = if self.training && !adapter.dropout.is_identity() {
            adapter.dropout.apply(&correction, &mut rand::rng())
        } else {
            correction
        };

        let mut out = base_out;
        for (value, delta) in out.iter_mut().zip(correction.iter()) {
            *value += adapter.scaling * delta;
        }
        Ok(out)
    }

    /// Fold the correction into the base weight: W += scaling * (B @ A)
    ///
    /// No-op when already merged or when no adapter is present.
    pub fn merge(&mut self) {
        if let Some(adapter) = self.adapter.as_mut() {
            if adapter.state == MergeState::Merged {
                return;
            }
            let delta = adapter.scaled_delta(self.base.out_features(), self.base.in_features());
            for (value, d) in self
                .base
                .weight_mut()
                .data_mut()
                .iter_mut()
                .zip(delta.iter())
            {
                *value += d;
            }
            adapter.state = MergeState::Merged;
        }
    }

    /// Subtract the correction back out of the base weight:
    /// W -= scaling * (B @ A)
    ///
    /// No-op when already demerged or when no adapter is present.
    pub fn unmerge(&mut self) {
        if let Some(adapter) = self.adapter.as_mut() {
            if adapter.state == MergeState::Demerged {
                return;
            }
            let delta = adapter.scaled_delta(self.base.out_features(), self.base.in_features());
            for (value, d) in self
                .base
                .weight_mut()
                .data_mut()
                .iter_mut()
                .zip(delta.iter())
            {
                *value -= d;
            }
            adapter.state = MergeState::Demerged;
        }
    }

    /// Switch between training and evaluation behavior
    ///
    /// Training demerges so gradients flow only into the factors; evaluation
    /// merges so inference costs a single matrix multiply. Callers must
    /// serialize mode transitions against concurrent forward calls on the
    /// same instance.
    pub fn set_mode(&mut self, training: bool) {
        self.training = training;
        if training {
            self.unmerge();
        } else {
            self.merge();
        }
    }

    /// Switch to training mode (demerges the correction)
    pub fn train(&mut self) -> &mut Self {
        self.set_mode(true);
        self
    }

    /// Switch to evaluation mode (merges the correction)
    pub fn eval(&mut self) -> &mut Self {
        self.set_mode(false);
        self
    }

    /// Human-readable configuration summary
    pub fn describe(&self) -> String {
        let mut out = self.base.describe();
        if let Some(adapter) = &self.adapter {
            out.push_str(&format!(
                ", rank={}, scaling={}, dropout={}",
                adapter.rank,
                adapter.scaling,
                adapter.dropout.p()
            ));
        }
        out
    }

    /// Get reference to the base dense layer
    pub fn base(&self) -> &Linear {
        &self.base
    }

    /// Get mutable reference to the base dense layer
    pub fn base_mut(&mut self) -> &mut Linear {
        &mut self.base
    }

    /// Input dimension
    pub fn in_features(&self) -> usize {
        self.base.in_features()
    }

    /// Output dimension
    pub fn out_features(&self) -> usize {
        self.base.out_features()
    }

    /// Whether an adapter is attached
    pub fn is_adapted(&self) -> bool {
        self.adapter.is_some()
    }

    /// Whether the correction is currently folded into the weight
    pub fn is_merged(&self) -> bool {
        matches!(
            self.adapter.as_ref().map(|a| a.state),
            Some(MergeState::Merged)
        )
    }

    /// Merge state of the adapter, if present
    pub fn merge_state(&self) -> Option<MergeState> {
        self.adapter.as_ref().map(|a| a.state)
    }

    /// Whether the layer is in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Adapter rank, if present
    pub fn rank(&self) -> Option<usize> {
        self.adapter.as_ref().map(|a| a.rank)
    }

    /// Correction scale factor, if an adapter is present
    pub fn scaling(&self) -> Option<f32> {
        self.adapter.as_ref().map(|a| a.scaling)
    }

    /// Get reference to factor A
    pub fn lora_a(&self) -> Option<&Tensor> {
        self.adapter.as_ref().map(|a| &a.lora_a)
    }

    /// Get mutable reference to factor A
    pub fn lora_a_mut(&mut self) -> Option<&mut Tensor> {
        self.adapter.as_mut().map(|a| &mut a.lora_a)
    }

    /// Get reference to factor B
    pub fn lora_b(&self) -> Option<&Tensor> {
        self.adapter.as_ref().map(|a| &a.lora_b)
    }

    /// Get mutable reference to factor B
    pub fn lora_b_mut(&mut self) -> Option<&mut Tensor> {
        self.adapter.as_mut().map(|a| &mut a.lora_b)
    }
}

impl Module for LoraLinear {
    fn visit_parameters(&mut self, prefix: &str, visitor: &mut dyn FnMut(&str, &mut Tensor)) {
        self.base.visit_parameters(prefix, visitor);
        if let Some(adapter) = self.adapter.as_mut() {
            visitor(&qualify(prefix, "lora_a"), &mut adapter.lora_a);
            visitor(&qualify(prefix, "lora_b"), &mut adapter.lora_b);
        }
    }
}

impl fmt::Display for LoraLinear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoraLinear({})", self.describe())
    }
}
