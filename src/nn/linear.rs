//! Dense linear layer: y = x·Wᵀ + b

use super::{flatten_to_2d, init, qualify, restore_leading, Module};
use crate::error::{Error, Result};
use crate::tensor::{matmul, transpose, Tensor};
use ndarray::{Array1, Array2, ArrayD};
use rand::Rng;

/// Dense affine transform with a flat row-major weight
pub struct Linear {
    /// Weight matrix stored as 1D [out_features * in_features]
    weight: Tensor,
    /// Optional bias vector [out_features]
    bias: Option<Tensor>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a new dense layer with freshly initialized parameters
    pub fn new(in_features: usize, out_features: usize, bias: bool) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "Feature sizes must be positive, got in_features={in_features}, out_features={out_features}"
            )));
        }

        let mut layer = Self {
            weight: Tensor::zeros(out_features * in_features, true),
            bias: bias.then(|| Tensor::zeros(out_features, true)),
            in_features,
            out_features,
        };
        layer.reset_parameters(&mut rand::rng());
        Ok(layer)
    }

    /// Re-initialize weight and bias with the standard dense-layer scheme
    pub fn reset_parameters<R: Rng>(&mut self, rng: &mut R) {
        init::kaiming_uniform(
            &mut self.weight,
            self.in_features,
            init::DENSE_INIT_SLOPE,
            rng,
        );
        if let Some(bias) = &mut self.bias {
            let bound = 1.0 / (self.in_features as f32).sqrt();
            init::uniform(bias, bound, rng);
        }
    }

    /// Forward pass over a 2-D (rows × in_features) or 3-D
    /// (batch × rows × in_features) input
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let block = flatten_to_2d(input, self.in_features)?;
        let out = self.forward_rows(&block);
        Ok(restore_leading(out, input.shape(), self.out_features))
    }

    /// Forward over an already-flattened (rows × in_features) block
    pub(crate) fn forward_rows(&self, input: &Array2<f32>) -> Array2<f32> {
        let n = input.nrows();
        let x: Array1<f32> = input.iter().copied().collect();

        // y = (W @ xᵀ)ᵀ + b
        let xt = transpose(&x, n, self.in_features);
        let wx = matmul(
            self.weight.data(),
            &xt,
            self.out_features,
            self.in_features,
            n,
        );
        let mut y = transpose(&wx, self.out_features, n);

        if let Some(bias) = &self.bias {
            for r in 0..n {
                for c in 0..self.out_features {
                    y[r * self.out_features + c] += bias.data()[c];
                }
            }
        }

        Array2::from_shape_vec((n, self.out_features), y.to_vec()).expect("row block shape")
    }

    /// Get reference to the weight tensor
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Get mutable reference to the weight tensor
    pub fn weight_mut(&mut self) -> &mut Tensor {
        &mut self.weight
    }

    /// Get reference to the bias tensor
    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// Get mutable reference to the bias tensor
    pub fn bias_mut(&mut self) -> Option<&mut Tensor> {
        self.bias.as_mut()
    }

    /// Input dimension
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Output dimension
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Human-readable configuration summary
    pub fn describe(&self) -> String {
        format!(
            "in_features={}, out_features={}, bias={}",
            self.in_features,
            self.out_features,
            self.bias.is_some()
        )
    }
}

impl Module for Linear {
    fn visit_parameters(&mut self, prefix: &str, visitor: &mut dyn FnMut(&str, &mut Tensor)) {
        visitor(&qualify(prefix, "weight"), &mut self.weight);
        if let Some(bias) = &mut self.bias {
            visitor(&qualify(prefix, "bias"), bias);
        }
    }
}
