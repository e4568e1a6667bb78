//! Weight initialization schemes

use crate::tensor::Tensor;
use rand::Rng;

/// Negative slope baked into the dense-layer scheme.
///
/// With slope √5 the Kaiming bound collapses to 1/√fan_in.
pub const DENSE_INIT_SLOPE: f32 = 2.236_068; // √5

/// Gain for a leaky rectifier with the given negative slope
fn leaky_relu_gain(negative_slope: f32) -> f32 {
    (2.0 / (1.0 + negative_slope * negative_slope)).sqrt()
}

/// Fill with Kaiming-uniform values: U(-bound, bound) where
/// bound = gain · √(3 / fan_in)
pub fn kaiming_uniform<R: Rng>(
    tensor: &mut Tensor,
    fan_in: usize,
    negative_slope: f32,
    rng: &mut R,
) {
    let gain = leaky_relu_gain(negative_slope);
    let bound = gain * (3.0 / fan_in as f32).sqrt();
    uniform(tensor, bound, rng);
}

/// Fill with U(-bound, bound) values
pub fn uniform<R: Rng>(tensor: &mut Tensor, bound: f32, rng: &mut R) {
    for value in tensor.data_mut().iter_mut() {
        *value = rng.random_range(-bound..bound);
    }
}

/// Zero a tensor in place
pub fn zeros(tensor: &mut Tensor) {
    tensor.data_mut().fill(0.0);
}
