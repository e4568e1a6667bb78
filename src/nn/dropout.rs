//! Inverted dropout
//!
//! Zeroes each element with probability `p` and rescales survivors by
//! 1/(1-p) so the expected magnitude is unchanged.

use crate::error::{Error, Result};
use ndarray::Array1;
use rand::Rng;

/// Dropout mask applied to the adapter path during training
#[derive(Clone, Debug)]
pub struct Dropout {
    p: f32,
}

impl Dropout {
    /// Create a dropout with drop probability `p` in [0.0, 1.0)
    pub fn new(p: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(Error::InvalidConfig(format!(
                "Dropout rate must be in [0.0, 1.0), got {p}"
            )));
        }
        Ok(Self { p })
    }

    /// Drop probability
    pub fn p(&self) -> f32 {
        self.p
    }

    /// True when dropout never alters its input
    pub fn is_identity(&self) -> bool {
        self.p == 0.0
    }

    /// Apply the mask, drawing randomness from `rng`
    pub fn apply<R: Rng>(&self, x: &Array1<f32>, rng: &mut R) -> Array1<f32> {
        if self.is_identity() {
            return x.clone();
        }

        let scale = 1.0 / (1.0 - self.p);
        x.iter()
            .map(|&val| {
                if rng.random::<f32>() < self.p {
                    0.0
                } else {
                    val * scale
                }
            })
            .collect()
    }
}
