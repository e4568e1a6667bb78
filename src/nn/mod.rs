//! Neural network building blocks
//!
//! Provides the dense linear primitive, inverted dropout, weight
//! initializers, and the `Module` trait for named-parameter traversal.

mod dropout;
pub mod init;
mod linear;
mod module;

pub use dropout::Dropout;
pub use linear::Linear;
pub use module::{qualify, Module};

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayD, IxDyn};

/// Flatten a 2-D or 3-D input to a (rows × features) block.
///
/// The trailing dimension must equal `features`; one leading batch level is
/// folded into the row count.
pub(crate) fn flatten_to_2d(input: &ArrayD<f32>, features: usize) -> Result<Array2<f32>> {
    let shape = input.shape();
    if shape.len() != 2 && shape.len() != 3 {
        return Err(Error::ShapeMismatch {
            expected: vec![features],
            got: shape.to_vec(),
        });
    }
    if shape[shape.len() - 1] != features {
        return Err(Error::ShapeMismatch {
            expected: vec![features],
            got: shape.to_vec(),
        });
    }

    let rows: usize = shape[..shape.len() - 1].iter().product();
    let flat: Vec<f32> = input.iter().copied().collect();
    let block = Array2::from_shape_vec((rows, features), flat).expect("flattened block shape");
    Ok(block)
}

/// Restore the leading dimensions of `original_shape` around a processed
/// (rows × out_features) block.
pub(crate) fn restore_leading(
    block: Array2<f32>,
    original_shape: &[usize],
    out_features: usize,
) -> ArrayD<f32> {
    let mut shape = original_shape.to_vec();
    let last = shape.len() - 1;
    shape[last] = out_features;

    let flat: Vec<f32> = block.into_iter().collect();
    ArrayD::from_shape_vec(IxDyn(&shape), flat).expect("restored block shape")
}
