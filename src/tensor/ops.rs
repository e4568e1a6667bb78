//! Matrix kernels over flat row-major storage
//!
//! Matrices are stored as 1D arrays with explicit dimensions. Size
//! violations are programming errors and fail fast.

use ndarray::Array1;

/// Matrix multiply: C[m,n] = A[m,k] @ B[k,n]
pub fn matmul(a: &Array1<f32>, b: &Array1<f32>, m: usize, k: usize, n: usize) -> Array1<f32> {
    assert_eq!(a.len(), m * k, "Matrix A size mismatch");
    assert_eq!(b.len(), k * n, "Matrix B size mismatch");

    let mut result = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for p in 0..k {
                sum += a[i * k + p] * b[p * n + j];
            }
            result[i * n + j] = sum;
        }
    }

    Array1::from(result)
}

/// Transpose: B[cols,rows] = A[rows,cols]^T
pub fn transpose(a: &Array1<f32>, rows: usize, cols: usize) -> Array1<f32> {
    assert_eq!(a.len(), rows * cols, "Matrix size mismatch");

    let mut result = vec![0.0; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            result[j * rows + i] = a[i * cols + j];
        }
    }

    Array1::from(result)
}
