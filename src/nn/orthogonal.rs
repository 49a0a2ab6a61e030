//! Orthogonal weight initialization
//!
//! Orthogonal matrices preserve the norm of whatever passes through them, so
//! early activations neither explode nor vanish even through a deep trunk.
//! The policy initializes every linear layer this way with a reduced gain,
//! keeping initial action means close to zero.
//!
//! Burn has no QR decomposition, so the orthogonal factor is produced by
//! modified Gram-Schmidt over a Gaussian matrix on the host, then uploaded.

use burn::module::Param;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use rand::Rng;
use rand_distr::StandardNormal;

/// Generate a `rows x cols` semi-orthogonal matrix, row-major, scaled by
/// `gain`.
///
/// The shorter side is orthonormalized: for a wide matrix the rows are
/// orthonormal, for a tall one the columns.
pub fn orthogonal_matrix(rows: usize, cols: usize, gain: f32, rng: &mut impl Rng) -> Vec<f32> {
    if rows < cols {
        // Orthogonalize the transpose, then transpose back.
        let t = orthogonal_matrix(cols, rows, gain, rng);
        let mut out = vec![0.0f32; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                out[r * cols + c] = t[c * rows + r];
            }
        }
        return out;
    }

    let mut m: Vec<f32> = (0..rows * cols).map(|_| rng.sample(StandardNormal)).collect();

    // Modified Gram-Schmidt over columns (rows >= cols, so full column rank
    // is almost sure).
    for c in 0..cols {
        for p in 0..c {
            let mut dot = 0.0f32;
            for r in 0..rows {
                dot += m[r * cols + c] * m[r * cols + p];
            }
            for r in 0..rows {
                m[r * cols + c] -= dot * m[r * cols + p];
            }
        }
        let mut norm = 0.0f32;
        for r in 0..rows {
            norm += m[r * cols + c] * m[r * cols + c];
        }
        let norm = norm.sqrt().max(1e-8);
        for r in 0..rows {
            m[r * cols + c] /= norm;
        }
    }

    for v in &mut m {
        *v *= gain;
    }
    m
}

/// A `Linear` layer with orthogonal weights and zero bias.
///
/// Burn stores linear weights as `[d_input, d_output]`; the generated factor
/// matches that layout directly.
pub fn orthogonal_linear<B: Backend>(
    d_input: usize,
    d_output: usize,
    gain: f32,
    rng: &mut impl Rng,
    device: &B::Device,
) -> Linear<B> {
    let weights = orthogonal_matrix(d_input, d_output, gain, rng);
    let mut linear = LinearConfig::new(d_input, d_output).init(device);
    linear.weight = Param::from_tensor(Tensor::from_data(
        TensorData::new(weights, [d_input, d_output]),
        device,
    ));
    linear.bias = Some(Param::from_tensor(Tensor::zeros([d_output], device)));
    linear
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn column_dot(m: &[f32], rows: usize, cols: usize, a: usize, b: usize) -> f32 {
        (0..rows).map(|r| m[r * cols + a] * m[r * cols + b]).sum()
    }

    #[test]
    fn tall_matrix_has_orthonormal_columns() {
        let mut rng = Pcg64::seed_from_u64(0);
        let (rows, cols) = (64, 16);
        let m = orthogonal_matrix(rows, cols, 1.0, &mut rng);

        for a in 0..cols {
            for b in 0..cols {
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_relative_eq!(
                    column_dot(&m, rows, cols, a, b),
                    expected,
                    epsilon = 1e-4
                );
            }
        }
    }

    #[test]
    fn wide_matrix_has_orthonormal_rows() {
        let mut rng = Pcg64::seed_from_u64(1);
        let (rows, cols) = (8, 32);
        let m = orthogonal_matrix(rows, cols, 1.0, &mut rng);

        for a in 0..rows {
            let dot: f32 = (0..cols).map(|c| m[a * cols + c] * m[a * cols + c]).sum();
            assert_relative_eq!(dot, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn gain_scales_column_norms() {
        let mut rng = Pcg64::seed_from_u64(2);
        let (rows, cols) = (32, 8);
        let m = orthogonal_matrix(rows, cols, 0.5, &mut rng);
        for c in 0..cols {
            assert_relative_eq!(column_dot(&m, rows, cols, c, c), 0.25, epsilon = 1e-4);
        }
    }
}
