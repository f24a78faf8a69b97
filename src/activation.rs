//! Element-wise activation and cost functions used by forward and backward passes.

use ndarray::{Array, Array2, ArrayBase, Data, Dimension};

/// Logistic function. Negative inputs go through `exp(z) / (1 + exp(z))`
/// so `exp` never overflows.
pub fn sigmoid_scalar(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

pub fn sigmoid_prime_scalar(z: f64) -> f64 {
    let s = sigmoid_scalar(z);
    s * (1.0 - s)
}

pub fn sigmoid<S, D>(z: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    z.mapv(sigmoid_scalar)
}

pub fn sigmoid_prime<S, D>(z: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    z.mapv(sigmoid_prime_scalar)
}

/// Partial derivatives of the quadratic cost `0.5 * ||output - target||^2`
/// with respect to the output activations.
pub fn cost_derivative(output: &Array2<f64>, target: &Array2<f64>) -> Array2<f64> {
    output - target
}
