use ndarray::Array2;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;
use tracing::debug;

use crate::activation::{cost_derivative, sigmoid, sigmoid_prime};
use crate::data::LabeledPair;
use crate::error::{Error, Result};

pub const MNIST_INPUT: usize = 784;
pub const MNIST_CLASSES: usize = 10;

/// Fully connected sigmoid network.
///
/// `weights[i]` has shape `(sizes[i + 1], sizes[i])` and `biases[i]` has shape
/// `(sizes[i + 1], 1)`; entry `[[r, c]]` of a weight matrix connects neuron `c`
/// of the source layer to neuron `r` of the destination layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub(crate) sizes: Vec<usize>,
    pub(crate) biases: Vec<Array2<f64>>,
    pub(crate) weights: Vec<Array2<f64>>,
}

/// Per-parameter partial derivatives, ordered input to output like the
/// parameters they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub biases: Vec<Array2<f64>>,
    pub weights: Vec<Array2<f64>>,
}

impl Gradients {
    pub fn zeros_like(net: &Network) -> Gradients {
        Gradients {
            biases: net
                .biases
                .iter()
                .map(|b| Array2::zeros(b.raw_dim()))
                .collect(),
            weights: net
                .weights
                .iter()
                .map(|w| Array2::zeros(w.raw_dim()))
                .collect(),
        }
    }

    pub(crate) fn accumulate(&mut self, other: &Gradients) {
        self.biases
            .iter_mut()
            .zip(other.biases.iter())
            .for_each(|(y, x)| *y += x);
        self.weights
            .iter_mut()
            .zip(other.weights.iter())
            .for_each(|(y, x)| *y += x);
    }

    pub fn is_finite(&self) -> bool {
        self.biases
            .iter()
            .chain(self.weights.iter())
            .all(|m| m.iter().all(|x| x.is_finite()))
    }
}

// Values kept from the forward pass for the backward pass. Dropped as soon as
// the gradient of its example is built.
struct ForwardTrace {
    zs: Vec<Array2<f64>>,
    activations: Vec<Array2<f64>>,
}

fn check_column(what: &'static str, v: &Array2<f64>, rows: usize) -> Result<()> {
    if v.dim() != (rows, 1) {
        return Err(Error::ShapeMismatch {
            what,
            expected: (rows, 1),
            got: v.dim(),
        });
    }
    Ok(())
}

fn argmax(v: &Array2<f64>) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &x)| {
            if x > best.1 {
                (i, x)
            } else {
                best
            }
        })
        .0
}

impl Network {
    /// Builds a network from explicit parameters. Layer sizes are read off the
    /// matrix shapes, which must chain together.
    pub fn from_parameters(biases: Vec<Array2<f64>>, weights: Vec<Array2<f64>>) -> Result<Network> {
        if weights.is_empty() || weights.len() != biases.len() {
            return Err(Error::Configuration(format!(
                "expected matching non-empty parameter lists, got {} bias vectors and {} weight matrices",
                biases.len(),
                weights.len()
            )));
        }

        let mut sizes = vec![weights[0].ncols()];
        for (i, (b, w)) in biases.iter().zip(weights.iter()).enumerate() {
            let source = sizes[i];
            if w.ncols() != source || w.nrows() == 0 || b.dim() != (w.nrows(), 1) {
                return Err(Error::Configuration(format!(
                    "transition {}: weights {:?} and biases {:?} do not fit a {}-neuron source layer",
                    i,
                    w.dim(),
                    b.dim(),
                    source
                )));
            }
            sizes.push(w.nrows());
        }
        if sizes[0] == 0 {
            return Err(Error::Configuration("input layer is empty".to_string()));
        }

        Ok(Network {
            sizes,
            biases,
            weights,
        })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn num_layers(&self) -> usize {
        self.sizes.len()
    }

    pub fn input_size(&self) -> usize {
        self.sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    pub fn biases(&self) -> &[Array2<f64>] {
        &self.biases
    }

    pub fn weights(&self) -> &[Array2<f64>] {
        &self.weights
    }

    pub(crate) fn check_example(&self, input: &Array2<f64>, target: &Array2<f64>) -> Result<()> {
        check_column("input", input, self.input_size())?;
        check_column("target", target, self.output_size())
    }

    /// Output activations for a `(input_size, 1)` column vector.
    pub fn feedforward(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        check_column("input", input, self.input_size())?;

        let mut a = input.clone();
        for (b, w) in self.biases.iter().zip(self.weights.iter()) {
            a = sigmoid(&(w.dot(&a) + b));
        }
        Ok(a)
    }

    fn forward_trace(&self, input: &Array2<f64>) -> ForwardTrace {
        let mut zs = Vec::with_capacity(self.weights.len());
        let mut activations = Vec::with_capacity(self.sizes.len());
        activations.push(input.clone());

        for (b, w) in self.biases.iter().zip(self.weights.iter()) {
            let z = w.dot(&activations[activations.len() - 1]) + b;
            activations.push(sigmoid(&z));
            zs.push(z);
        }

        ForwardTrace { zs, activations }
    }

    /// Gradient of the quadratic cost of one example with respect to every
    /// bias and weight.
    pub fn backprop(&self, input: &Array2<f64>, target: &Array2<f64>) -> Result<Gradients> {
        self.check_example(input, target)?;

        let ForwardTrace { zs, activations } = self.forward_trace(input);
        let n = self.weights.len();

        let mut b_ret: Vec<Array2<f64>> = Vec::with_capacity(n);
        let mut w_ret: Vec<Array2<f64>> = Vec::with_capacity(n);

        // dC/dz for the output layer
        let mut delta = cost_derivative(&activations[n], target) * sigmoid_prime(&zs[n - 1]);

        for l in (0..n).rev() {
            w_ret.push(delta.dot(&activations[l].t()));
            if l > 0 {
                let back = self.weights[l].t().dot(&delta) * sigmoid_prime(&zs[l - 1]);
                b_ret.push(std::mem::replace(&mut delta, back));
            } else {
                b_ret.push(delta.clone());
            }
        }

        b_ret.reverse();
        w_ret.reverse();

        Ok(Gradients {
            biases: b_ret,
            weights: w_ret,
        })
    }

    /// Quadratic cost `0.5 * ||a - y||^2` of one example.
    pub fn cost(&self, input: &Array2<f64>, target: &Array2<f64>) -> Result<f64> {
        self.check_example(input, target)?;
        let output = self.feedforward(input)?;
        Ok(0.5 * (&output - target).mapv(|d| d * d).sum())
    }

    /// Index of the most activated output neuron. NaN outputs never win, so an
    /// output that is entirely NaN predicts class 0.
    pub fn predict(&self, input: &Array2<f64>) -> Result<usize> {
        Ok(argmax(&self.feedforward(input)?))
    }

    /// Number of examples whose prediction equals their label.
    pub fn evaluate(&self, data: &[LabeledPair]) -> Result<usize> {
        let mut answer = 0;
        for (input, label) in data {
            if self.predict(input)? == *label as usize {
                answer += 1;
            }
        }
        Ok(answer)
    }
}

pub struct NetworkBuilder {
    layers: Vec<usize>,
    input_size: usize,
    output_size: usize,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        NetworkBuilder::new()
    }
}

impl NetworkBuilder {
    pub fn new() -> NetworkBuilder {
        NetworkBuilder {
            layers: vec![],
            input_size: MNIST_INPUT,
            output_size: MNIST_CLASSES,
        }
    }

    pub fn set_layers(&mut self, arg: Vec<usize>) -> &mut NetworkBuilder {
        self.layers = arg;
        self
    }

    /// Overrides the required first and last layer sizes (784 and 10 by default).
    pub fn set_io(&mut self, input_size: usize, output_size: usize) -> &mut NetworkBuilder {
        self.input_size = input_size;
        self.output_size = output_size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(Error::Configuration(format!(
                "network needs at least an input and an output layer, got {} layer(s)",
                self.layers.len()
            )));
        }
        if let Some(i) = self.layers.iter().position(|&n| n == 0) {
            return Err(Error::Configuration(format!("layer {} is empty", i)));
        }
        if self.layers[0] != self.input_size {
            return Err(Error::Configuration(format!(
                "input layer must have {} neurons, got {}",
                self.input_size, self.layers[0]
            )));
        }
        let last = self.layers[self.layers.len() - 1];
        if last != self.output_size {
            return Err(Error::Configuration(format!(
                "output layer must have {} neurons, got {}",
                self.output_size, last
            )));
        }
        Ok(())
    }

    /// Draws every weight and bias from a standard normal distribution.
    pub fn finalize<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network> {
        self.validate()?;

        let biases: Vec<Array2<f64>> = self
            .layers
            .iter()
            .skip(1)
            .map(|&y| Array2::random_using((y, 1), StandardNormal, rng))
            .collect();

        let weights: Vec<Array2<f64>> = self
            .layers
            .iter()
            .skip(1)
            .zip(self.layers.iter())
            .map(|(&y, &x)| Array2::random_using((y, x), StandardNormal, rng))
            .collect();

        debug!(layers = ?self.layers, "initialised network");

        Ok(Network {
            sizes: self.layers.clone(),
            biases,
            weights,
        })
    }
}
