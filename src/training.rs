//! Mini-batch stochastic gradient descent.

use std::fmt;
use std::time::{Duration, Instant};

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::data::{LabeledPair, TrainingPair};
use crate::error::{Error, Result};
use crate::network::{Gradients, Network};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SgdConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Compute the per-example gradients of a batch on the rayon pool
    pub parallel: bool,
}

impl Default for SgdConfig {
    fn default() -> Self {
        SgdConfig {
            epochs: 30,
            batch_size: 10,
            learning_rate: 3.0,
            parallel: false,
        }
    }
}

impl SgdConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Configuration("batch size must be positive".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::Configuration(format!(
                "learning rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Outcome of one training epoch. `correct` is only set when an evaluation
/// set was supplied, `total` is its size.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub correct: Option<usize>,
    pub total: usize,
    pub elapsed: Duration,
}

impl EpochReport {
    pub fn accuracy(&self) -> Option<f64> {
        match self.correct {
            Some(c) if self.total > 0 => Some(c as f64 / self.total as f64),
            _ => None,
        }
    }
}

impl fmt::Display for EpochReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.correct {
            Some(c) => write!(
                f,
                "Epoch {}: {} / {} ({:.2?})",
                self.epoch, c, self.total, self.elapsed
            ),
            None => write!(f, "Epoch {} complete ({:.2?})", self.epoch, self.elapsed),
        }
    }
}

impl Network {
    /// Trains with mini-batch SGD.
    ///
    /// Every epoch shuffles the training order with `rng`, cuts it into
    /// consecutive batches of `config.batch_size` (the last one may be
    /// shorter) and takes one gradient step per batch. When `eval_data` is
    /// given it is scored after each epoch.
    ///
    /// All training pairs are shape-checked before the first update. A batch
    /// whose summed gradient, or whose updated parameters, are not finite
    /// stops training with [`Error::NonFinite`] and leaves the parameters as
    /// they were before that batch.
    pub fn sgd<R: Rng + ?Sized>(
        &mut self,
        training_data: &[TrainingPair],
        config: &SgdConfig,
        eval_data: Option<&[LabeledPair]>,
        rng: &mut R,
    ) -> Result<Vec<EpochReport>> {
        config.validate()?;
        for (input, target) in training_data {
            self.check_example(input, target)?;
        }

        info!(
            examples = training_data.len(),
            epochs = config.epochs,
            batch_size = config.batch_size,
            learning_rate = config.learning_rate,
            parallel = config.parallel,
            "starting SGD"
        );

        let mut order: Vec<usize> = (0..training_data.len()).collect();
        let mut reports = Vec::with_capacity(config.epochs);

        for epoch in 0..config.epochs {
            let start = Instant::now();
            order.shuffle(rng);

            for (batch_idx, chunk) in order.chunks(config.batch_size).enumerate() {
                let batch: Vec<&TrainingPair> = chunk.iter().map(|&i| &training_data[i]).collect();

                let nabla = self.batch_gradient(&batch, config.parallel)?;
                let committed = nabla.is_finite()
                    && self.apply_gradient(&nabla, config.learning_rate, batch.len());
                if !committed {
                    return Err(Error::NonFinite {
                        epoch,
                        batch: batch_idx,
                    });
                }
                debug!(epoch, batch = batch_idx, size = batch.len(), "batch applied");
            }

            let correct = match eval_data {
                Some(data) => Some(self.evaluate(data)?),
                None => None,
            };
            let report = EpochReport {
                epoch,
                correct,
                total: eval_data.map_or(0, |d| d.len()),
                elapsed: start.elapsed(),
            };
            info!("{}", report);
            reports.push(report);
        }

        Ok(reports)
    }

    /// Sum of the per-example gradients of `batch`.
    ///
    /// With `parallel` the examples are spread over the rayon pool; their
    /// gradients are still summed in batch order, so both paths give the same
    /// result.
    pub fn batch_gradient(&self, batch: &[&TrainingPair], parallel: bool) -> Result<Gradients> {
        let mut sum = Gradients::zeros_like(self);

        if parallel {
            let per_example = batch
                .par_iter()
                .map(|(x, y)| self.backprop(x, y))
                .collect::<Result<Vec<Gradients>>>()?;
            for g in &per_example {
                sum.accumulate(g);
            }
        } else {
            for (x, y) in batch {
                sum.accumulate(&self.backprop(x, y)?);
            }
        }

        Ok(sum)
    }

    /// Moves every parameter against `nabla`, scaled by
    /// `learning_rate / batch_len`.
    ///
    /// The step is computed into fresh matrices and only committed when every
    /// resulting entry is finite; otherwise nothing changes and `false` is
    /// returned. `nabla` must come from this network.
    pub(crate) fn apply_gradient(
        &mut self,
        nabla: &Gradients,
        learning_rate: f64,
        batch_len: usize,
    ) -> bool {
        if batch_len == 0 {
            return true;
        }
        let step = learning_rate / batch_len as f64;

        let stepped = |params: &[Array2<f64>], grads: &[Array2<f64>]| -> Vec<Array2<f64>> {
            params
                .iter()
                .zip(grads.iter())
                .map(|(p, g)| {
                    let mut p = p.clone();
                    p.scaled_add(-step, g);
                    p
                })
                .collect()
        };
        let biases = stepped(&self.biases, &nabla.biases);
        let weights = stepped(&self.weights, &nabla.weights);

        if !biases
            .iter()
            .chain(weights.iter())
            .all(|m| m.iter().all(|x| x.is_finite()))
        {
            return false;
        }

        self.biases = biases;
        self.weights = weights;
        true
    }
}
