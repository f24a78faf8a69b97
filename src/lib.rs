//! Sigmoid feed-forward network for MNIST digits, trained with hand-written
//! backpropagation and mini-batch stochastic gradient descent.
//!
//! ```no_run
//! use mnist_backprop::{DataConfig, MnistData, NetworkBuilder, SgdConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let data = MnistData::load(&DataConfig::default()).unwrap();
//! let mut rng = StdRng::seed_from_u64(0);
//! let mut net = NetworkBuilder::new()
//!     .set_layers(vec![784, 30, 10])
//!     .finalize(&mut rng)
//!     .unwrap();
//! net.sgd(&data.training, &SgdConfig::default(), Some(data.test.as_slice()), &mut rng)
//!     .unwrap();
//! ```

pub mod activation;
pub mod data;
pub mod error;
pub mod network;
pub mod training;

pub use data::{one_hot, DataConfig, LabeledPair, MnistData, TrainingPair};
pub use error::{Error, Result};
pub use network::{Gradients, Network, NetworkBuilder, MNIST_CLASSES, MNIST_INPUT};
pub use training::{EpochReport, SgdConfig};
