//! Training and evaluation pairs, and loading them from the MNIST idx files.
//!
//! Training pairs carry one-hot targets, evaluation pairs carry the raw digit.
//! Going from one form to the other is always an explicit call.

use std::path::{Path, PathBuf};

use mnist::{Mnist, MnistBuilder};
use ndarray::Array2;
use tracing::info;

use crate::error::{Error, Result};
use crate::network::{MNIST_CLASSES, MNIST_INPUT};

/// `(input column vector, one-hot target column vector)`
pub type TrainingPair = (Array2<f64>, Array2<f64>);

/// `(input column vector, digit label)`
pub type LabeledPair = (Array2<f64>, u8);

const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const TRAIN_FILE_IMAGES: u32 = 60_000;
const TEST_FILE_IMAGES: u32 = 10_000;

pub fn one_hot(label: u8, classes: usize) -> Result<Array2<f64>> {
    if label as usize >= classes {
        return Err(Error::InvalidLabel { label, classes });
    }
    let mut v = Array2::zeros((classes, 1));
    v[[label as usize, 0]] = 1.0;
    Ok(v)
}

pub fn to_training_pairs(data: Vec<LabeledPair>, classes: usize) -> Result<Vec<TrainingPair>> {
    data.into_iter()
        .map(|(x, label)| Ok((x, one_hot(label, classes)?)))
        .collect()
}

/// Splits a flat buffer of 8-bit images into column vectors of `pixels`
/// values scaled to `[0, 1]`, paired with their labels.
pub fn pairs_from_raw(images: &[u8], labels: &[u8], pixels: usize) -> Result<Vec<LabeledPair>> {
    if pixels == 0 || images.len() != labels.len() * pixels {
        return Err(Error::ShapeMismatch {
            what: "image buffer",
            expected: (labels.len() * pixels, 1),
            got: (images.len(), 1),
        });
    }

    Ok(images
        .chunks(pixels)
        .zip(labels.iter())
        .map(|(img, &lbl)| {
            let x = Array2::from_shape_fn((pixels, 1), |(i, _)| f64::from(img[i]) / 255.0);
            (x, lbl)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    /// Directory holding the four uncompressed idx files
    pub base_path: PathBuf,
    pub training_len: u32,
    pub validation_len: u32,
    pub test_len: u32,
    /// Fetch missing files first (needs the `download` feature)
    pub download: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            base_path: PathBuf::from("data"),
            training_len: 50_000,
            validation_len: 10_000,
            test_len: 10_000,
            download: false,
        }
    }
}

impl DataConfig {
    fn validate(&self) -> Result<()> {
        if self.training_len == 0 {
            return Err(Error::Configuration("training set is empty".to_string()));
        }
        if self.training_len as u64 + self.validation_len as u64 > TRAIN_FILE_IMAGES as u64 {
            return Err(Error::Configuration(format!(
                "training ({}) and validation ({}) sets exceed the {} training images",
                self.training_len, self.validation_len, TRAIN_FILE_IMAGES
            )));
        }
        if self.test_len > TEST_FILE_IMAGES {
            return Err(Error::Configuration(format!(
                "test set ({}) exceeds the {} test images",
                self.test_len, TEST_FILE_IMAGES
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MnistData {
    pub training: Vec<TrainingPair>,
    pub validation: Vec<LabeledPair>,
    pub test: Vec<LabeledPair>,
}

impl MnistData {
    pub fn load(config: &DataConfig) -> Result<MnistData> {
        config.validate()?;

        let dir = config.base_path.to_str().ok_or_else(|| {
            Error::Configuration(format!(
                "data path is not valid UTF-8: {}",
                config.base_path.display()
            ))
        })?;
        let dir = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{}/", dir)
        };

        let mut builder = MnistBuilder::new();
        builder
            .base_path(&dir)
            .label_format_digit()
            .training_set_length(config.training_len)
            .validation_set_length(config.validation_len)
            .test_set_length(config.test_len);

        if config.download {
            download(&mut builder)?;
        } else {
            for name in &[TRAIN_IMAGES, TRAIN_LABELS, TEST_IMAGES, TEST_LABELS] {
                let path = Path::new(&dir).join(name);
                if !path.is_file() {
                    return Err(Error::MissingData(path));
                }
            }
        }

        let Mnist {
            trn_img,
            trn_lbl,
            val_img,
            val_lbl,
            tst_img,
            tst_lbl,
            ..
        } = builder.finalize();

        let training = to_training_pairs(
            pairs_from_raw(&trn_img, &trn_lbl, MNIST_INPUT)?,
            MNIST_CLASSES,
        )?;
        let validation = pairs_from_raw(&val_img, &val_lbl, MNIST_INPUT)?;
        let test = pairs_from_raw(&tst_img, &tst_lbl, MNIST_INPUT)?;

        info!(
            training = training.len(),
            validation = validation.len(),
            test = test.len(),
            "loaded MNIST from {}",
            dir
        );

        Ok(MnistData {
            training,
            validation,
            test,
        })
    }
}

#[cfg(feature = "download")]
fn download(builder: &mut MnistBuilder<'_>) -> Result<()> {
    builder.download_and_extract();
    Ok(())
}

#[cfg(not(feature = "download"))]
fn download(_builder: &mut MnistBuilder<'_>) -> Result<()> {
    Err(Error::Configuration(
        "downloading MNIST requires the `download` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_marks_single_class() {
        let v = one_hot(3, 10).unwrap();
        assert_eq!(v.dim(), (10, 1));
        assert_eq!(v.sum(), 1.0);
        assert_eq!(v[[3, 0]], 1.0);
    }

    #[test]
    fn one_hot_rejects_out_of_range_label() {
        assert_eq!(
            one_hot(10, 10),
            Err(Error::InvalidLabel {
                label: 10,
                classes: 10
            })
        );
    }

    #[test]
    fn training_pairs_keep_inputs() {
        let x = Array2::from_elem((4, 1), 0.5);
        let pairs = to_training_pairs(vec![(x.clone(), 2), (x.clone(), 0)], 3).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, x);
        assert_eq!(pairs[0].1, one_hot(2, 3).unwrap());
        assert_eq!(pairs[1].1, one_hot(0, 3).unwrap());

        assert!(to_training_pairs(vec![(x, 7)], 3).is_err());
    }

    #[test]
    fn raw_buffers_are_scaled_and_split() {
        let images = [0u8, 255, 51, 102, 0, 255];
        let labels = [4u8, 9];
        let pairs = pairs_from_raw(&images, &labels, 3).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.dim(), (3, 1));
        assert_eq!(pairs[0].0[[1, 0]], 1.0);
        assert!((pairs[0].0[[2, 0]] - 0.2).abs() < 1e-12);
        assert_eq!(pairs[0].1, 4);
        assert!((pairs[1].0[[0, 0]] - 0.4).abs() < 1e-12);
        assert_eq!(pairs[1].1, 9);
    }

    #[test]
    fn raw_buffer_length_must_match_labels() {
        let res = pairs_from_raw(&[0u8; 5], &[1, 2], 3);
        assert!(matches!(
            res,
            Err(Error::ShapeMismatch {
                what: "image buffer",
                expected: (6, 1),
                got: (5, 1)
            })
        ));
    }

    #[test]
    fn missing_files_are_reported() {
        let config = DataConfig {
            base_path: PathBuf::from("/nonexistent/mnist-dir"),
            ..DataConfig::default()
        };
        match MnistData::load(&config) {
            Err(Error::MissingData(path)) => assert!(path.ends_with(TRAIN_IMAGES)),
            other => panic!("unexpected {:?}", other.map(|d| d.training.len())),
        }
    }

    #[test]
    fn oversized_splits_are_rejected() {
        let config = DataConfig {
            training_len: 55_000,
            validation_len: 10_000,
            ..DataConfig::default()
        };
        assert!(matches!(
            MnistData::load(&config),
            Err(Error::Configuration(_))
        ));

        let config = DataConfig {
            test_len: 10_001,
            ..DataConfig::default()
        };
        assert!(matches!(
            MnistData::load(&config),
            Err(Error::Configuration(_))
        ));
    }
}
