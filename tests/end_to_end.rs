use mnist_backprop::{one_hot, LabeledPair, Network, NetworkBuilder, SgdConfig, TrainingPair};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Noisy images where digit d lights up its own band of 78 pixels.
fn synthetic_image<R: Rng>(digit: u8, rng: &mut R) -> Array2<f64> {
    let band = (digit as usize * 78)..(digit as usize * 78 + 78);
    Array2::from_shape_fn((784, 1), |(i, _)| {
        let noise = rng.gen_range(0.0..0.2);
        if band.contains(&i) {
            0.8 + noise
        } else {
            noise
        }
    })
}

fn synthetic_training(n: usize, rng: &mut StdRng) -> Vec<TrainingPair> {
    (0..n)
        .map(|i| {
            let d = (i % 10) as u8;
            (synthetic_image(d, rng), one_hot(d, 10).unwrap())
        })
        .collect()
}

fn all_finite(net: &Network) -> bool {
    net.weights()
        .iter()
        .chain(net.biases().iter())
        .all(|m| m.iter().all(|x| x.is_finite()))
}

#[test]
fn one_epoch_on_synthetic_digits() {
    let mut rng = StdRng::seed_from_u64(2024);
    let training = synthetic_training(100, &mut rng);

    // Every test image appears once with each of the ten labels, so exactly
    // one pair per image can be scored correct.
    let mut test: Vec<LabeledPair> = Vec::new();
    for d in 0..5u8 {
        let x = synthetic_image(d, &mut rng);
        for label in 0..10u8 {
            test.push((x.clone(), label));
        }
    }

    let mut net = NetworkBuilder::new()
        .set_layers(vec![784, 30, 10])
        .finalize(&mut rng)
        .unwrap();
    let config = SgdConfig {
        epochs: 1,
        batch_size: 10,
        learning_rate: 2.0,
        parallel: false,
    };
    let reports = net.sgd(&training, &config, Some(test.as_slice()), &mut rng).unwrap();

    assert_eq!(reports.len(), 1);
    let correct = net.evaluate(&test).unwrap();
    assert!(correct > 0 && correct < test.len());
    assert_eq!(reports[0].correct, Some(correct));
    assert!(all_finite(&net));
}

#[test]
fn training_is_reproducible_from_a_seed() {
    let run = |parallel: bool| {
        let mut rng = StdRng::seed_from_u64(7);
        let training = synthetic_training(40, &mut rng);
        let mut net = NetworkBuilder::new()
            .set_layers(vec![784, 16, 10])
            .finalize(&mut rng)
            .unwrap();
        let config = SgdConfig {
            epochs: 2,
            batch_size: 10,
            learning_rate: 3.0,
            parallel,
        };
        net.sgd(&training, &config, None, &mut rng).unwrap();
        net
    };

    let a = run(false);
    assert_eq!(a, run(false));
    assert_eq!(a, run(true));
    assert!(all_finite(&a));
}

#[test]
fn training_improves_the_cost() {
    let mut rng = StdRng::seed_from_u64(99);
    let training = synthetic_training(200, &mut rng);
    let mut net = NetworkBuilder::new()
        .set_layers(vec![784, 30, 10])
        .finalize(&mut rng)
        .unwrap();

    let total_cost = |net: &Network| -> f64 {
        training
            .iter()
            .map(|(x, y)| net.cost(x, y).unwrap())
            .sum::<f64>()
    };

    let before = total_cost(&net);
    let config = SgdConfig {
        epochs: 5,
        batch_size: 10,
        learning_rate: 3.0,
        parallel: true,
    };
    net.sgd(&training, &config, None, &mut rng).unwrap();
    assert!(total_cost(&net) < before);
}
