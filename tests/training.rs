mod common;

use nnchain::{
    IterationState, LayerRegistry, NdArray, Network, NetworkConfig, Node, OptimizerConfig, Phase,
    Predictor, Trainer, TrainerConfig, config, optim,
};

fn sgd(lr: f32) -> OptimizerConfig {
    OptimizerConfig {
        kind: "sgd".to_owned(),
        lr,
        momentum: 0.9,
    }
}

#[test]
fn test_training_lowers_loss_and_separates_classes() {
    let dir = tempfile::tempdir().unwrap();
    let mut network = Network::load(
        &LayerRegistry::default(),
        &common::classifier_in(dir.path(), 64),
    )
    .unwrap();
    let mut optimizer = optim::create(&sgd(0.5), &network.weights());
    let mut state = IterationState::new();
    let mut input = Node::default();
    let mut output = Node::default();
    let mut losses = Vec::new();
    for _ in 0..300 {
        state.reset();
        network.forward(&mut state, &input, &mut output);
        network.backward(&state, &output, &mut input);
        optimizer.step(&mut network.weights_mut());
        losses.push(state.loss());
    }
    assert_eq!(state.batch_size(), 64);
    assert_eq!(output.value.shape().dims(), &[64, 2]);
    assert!(losses[0] > 0.5, "initial loss {}", losses[0]);
    assert!(losses[299] < 0.1 * losses[0], "{losses:?}");
    assert_eq!(network.accuracy(&mut state), 1.0);
}

#[test]
fn test_sampled_batches_train_too() {
    let dir = tempfile::tempdir().unwrap();
    let mut network = Network::load(
        &LayerRegistry::default(),
        &common::classifier_in(dir.path(), 8),
    )
    .unwrap();
    let mut optimizer = optim::create(
        &OptimizerConfig {
            kind: "ada_grad".to_owned(),
            lr: 0.1,
            momentum: 0.0,
        },
        &network.weights(),
    );
    let mut state = IterationState::new();
    let (mut input, mut output) = (Node::default(), Node::default());
    for _ in 0..500 {
        state.reset();
        network.forward(&mut state, &input, &mut output);
        assert_eq!(state.raw_labels().len(), 8);
        network.backward(&state, &output, &mut input);
        optimizer.step(&mut network.weights_mut());
    }
    assert_eq!(network.accuracy(&mut state), 1.0);
}

#[test]
fn test_trainer_writes_a_model_the_predictor_loads() {
    let dir = tempfile::tempdir().unwrap();
    config::write_json(
        dir.path().join("network.json"),
        &common::classifier_in(dir.path(), 64),
    )
    .unwrap();
    let trainer_config = TrainerConfig {
        network: "network.json".into(),
        max_iter: 300,
        test_interval: 100,
        optimizer: OptimizerConfig {
            kind: "momentum".to_owned(),
            lr: 0.1,
            momentum: 0.9,
        },
    };
    let trainer_path = dir.path().join("trainer.json");
    config::write_json(&trainer_path, &trainer_config).unwrap();

    let model_path = dir.path().join("model.json");
    let mut trainer = Trainer::load(&trainer_path, &LayerRegistry::default()).unwrap();
    assert_eq!(trainer.network().phase(), Phase::Train);
    trainer.train_to(&model_path).unwrap();

    let model: NetworkConfig = config::read_json(&model_path).unwrap();
    assert_eq!(model.phase, Phase::Infer);
    let kinds: Vec<&str> = model.layers.iter().map(|l| l.kind.as_str()).collect();
    assert_eq!(kinds, ["Data", "Affine", "Relu", "Affine", "Softmax"]);
    let fc2 = model.layers[3].affine.as_ref().unwrap();
    assert_eq!(fc2.weight.filler, "data");
    assert_eq!(fc2.weight.shape, [2, 2]);
    assert_eq!(fc2.weight.data.len(), 4 * size_of::<f32>());

    let predictor = Predictor::load(&model_path, &LayerRegistry::default()).unwrap();
    let (data, labels) = common::separable_examples(10);
    for (example, &label) in data.chunks_exact(2).zip(&labels) {
        let features: Vec<f32> = example.iter().map(|&b| b as f32 / 255.0).collect();
        let input = NdArray::from_slice(&features, [1, 2]);
        let mut output = NdArray::new();
        predictor.predict(&input, &mut output);
        assert_eq!(output.shape().dims(), &[1, 2]);
        assert_eq!(common::argmax(output.as_slice()), label as usize);
    }
}

#[test]
fn test_trainer_from_config_matches_trained_network() {
    let dir = tempfile::tempdir().unwrap();
    config::write_json(
        dir.path().join("net.json"),
        &common::classifier_in(dir.path(), 64),
    )
    .unwrap();
    let trainer_config = TrainerConfig {
        network: "net.json".into(),
        max_iter: 50,
        test_interval: 0,
        optimizer: sgd(0.5),
    };
    let mut trainer =
        Trainer::from_config(&trainer_config, dir.path(), &LayerRegistry::default()).unwrap();
    let snapshot = trainer.train();
    let trained: Vec<NdArray> = trainer
        .network()
        .weights()
        .into_iter()
        .map(|w| w.value())
        .collect();
    let predictor = Predictor::from_config(snapshot, &LayerRegistry::default()).unwrap();
    let restored: Vec<NdArray> = predictor
        .network()
        .weights()
        .into_iter()
        .map(|w| w.value())
        .collect();
    assert_eq!(restored, trained);
}

#[test]
fn test_predict_writes_into_callers_buffer() {
    let config = common::infer_classifier();
    let predictor = Predictor::from_config(config, &LayerRegistry::default()).unwrap();
    let input = NdArray::from_slice(&[0.9, 0.1, 0.2, 0.7, 0.0, 0.0], [3, 2]);

    let mut output = NdArray::filled(f32::NAN, [3, 2]);
    predictor.predict(&input, &mut output);
    assert_eq!(output.shape().dims(), &[3, 2]);
    for row in output.as_slice().chunks_exact(2) {
        assert!((row[0] + row[1] - 1.0).abs() < 1e-6, "{row:?}");
    }

    // Room for more than the result: only relabeled.
    let mut larger = NdArray::filled(f32::NAN, [4, 3]);
    predictor.predict(&input, &mut larger);
    assert_eq!(larger.shape().dims(), &[3, 2]);
    assert_eq!(larger, output);

    // Too little room: the result is copied back.
    let mut smaller = NdArray::zeros([1]);
    predictor.predict(&input, &mut smaller);
    assert_eq!(smaller, output);
}
