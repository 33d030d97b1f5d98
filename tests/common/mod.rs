#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use nnchain::{
    DATA_HEADER, DataSetConfig, LABEL_HEADER, LayerConfig, NdArray, NetworkConfig, Phase,
    WeightConfig,
};

/// Two well separated classes of two-byte examples: class 0 is bright in its first byte, class 1
/// in its second.
pub fn separable_examples(count: usize) -> (Vec<u8>, Vec<u8>) {
    let mut data = Vec::with_capacity(count * 2);
    let mut labels = Vec::with_capacity(count);
    for i in 0..count {
        let bright = 200 + (i % 50) as u8;
        let dim = (i % 20) as u8;
        let label = (i % 2) as u8;
        match label {
            0 => data.extend([bright, dim]),
            _ => data.extend([dim, bright]),
        }
        labels.push(label);
    }
    (data, labels)
}

/// Writes `data` and `labels` behind zeroed headers, as the data layer expects them.
pub fn write_data_set(
    dir: &Path,
    prefix: &str,
    data: &[u8],
    labels: &[u8],
    batch_size: usize,
) -> DataSetConfig {
    let data_path = dir.join(format!("{prefix}-data.bin"));
    let label_path = dir.join(format!("{prefix}-labels.bin"));
    let mut bytes = vec![0u8; DATA_HEADER];
    bytes.extend_from_slice(data);
    fs::write(&data_path, bytes).unwrap();
    let mut bytes = vec![0u8; LABEL_HEADER];
    bytes.extend_from_slice(labels);
    fs::write(&label_path, bytes).unwrap();
    DataSetConfig {
        data_path,
        data_block: 2,
        label_path,
        label_block: 1,
        batch_size,
    }
}

/// A data set whose files don't exist, for networks that never open them.
pub fn unopened_data_set() -> DataSetConfig {
    DataSetConfig {
        data_path: PathBuf::from("/nonexistent/data.bin"),
        data_block: 2,
        label_path: PathBuf::from("/nonexistent/labels.bin"),
        label_block: 1,
        batch_size: 4,
    }
}

/// `train data -> fc1 -> relu -> fc2 -> loss`, with `test data` heading the infer chain.
///
/// `fc1` starts as the identity so the network separates the classes from the first iteration.
pub fn classifier(train: DataSetConfig, test: DataSetConfig) -> NetworkConfig {
    let identity = NdArray::from_slice(&[1.0, 0.0, 0.0, 1.0], [2, 2]);
    NetworkConfig {
        phase: Phase::Train,
        layers: vec![
            LayerConfig::new("train", "Data")
                .with_output("fc1")
                .with_phases([Phase::Train])
                .with_data_set(train),
            LayerConfig::new("test", "Data")
                .with_output("fc1")
                .with_phases([Phase::Infer])
                .with_data_set(test),
            LayerConfig::new("fc1", "Affine")
                .with_output("relu")
                .with_sizes(2, 2)
                .with_affine(
                    WeightConfig::from_value(&identity),
                    WeightConfig::filler("zero"),
                ),
            LayerConfig::new("relu", "Relu").with_output("fc2"),
            LayerConfig::new("fc2", "Affine")
                .with_output("loss")
                .with_sizes(2, 2)
                .with_affine(WeightConfig::filler("normal"), WeightConfig::filler("zero")),
            LayerConfig::new("loss", "SoftmaxWithLoss"),
        ],
    }
}

/// The classifier in the infer phase, where its data layers are skipped.
pub fn infer_classifier() -> NetworkConfig {
    let mut config = classifier(unopened_data_set(), unopened_data_set());
    config.phase = Phase::Infer;
    config
}

/// The classifier over freshly written train and test sets in `dir`.
pub fn classifier_in(dir: &Path, batch_size: usize) -> NetworkConfig {
    let (data, labels) = separable_examples(64);
    let train = write_data_set(dir, "train", &data, &labels, batch_size);
    let (data, labels) = separable_examples(16);
    let test = write_data_set(dir, "test", &data, &labels, 16);
    classifier(train, test)
}

pub fn argmax(row: &[f32]) -> usize {
    nnchain::ops::argmax(row)
}
