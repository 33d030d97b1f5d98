//! Configuration records, stored as JSON.

use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Error, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Train,
    Infer,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Train, Phase::Infer];

    pub const fn index(self) -> usize {
        match self {
            Phase::Train => 0,
            Phase::Infer => 1,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Train => write!(f, "train"),
            Phase::Infer => write!(f, "infer"),
        }
    }
}

/// A network as a list of layers linked by name.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub phase: Phase,
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the next layer, empty for the last layer of a chain.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    /// Phases the layer takes part in. A layer listing none takes part in both.
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub input_size: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub output_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affine: Option<AffineConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set: Option<DataSetConfig>,
}

fn is_zero(x: &usize) -> bool {
    *x == 0
}

impl LayerConfig {
    /// A layer serving both phases, with no successor.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            phases: Phase::ALL.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_phases(mut self, phases: impl IntoIterator<Item = Phase>) -> Self {
        self.phases = phases.into_iter().collect();
        self
    }

    pub fn with_sizes(mut self, input_size: usize, output_size: usize) -> Self {
        self.input_size = input_size;
        self.output_size = output_size;
        self
    }

    pub fn with_affine(mut self, weight: WeightConfig, bias: WeightConfig) -> Self {
        self.affine = Some(AffineConfig { weight, bias });
        self
    }

    pub fn with_data_set(mut self, data_set: DataSetConfig) -> Self {
        self.data_set = Some(data_set);
        self
    }

    pub fn serves(&self, phase: Phase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineConfig {
    pub weight: WeightConfig,
    pub bias: WeightConfig,
}

/// How a parameter is initialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    /// `"normal"`, `"zero"`, `"one"`, or `"data"` to restore `data` verbatim.
    pub filler: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shape: Vec<usize>,
    /// Native-endian `f32` bytes, used by the `"data"` filler.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl WeightConfig {
    pub fn filler(filler: impl Into<String>) -> Self {
        Self {
            filler: filler.into(),
            shape: Vec::new(),
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetConfig {
    pub data_path: PathBuf,
    /// Bytes per example in the data file.
    pub data_block: usize,
    pub label_path: PathBuf,
    /// Bytes per example in the label file.
    #[serde(default = "default_label_block")]
    pub label_block: usize,
    pub batch_size: usize,
}

fn default_label_block() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// `"sgd"`, `"momentum"` or `"ada_grad"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub lr: f32,
    #[serde(default = "default_momentum")]
    pub momentum: f32,
}

fn default_momentum() -> f32 {
    0.9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Path of the [`NetworkConfig`], relative to the directory of the trainer configuration.
    pub network: PathBuf,
    pub max_iter: usize,
    /// Accuracy is measured every `test_interval` iterations, never if zero.
    #[serde(default)]
    pub test_interval: usize,
    pub optimizer: OptimizerConfig,
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(Error::io(path))?;
    Ok(serde_json::from_str(&text)?)
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(Error::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network() {
        let text = r#"{
            "phase": "infer",
            "layers": [
                {
                    "name": "fc1",
                    "type": "Affine",
                    "output": "relu1",
                    "phases": ["train", "infer"],
                    "input_size": 784,
                    "output_size": 100,
                    "affine": {
                        "weight": { "filler": "normal" },
                        "bias": { "filler": "zero" }
                    }
                },
                { "name": "relu1", "type": "Relu" }
            ]
        }"#;
        let config: NetworkConfig = serde_json::from_str(text).unwrap();
        assert_eq!(config.phase, Phase::Infer);
        assert_eq!(config.layers.len(), 2);
        let fc1 = &config.layers[0];
        assert_eq!(fc1.kind, "Affine");
        assert!(fc1.serves(Phase::Train) && fc1.serves(Phase::Infer));
        assert_eq!(fc1.affine.as_ref().unwrap().weight.filler, "normal");
        let relu1 = &config.layers[1];
        assert!(relu1.output.is_empty());
        assert!(relu1.phases.is_empty());
        assert!(relu1.serves(Phase::Train) && relu1.serves(Phase::Infer));
    }

    #[test]
    fn test_defaults() {
        let optimizer: OptimizerConfig =
            serde_json::from_str(r#"{ "type": "momentum", "lr": 0.1 }"#).unwrap();
        assert_eq!(optimizer.momentum, 0.9);
        let data_set: DataSetConfig = serde_json::from_str(
            r#"{ "data_path": "a", "data_block": 4, "label_path": "b", "batch_size": 2 }"#,
        )
        .unwrap();
        assert_eq!(data_set.label_block, 1);
        let network: NetworkConfig = serde_json::from_str(r#"{ "layers": [] }"#).unwrap();
        assert_eq!(network.phase, Phase::Train);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let config = NetworkConfig {
            phase: Phase::Infer,
            layers: vec![
                LayerConfig::new("fc", "Affine")
                    .with_output("out")
                    .with_sizes(2, 1)
                    .with_affine(
                        WeightConfig {
                            filler: "data".into(),
                            shape: vec![2, 1],
                            data: vec![0, 0, 128, 63, 0, 0, 0, 64],
                        },
                        WeightConfig::filler("zero"),
                    ),
                LayerConfig::new("out", "Softmax"),
            ],
        };
        write_json(&path, &config).unwrap();
        let restored: NetworkConfig = read_json(&path).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = read_json::<NetworkConfig>(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(Error::Io { .. })));
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_json::<NetworkConfig>(&path), Err(Error::Json(_))));
    }
}
