use crate::{NdArray, Shape, WeightConfig};

/// Scale applied to standard normal samples by the `"normal"` filler.
pub const NORMAL_SCALE: f32 = 0.01;

/// Initialization policy of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filler<'a> {
    /// Restores a snapshot: the shape and native-endian `f32` bytes are taken verbatim.
    Data { shape: Shape, bytes: &'a [u8] },
    /// Standard normal samples scaled by [`NORMAL_SCALE`].
    Normal,
    Zero,
    One,
}

impl<'a> Filler<'a> {
    /// # Panics
    ///
    /// If `config.filler` names no known filler.
    #[track_caller]
    pub fn parse(config: &'a WeightConfig) -> Self {
        match config.filler.as_str() {
            "data" => Filler::Data {
                shape: Shape::from(config.shape.as_slice()),
                bytes: &config.data,
            },
            "normal" => Filler::Normal,
            "zero" => Filler::Zero,
            "one" => Filler::One,
            other => panic!("unknown filler {other:?}"),
        }
    }

    /// The initial value of a parameter declared with `shape`. Snapshot data brings its own shape.
    #[track_caller]
    pub fn fill(&self, shape: impl Into<Shape>) -> NdArray {
        match self {
            Filler::Data { shape, bytes } => NdArray::from_bytes(bytes, shape.clone()),
            Filler::Normal => {
                let mut value = NdArray::randn(shape);
                value *= NORMAL_SCALE;
                value
            }
            Filler::Zero => NdArray::zeros(shape),
            Filler::One => NdArray::filled(1.0, shape),
        }
    }
}

impl WeightConfig {
    /// A `"data"` filler restoring `value`.
    pub fn from_value(value: &NdArray) -> Self {
        Self {
            filler: "data".to_owned(),
            shape: value.shape().dims().to_vec(),
            data: value.to_bytes(),
        }
    }
}
