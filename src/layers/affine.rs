use crate::{
    Filler, LayerConfig, Node, Parameter, WeightConfig,
    ops::{self, Reduction, Transpose},
};

/// Fully connected layer, `y = x·W + b`.
#[derive(Debug)]
pub struct AffineLayer {
    /// `{input_size, output_size}`
    weight: Parameter,
    /// `{output_size}`
    bias: Parameter,
}

impl AffineLayer {
    pub const NAME: &'static str = "Affine";

    /// # Panics
    ///
    /// If the configuration has no `affine` section or names an unknown filler.
    #[track_caller]
    pub fn load(config: &LayerConfig) -> Self {
        let Some(affine) = &config.affine else {
            panic!("affine layer {:?} has no weight configuration", config.name);
        };
        let weight = Filler::parse(&affine.weight).fill([config.input_size, config.output_size]);
        let bias = Filler::parse(&affine.bias).fill([config.output_size]);
        assert_eq!(
            weight.shape().rank(),
            2,
            "weight of affine layer {:?} must be a matrix",
            config.name
        );
        assert_eq!(
            bias.len(),
            weight.shape()[1],
            "bias of affine layer {:?} doesn't match its weight",
            config.name
        );
        Self {
            weight: Parameter::new(format!("{}.w", config.name), weight),
            bias: Parameter::new(format!("{}.b", config.name), bias),
        }
    }

    pub fn weights(&self) -> [&Parameter; 2] {
        [&self.weight, &self.bias]
    }

    pub fn weights_mut(&mut self) -> [&mut Parameter; 2] {
        [&mut self.weight, &mut self.bias]
    }

    /// Treats `input` as `{batch, features}`, whatever its rank.
    #[track_caller]
    pub fn forward(&self, input: &Node, output: &mut Node) {
        let weight = self.weight.read();
        let bias = self.bias.read();
        let x = &input.value;
        let m = x.shape().get(0).unwrap_or(0);
        let k = x.shape().count_from(1);
        let (k_w, n) = (weight.value.shape()[0], weight.value.shape()[1]);
        assert_eq!(k, k_w, "affine input has {k} features, weight expects {k_w}");
        output.value.resize([m, n], 0.0);
        ops::matmul(
            x.as_slice(),
            weight.value.as_slice(),
            output.value.as_mut_slice(),
            m,
            n,
            k,
            Transpose::None,
        );
        if m != 0 {
            output.value += &bias.value;
        }
    }

    /// `dx = dout·Wᵗ`, `dW = xᵗ·dout`, `db = Σ_rows dout`.
    #[track_caller]
    pub fn backward(&self, output: &Node, input: &mut Node) {
        let dout = &output.grad;
        let x = &input.value;
        let m = dout.shape().get(0).unwrap_or(0);
        let n = dout.shape().count_from(1);
        let k = x.shape().count_from(1);

        let mut weight = self.weight.write();
        let Node {
            value: w,
            grad: dw,
        } = &mut *weight;
        input.grad.resize(x.shape().clone(), 0.0);
        ops::matmul(
            dout.as_slice(),
            w.as_slice(),
            input.grad.as_mut_slice(),
            m,
            k,
            n,
            Transpose::B,
        );
        dw.resize(w.shape().clone(), 0.0);
        ops::matmul(
            x.as_slice(),
            dout.as_slice(),
            dw.as_mut_slice(),
            k,
            n,
            m,
            Transpose::A,
        );
        drop(weight);

        let mut bias = self.bias.write();
        let Node { value: b, grad: db } = &mut *bias;
        db.resize(b.shape().clone(), 0.0);
        ops::matrix_sum(dout.as_slice(), m, n, Reduction::Columns, db.as_mut_slice());
    }

    pub(crate) fn snapshot(&self, config: &mut LayerConfig) {
        let weight = WeightConfig::from_value(&self.weight.read().value);
        let bias = WeightConfig::from_value(&self.bias.read().value);
        *config = std::mem::take(config).with_affine(weight, bias);
    }
}
