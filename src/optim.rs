//! Parameter update rules.
//!
//! An optimizer keeps per-parameter state indexed by position, so [`Optimizer::step`] must always be
//! given the parameters in the order the optimizer was created with.

use std::iter;

use crate::{NdArray, Node, OptimizerConfig, Parameter, ops::EPSILON};

pub trait Optimizer: Send + Sync {
    /// Updates every parameter in place from its current gradient.
    fn step(&mut self, params: &mut [&mut Parameter]);
}

/// `value -= lr * grad`
#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f32,
}

impl Sgd {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [&mut Parameter]) {
        for param in params {
            let Node { value, grad } = param.node_mut();
            for (p, &dp) in iter::zip(value.as_mut_slice(), grad.as_slice()) {
                *p -= self.lr * dp;
            }
        }
    }
}

/// `velocity = momentum * velocity - lr * grad; value += velocity`
#[derive(Debug, Clone)]
pub struct Momentum {
    lr: f32,
    momentum: f32,
    names: Vec<String>,
    velocities: Vec<NdArray>,
}

impl Momentum {
    pub fn new(params: &[&Parameter], lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            names: params.iter().map(|p| p.name().to_owned()).collect(),
            velocities: params.iter().map(|p| NdArray::zeros(p.shape())).collect(),
        }
    }
}

impl Optimizer for Momentum {
    #[track_caller]
    fn step(&mut self, params: &mut [&mut Parameter]) {
        assert_eq!(params.len(), self.velocities.len(), "parameter count changed");
        let states = iter::zip(&self.names, &mut self.velocities);
        for (param, (name, velocity)) in iter::zip(params, states) {
            check_state(param, name, velocity);
            let Node { value, grad } = param.node_mut();
            let updates = iter::zip(velocity.as_mut_slice(), grad.as_slice());
            for (p, (v, &dp)) in iter::zip(value.as_mut_slice(), updates) {
                *v = self.momentum * *v - self.lr * dp;
                *p += *v;
            }
        }
    }
}

/// `sumsq += grad²; value -= lr * grad / (√sumsq + ε)`
#[derive(Debug, Clone)]
pub struct AdaGrad {
    lr: f32,
    names: Vec<String>,
    sums: Vec<NdArray>,
}

impl AdaGrad {
    pub fn new(params: &[&Parameter], lr: f32) -> Self {
        Self {
            lr,
            names: params.iter().map(|p| p.name().to_owned()).collect(),
            sums: params.iter().map(|p| NdArray::zeros(p.shape())).collect(),
        }
    }
}

impl Optimizer for AdaGrad {
    #[track_caller]
    fn step(&mut self, params: &mut [&mut Parameter]) {
        assert_eq!(params.len(), self.sums.len(), "parameter count changed");
        let states = iter::zip(&self.names, &mut self.sums);
        for (param, (name, sum)) in iter::zip(params, states) {
            check_state(param, name, sum);
            let Node { value, grad } = param.node_mut();
            let updates = iter::zip(sum.as_mut_slice(), grad.as_slice());
            for (p, (h, &dp)) in iter::zip(value.as_mut_slice(), updates) {
                *h += dp * dp;
                *p -= self.lr * dp / (h.sqrt() + EPSILON);
            }
        }
    }
}

/// Per-parameter state belongs to the parameter at the same position in `new`.
#[track_caller]
fn check_state(param: &Parameter, name: &str, state: &NdArray) {
    assert_eq!(
        param.name(),
        name,
        "parameters must be passed in the order the optimizer was created with"
    );
    assert_eq!(
        &param.shape(),
        state.shape(),
        "parameter {name:?} changed shape"
    );
}

/// Creates the optimizer named by `config.kind` for `params`.
///
/// # Panics
///
/// If the name is not `"sgd"`, `"momentum"` or `"ada_grad"`.
#[track_caller]
pub fn create(config: &OptimizerConfig, params: &[&Parameter]) -> Box<dyn Optimizer> {
    log::debug!(
        "creating optimizer {:?} (lr = {}) for {} parameters",
        config.kind,
        config.lr,
        params.len()
    );
    match config.kind.as_str() {
        "sgd" => Box::new(Sgd::new(config.lr)),
        "momentum" => Box::new(Momentum::new(params, config.lr, config.momentum)),
        "ada_grad" => Box::new(AdaGrad::new(params, config.lr)),
        other => {
            if other.eq_ignore_ascii_case("adagrad") {
                log::warn!("optimizer {other:?} is spelled \"ada_grad\"");
            }
            panic!("unknown optimizer {other:?}")
        }
    }
}
