//! Layers and the registry that builds them from configuration.

mod activation;
mod affine;
mod data;
mod filler;
mod softmax;

pub use activation::*;
pub use affine::*;
pub use data::*;
pub use filler::*;
pub use softmax::*;

use std::collections::HashMap;

use crate::{
    ActivationFunction, IterationState, LayerConfig, Node, Parameter, Result,
    activation_functions::{Relu, Sigmoid},
};

/// The state of one concrete layer.
#[derive(Debug)]
pub enum LayerKind {
    Data(DataLayer),
    Affine(AffineLayer),
    Relu(ActivationLayer<Relu>),
    Sigmoid(ActivationLayer<Sigmoid>),
    Softmax(SoftmaxLayer),
    SoftmaxWithLoss(SoftmaxWithLossLayer),
}

/// A node of the network graph: its configuration and its state.
#[derive(Debug)]
pub struct Layer {
    config: LayerConfig,
    kind: LayerKind,
}

impl Layer {
    pub fn new(config: LayerConfig, kind: LayerKind) -> Self {
        Self { config, kind }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn is_data(&self) -> bool {
        matches!(self.kind, LayerKind::Data(_))
    }

    /// Computes `output` from `input`. Parameters are only read.
    pub fn forward(&self, state: &mut IterationState, input: &Node, output: &mut Node) {
        match &self.kind {
            LayerKind::Data(layer) => layer.forward(state, output),
            LayerKind::Affine(layer) => layer.forward(input, output),
            LayerKind::Relu(layer) => layer.forward(input, output),
            LayerKind::Sigmoid(layer) => layer.forward(input, output),
            LayerKind::Softmax(layer) => layer.forward(input, output),
            LayerKind::SoftmaxWithLoss(layer) => layer.forward(state, input, output),
        }
    }

    /// Writes `input.grad` (and the gradients of the layer's parameters) from `output.grad`.
    ///
    /// `input` and `output` must hold the values of the matching [`forward`](Self::forward).
    pub fn backward(&self, state: &IterationState, output: &Node, input: &mut Node) {
        match &self.kind {
            LayerKind::Data(_) => (),
            LayerKind::Affine(layer) => layer.backward(output, input),
            LayerKind::Relu(layer) => layer.backward(output, input),
            LayerKind::Sigmoid(layer) => layer.backward(output, input),
            LayerKind::Softmax(layer) => layer.backward(output, input),
            LayerKind::SoftmaxWithLoss(layer) => layer.backward(state, output, input),
        }
    }

    /// Trainable parameters, empty for stateless layers.
    pub fn weights(&self) -> Vec<&Parameter> {
        match &self.kind {
            LayerKind::Affine(layer) => layer.weights().to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn weights_mut(&mut self) -> Vec<&mut Parameter> {
        match &mut self.kind {
            LayerKind::Affine(layer) => layer.weights_mut().into(),
            _ => Vec::new(),
        }
    }

    /// A configuration that rebuilds this layer with its current parameters.
    pub fn snapshot(&self) -> LayerConfig {
        let mut config = self.config.clone();
        match &self.kind {
            LayerKind::Affine(layer) => layer.snapshot(&mut config),
            LayerKind::SoftmaxWithLoss(_) => config.kind = SoftmaxLayer::NAME.to_owned(),
            _ => (),
        }
        config
    }
}

pub type LayerFactory = fn(&LayerConfig) -> Result<LayerKind>;

/// Maps layer type names to constructors.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    factories: HashMap<String, LayerFactory>,
}

impl Default for LayerRegistry {
    /// A registry of every built-in layer.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DataLayer::NAME, |config| {
            Ok(LayerKind::Data(DataLayer::load(config)?))
        });
        registry.register(AffineLayer::NAME, |config| {
            Ok(LayerKind::Affine(AffineLayer::load(config)))
        });
        registry.register(Relu::NAME, |_| Ok(LayerKind::Relu(ActivationLayer::new())));
        registry.register(Sigmoid::NAME, |_| {
            Ok(LayerKind::Sigmoid(ActivationLayer::new()))
        });
        registry.register(SoftmaxLayer::NAME, |_| Ok(LayerKind::Softmax(SoftmaxLayer)));
        registry.register(SoftmaxWithLossLayer::NAME, |_| {
            Ok(LayerKind::SoftmaxWithLoss(SoftmaxWithLossLayer))
        });
        registry
    }
}

impl LayerRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: LayerFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the layer described by `config`.
    ///
    /// # Panics
    ///
    /// If no factory is registered for `config.kind`, or if the layer's configuration is malformed.
    #[track_caller]
    pub fn create(&self, config: &LayerConfig) -> Result<Layer> {
        let Some(factory) = self.factories.get(&config.kind) else {
            panic!(
                "layer {:?} has unknown type {:?}",
                config.name, config.kind
            );
        };
        let kind = factory(config)?;
        Ok(Layer::new(config.clone(), kind))
    }
}
