use std::{collections::HashMap, iter, mem};

use crate::{
    DataLayer, IterationState, Layer, LayerRegistry, NetworkConfig, Node, Parameter, Phase, Result,
    ScratchSlot, ops,
};

/// A chain of layers per phase, built from a [`NetworkConfig`].
///
/// The network owns its layers. The train and infer chains are orders over the same layers. A
/// network is `Sync`: several threads may run it at once, each on its own scratch nodes.
#[derive(Debug)]
pub struct Network {
    slot: ScratchSlot,
    phase: Phase,
    layers: Vec<Layer>,
    /// Indices into `layers`, per phase.
    chains: [Vec<usize>; 2],
}

impl Network {
    /// Builds every layer of `config` with `registry` and links them into chains by their `output`
    /// names.
    ///
    /// In the train phase each phase's chain starts at the data layer serving it. In the infer
    /// phase data layers are skipped and the infer chain starts at the first layer.
    ///
    /// # Panics
    ///
    /// On configuration errors: unknown layer types or fillers, a data layer not serving exactly one
    /// phase, a phase with no or several data layers, duplicate names within a phase, a successor
    /// that doesn't exist, a cycle, or fewer than three layers.
    #[track_caller]
    pub fn load(registry: &LayerRegistry, config: &NetworkConfig) -> Result<Self> {
        let phase = config.phase;
        let mut layers: Vec<Layer> = Vec::with_capacity(config.layers.len());
        let mut chains: [Vec<usize>; 2] = Default::default();
        let mut names: [HashMap<&str, usize>; 2] = Default::default();
        for layer_config in &config.layers {
            let name = layer_config.name.as_str();
            let is_data = layer_config.kind == DataLayer::NAME;
            if is_data && phase == Phase::Infer {
                continue;
            }
            let layer = registry.create(layer_config)?;
            let index = layers.len();
            if is_data {
                let [data_phase] = layer_config.phases[..] else {
                    panic!("data layer {name:?} must serve exactly one phase");
                };
                let chain = &mut chains[data_phase.index()];
                assert!(
                    chain.is_empty(),
                    "phase {data_phase} has more than one data layer"
                );
                chain.push(index);
            }
            for phase in Phase::ALL {
                if !layer_config.serves(phase) {
                    continue;
                }
                let previous = names[phase.index()].insert(name, index);
                assert!(
                    previous.is_none(),
                    "duplicate layer name {name:?} in phase {phase}"
                );
            }
            layers.push(layer);
        }
        assert!(
            layers.len() > 2,
            "a network needs at least 3 layers, got {}",
            layers.len()
        );
        match phase {
            Phase::Train => {
                for phase in Phase::ALL {
                    assert!(
                        !chains[phase.index()].is_empty(),
                        "phase {phase} has no data layer"
                    );
                }
                build_chain(Phase::Train, &layers, &names, &mut chains);
            }
            Phase::Infer => chains[Phase::Infer.index()].push(0),
        }
        build_chain(Phase::Infer, &layers, &names, &mut chains);
        Ok(Self {
            slot: ScratchSlot::acquire(),
            phase,
            layers,
            chains,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every layer, in configuration order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The layers of `phase`, in execution order.
    pub fn chain(&self, phase: Phase) -> impl Iterator<Item = &Layer> {
        self.chains[phase.index()].iter().map(|&i| &self.layers[i])
    }

    /// Parameters of every layer.
    pub fn weights(&self) -> Vec<&Parameter> {
        self.layers.iter().flat_map(Layer::weights).collect()
    }

    pub fn weights_mut(&mut self) -> Vec<&mut Parameter> {
        self.layers.iter_mut().flat_map(Layer::weights_mut).collect()
    }

    /// Runs the chain of the network's phase from `input` into `output`.
    ///
    /// `output` is moved into the scratch chain for the duration of the call, so the last layer
    /// writes straight into the caller's buffers.
    pub fn forward(&self, state: &mut IterationState, input: &Node, output: &mut Node) {
        let chain = &self.chains[self.phase.index()];
        let n = chain.len();
        self.slot.with_chain(n + 1, |nodes| {
            mem::swap(&mut nodes[n], output);
            for (i, &layer) in chain.iter().enumerate() {
                let (head, tail) = nodes.split_at_mut(i + 1);
                let input = if i == 0 { input } else { &head[i] };
                self.layers[layer].forward(state, input, &mut tail[0]);
            }
            mem::swap(&mut nodes[n], output);
        });
    }

    /// Propagates gradients back through the chain of the network's phase, ending in `input.grad`.
    ///
    /// Must follow a [`forward`](Self::forward) with the same `input` and `output` on the same
    /// thread.
    pub fn backward(&self, state: &IterationState, output: &Node, input: &mut Node) {
        let chain = &self.chains[self.phase.index()];
        let n = chain.len();
        self.slot.with_chain(n + 1, |nodes| {
            mem::swap(&mut nodes[0], input);
            for (i, &layer) in chain.iter().enumerate().rev() {
                let (head, tail) = nodes.split_at_mut(i + 1);
                let output = if i + 1 == n { output } else { &tail[0] };
                self.layers[layer].backward(state, output, &mut head[i]);
            }
            mem::swap(&mut nodes[0], input);
        });
    }

    /// Fraction of the batch produced by the infer chain whose arg-max class matches its label.
    ///
    /// # Panics
    ///
    /// If the network is in the infer phase, which has no labels.
    #[track_caller]
    pub fn accuracy(&self, state: &mut IterationState) -> f32 {
        assert_eq!(
            self.phase,
            Phase::Train,
            "accuracy is only available in the train phase"
        );
        let chain = &self.chains[Phase::Infer.index()];
        let n = chain.len();
        self.slot.with_chain(n + 1, |nodes| {
            for (i, &layer) in chain.iter().enumerate() {
                let (head, tail) = nodes.split_at_mut(i + 1);
                self.layers[layer].forward(state, &head[i], &mut tail[0]);
            }
            let output = &nodes[n].value;
            let classes = output.shape().count_from(1);
            let batch_size = state.batch_size();
            if classes == 0 || batch_size == 0 {
                return 0.0;
            }
            let labels = state.one_hot(classes);
            let rows = iter::zip(
                output.as_slice().chunks_exact(classes),
                labels.as_slice().chunks_exact(classes),
            );
            let hits = rows
                .take(batch_size)
                .filter(|(y, t)| ops::argmax(y) == ops::argmax(t))
                .count();
            hits as f32 / batch_size as f32
        })
    }

    /// A configuration rebuilding the infer chain with the current parameters.
    pub fn snapshot(&self) -> NetworkConfig {
        NetworkConfig {
            phase: Phase::Infer,
            layers: self.chain(Phase::Infer).map(Layer::snapshot).collect(),
        }
    }
}

/// Follows `output` names from the last layer of the chain until a layer has none.
#[track_caller]
fn build_chain(
    phase: Phase,
    layers: &[Layer],
    names: &[HashMap<&str, usize>; 2],
    chains: &mut [Vec<usize>; 2],
) {
    let names = &names[phase.index()];
    let chain = &mut chains[phase.index()];
    let Some(&first) = chain.first() else {
        return;
    };
    let mut description = layers[first].name().to_owned();
    loop {
        let current = &layers[*chain.last().unwrap_or(&first)];
        let next = current.config().output.as_str();
        if next.is_empty() {
            break;
        }
        let Some(&index) = names.get(next) else {
            panic!(
                "layer {:?} outputs to {next:?}, which is not a layer of phase {phase}",
                current.name()
            );
        };
        assert!(
            !chain.contains(&index),
            "layer {next:?} appears twice in the {phase} chain"
        );
        chain.push(index);
        description.push_str(" -> ");
        description.push_str(next);
    }
    log::info!("[network:{phase}] {description}");
}
