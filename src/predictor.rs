use std::{path::Path, ptr::NonNull};

use rayon::prelude::*;

use crate::{
    IterationState, LayerRegistry, NdArray, Network, NetworkConfig, Node, Phase, Result, config,
};

/// Inference over a snapshot, see [`Network::snapshot`].
#[derive(Debug)]
pub struct Predictor {
    network: Network,
}

impl Predictor {
    pub fn load(path: impl AsRef<Path>, registry: &LayerRegistry) -> Result<Self> {
        let config: NetworkConfig = config::read_json(path)?;
        Self::from_config(config, registry)
    }

    /// Builds the network of `config` in the infer phase, whatever phase it declares.
    pub fn from_config(mut config: NetworkConfig, registry: &LayerRegistry) -> Result<Self> {
        config.phase = Phase::Infer;
        Ok(Self {
            network: Network::load(registry, &config)?,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Runs the network on `input` and writes the result into `output`.
    ///
    /// Neither array is copied: the network reads `input` in place and the last layer writes into
    /// `output`'s buffer. `output` is reshaped to the result, and only reallocated if its visible
    /// elements can't hold it.
    pub fn predict(&self, input: &NdArray, output: &mut NdArray) {
        let mut state = IterationState::new();
        // Safety: the network only reads its input node, and `input` outlives `in_node`.
        let in_node = Node {
            value: unsafe {
                NdArray::from_raw_parts(
                    NonNull::from(input.as_slice()).cast(),
                    input.len(),
                    input.shape().clone(),
                )
            },
            grad: NdArray::new(),
        };
        // Safety: `output` is exclusively borrowed and not touched until `out_node` is gone.
        let mut out_node = Node {
            value: unsafe {
                NdArray::from_raw_parts(
                    NonNull::from(output.as_mut_slice()).cast(),
                    output.len(),
                    output.shape().clone(),
                )
            },
            grad: NdArray::new(),
        };
        self.network.forward(&mut state, &in_node, &mut out_node);
        drop(in_node);
        let Node { value: result, .. } = out_node;
        if result.is_borrowed() {
            output.resize(result.shape().clone(), 0.0);
        } else {
            output.assign(&result);
        }
    }

    /// Predicts every input on the rayon pool. Each output starts with its input's shape.
    pub fn predict_many(&self, inputs: &[NdArray]) -> Vec<NdArray> {
        inputs
            .par_iter()
            .map(|input| {
                let mut output = NdArray::zeros(input.shape().clone());
                self.predict(input, &mut output);
                output
            })
            .collect()
    }
}
