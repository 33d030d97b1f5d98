use std::path::Path;

use crate::{
    IterationState, LayerRegistry, Network, NetworkConfig, Node, Optimizer, Result, TrainerConfig,
    config, optim,
};

/// Runs the train loop of a network and produces its snapshot.
pub struct Trainer {
    network: Network,
    optimizer: Box<dyn Optimizer>,
    max_iter: usize,
    test_interval: usize,
}

impl Trainer {
    /// Loads a [`TrainerConfig`] file and the network it points to.
    pub fn load(path: impl AsRef<Path>, registry: &LayerRegistry) -> Result<Self> {
        let path = path.as_ref();
        let trainer_config: TrainerConfig = config::read_json(path)?;
        let base_dir = path.parent().unwrap_or(Path::new(""));
        Self::from_config(&trainer_config, base_dir, registry)
    }

    /// `base_dir` is the directory `config.network` is relative to.
    pub fn from_config(
        config: &TrainerConfig,
        base_dir: &Path,
        registry: &LayerRegistry,
    ) -> Result<Self> {
        let network_config: NetworkConfig = config::read_json(base_dir.join(&config.network))?;
        let network = Network::load(registry, &network_config)?;
        let optimizer = optim::create(&config.optimizer, &network.weights());
        Ok(Self::new(
            network,
            optimizer,
            config.max_iter,
            config.test_interval,
        ))
    }

    pub fn new(
        network: Network,
        optimizer: Box<dyn Optimizer>,
        max_iter: usize,
        test_interval: usize,
    ) -> Self {
        Self {
            network,
            optimizer,
            max_iter,
            test_interval,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Trains for `max_iter` iterations and returns the snapshot of the trained network.
    ///
    /// Every `test_interval` iterations an epoch ends and the accuracy of the infer chain is logged.
    pub fn train(&mut self) -> NetworkConfig {
        let mut state = IterationState::new();
        let mut input = Node::default();
        let mut output = Node::default();
        let mut epoch = 0usize;
        for iter in 0..self.max_iter {
            state.reset();
            self.network.forward(&mut state, &input, &mut output);
            self.network.backward(&state, &output, &mut input);
            self.optimizer.step(&mut self.network.weights_mut());
            if self.test_interval != 0 && iter % self.test_interval == 0 {
                epoch += 1;
                let loss = state.loss();
                let accuracy = self.network.accuracy(&mut state);
                log::info!("iter: {iter}, epoch: {epoch}, loss: {loss:.6}, acc: {accuracy:.4}");
            }
        }
        self.network.snapshot()
    }

    /// Trains and writes the snapshot to `path`.
    pub fn train_to(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.train();
        let path = path.as_ref();
        config::write_json(path, &snapshot)?;
        log::info!("model written to {}", path.display());
        Ok(())
    }
}
