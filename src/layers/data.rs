use crate::{DataSet, IterationState, LayerConfig, Node, Result};

/// Source layer: produces a batch of examples and records its labels.
#[derive(Debug)]
pub struct DataLayer {
    data_set: DataSet,
}

impl DataLayer {
    pub const NAME: &'static str = "Data";

    /// # Panics
    ///
    /// If the configuration has no `data_set` section.
    #[track_caller]
    pub fn load(config: &LayerConfig) -> Result<Self> {
        let Some(data_set) = &config.data_set else {
            panic!("data layer {:?} has no data set", config.name);
        };
        Ok(Self::new(DataSet::open(data_set)?))
    }

    pub fn new(data_set: DataSet) -> Self {
        Self { data_set }
    }

    pub fn data_set(&self) -> &DataSet {
        &self.data_set
    }

    pub fn forward(&self, state: &mut IterationState, output: &mut Node) {
        self.data_set.read_batch(&mut output.value, state);
    }
}
