use crate::NdArray;

/// Scratch data of one forward/backward iteration, threaded through every layer call.
///
/// The data layer stores the raw labels of the batch it produced, and the loss layer turns them into
/// a one-hot tensor and records the loss. Call [`reset`](Self::reset) before reusing the state for
/// another iteration.
#[derive(Debug, Default, Clone)]
pub struct IterationState {
    labels: Vec<u8>,
    label: NdArray,
    loss: f32,
    batch_size: usize,
}

impl IterationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything from the previous iteration. Buffers are kept for reuse.
    pub fn reset(&mut self) {
        self.labels.clear();
        self.label.resize([0], 0.0);
        self.loss = 0.0;
        self.batch_size = 0;
    }

    /// Records the class index of every example in the batch. The batch size becomes the number
    /// of labels.
    pub fn set_labels(&mut self, labels: impl IntoIterator<Item = u8>) {
        self.labels.clear();
        self.labels.extend(labels);
        self.batch_size = self.labels.len();
    }

    pub fn raw_labels(&self) -> &[u8] {
        &self.labels
    }

    /// Rebuilds the one-hot label tensor `{batch_size, classes}` from the raw labels.
    pub fn parse_labels(&mut self, classes: usize) -> &NdArray {
        let mut label = std::mem::take(&mut self.label);
        self.write_one_hot(&mut label, classes);
        self.label = label;
        &self.label
    }

    /// One-hot tensor of the raw labels, independent of the parsed one.
    pub fn one_hot(&self, classes: usize) -> NdArray {
        let mut label = NdArray::new();
        self.write_one_hot(&mut label, classes);
        label
    }

    #[track_caller]
    fn write_one_hot(&self, label: &mut NdArray, classes: usize) {
        label.resize([self.labels.len(), classes], 0.0);
        let rows = label.as_mut_slice();
        rows.fill(0.0);
        for (row, &class) in self.labels.iter().enumerate() {
            let class = class as usize;
            assert!(class < classes, "label {class} is out of range for {classes} classes");
            rows[row * classes + class] = 1.0;
        }
    }

    /// The one-hot labels of the last [`parse_labels`](Self::parse_labels).
    pub fn label(&self) -> &NdArray {
        &self.label
    }

    pub fn loss(&self) -> f32 {
        self.loss
    }

    pub fn set_loss(&mut self, loss: f32) {
        self.loss = loss;
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }
}
