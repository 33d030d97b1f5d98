use std::{fs, iter, path::Path};

use rand::Rng;

use crate::{DataSetConfig, Error, IterationState, NdArray, Result};

/// Bytes skipped at the start of a data file.
pub const DATA_HEADER: usize = 16;
/// Bytes skipped at the start of a label file.
pub const LABEL_HEADER: usize = 8;

/// Raw examples and their class labels, one byte per label.
#[derive(Debug, Clone)]
pub struct DataSet {
    data: Vec<u8>,
    labels: Vec<u8>,
    data_block: usize,
    batch_size: usize,
}

fn read_skipping_header(path: &Path, header: usize) -> Result<Vec<u8>> {
    let mut bytes = fs::read(path).map_err(Error::io(path))?;
    if bytes.len() <= header {
        return Err(Error::TruncatedDataSet {
            path: path.to_owned(),
            header,
            len: bytes.len(),
        });
    }
    bytes.drain(..header);
    Ok(bytes)
}

impl DataSet {
    pub fn open(config: &DataSetConfig) -> Result<Self> {
        assert_eq!(
            config.label_block, 1,
            "labels must be one byte per example"
        );
        let data = read_skipping_header(&config.data_path, DATA_HEADER)?;
        let labels = read_skipping_header(&config.label_path, LABEL_HEADER)?;
        log::debug!(
            "opened data set {} ({} examples, {} bytes each)",
            config.data_path.display(),
            labels.len(),
            config.data_block,
        );
        Ok(Self::from_parts(
            data,
            labels,
            config.data_block,
            config.batch_size,
        ))
    }

    /// A data set over in-memory examples, without file headers.
    #[track_caller]
    pub fn from_parts(data: Vec<u8>, labels: Vec<u8>, data_block: usize, batch_size: usize) -> Self {
        assert!(
            data.len() >= labels.len() * data_block,
            "{} data bytes can't hold {} examples of {data_block} bytes",
            data.len(),
            labels.len(),
        );
        Self {
            data,
            labels,
            data_block,
            batch_size,
        }
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn example(&self, index: usize) -> (&[u8], u8) {
        let offset = index * self.data_block;
        (
            &self.data[offset..offset + self.data_block],
            self.labels[index],
        )
    }

    /// Writes a batch of examples scaled to `[0, 1]` into `output` as `{batch, features}` and their
    /// labels into `state`.
    ///
    /// A batch smaller than the data set is drawn at random, with replacement. Otherwise the whole
    /// data set is the batch, with every byte of the data file as a feature.
    pub fn read_batch(&self, output: &mut NdArray, state: &mut IterationState) {
        if self.is_empty() {
            output.resize([0, self.data_block], 0.0);
            state.set_labels([]);
        } else if self.batch_size < self.len() {
            let mut rng = rand::rng();
            let indices: Vec<usize> = iter::repeat_with(|| rng.random_range(0..self.len()))
                .take(self.batch_size)
                .collect();
            output.resize([self.batch_size, self.data_block], 0.0);
            let rows = output.as_mut_slice().chunks_exact_mut(self.data_block.max(1));
            for (row, &index) in iter::zip(rows, &indices) {
                normalize(self.example(index).0, row);
            }
            state.set_labels(indices.iter().map(|&index| self.labels[index]));
        } else {
            let block = self.data.len() / self.len();
            output.resize([self.len(), block], 0.0);
            normalize(&self.data[..self.len() * block], output.as_mut_slice());
            state.set_labels(self.labels.iter().copied());
        }
    }
}

fn normalize(bytes: &[u8], out: &mut [f32]) {
    for (out, &byte) in iter::zip(out, bytes) {
        *out = byte as f32 / 255.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    fn small() -> DataSet {
        DataSet::from_parts(vec![0, 255, 51, 102, 255, 0], vec![1, 0, 1], 2, 2)
    }

    #[test]
    fn test_sampled_batch() {
        let data_set = small();
        let mut output = NdArray::new();
        let mut state = IterationState::new();
        for _ in 0..20 {
            data_set.read_batch(&mut output, &mut state);
            assert_eq!(output.shape().dims(), &[2, 2]);
            assert_eq!(state.batch_size(), 2);
            for (row, &label) in iter::zip(output.as_slice().chunks_exact(2), state.raw_labels()) {
                let expected: &[f32] = if row[0] == 0.0 {
                    &[0.0, 1.0]
                } else if row[0] == 0.2 {
                    &[0.2, 0.4]
                } else {
                    &[1.0, 0.0]
                };
                assert_eq!(row, expected);
                assert_eq!(label, if row[0] == 0.2 { 0 } else { 1 });
            }
        }
    }

    #[test]
    fn test_full_batch() {
        let data_set = DataSet::from_parts(vec![0, 255, 51, 102, 255, 0], vec![1, 0, 1], 2, 3);
        let mut output = NdArray::new();
        let mut state = IterationState::new();
        data_set.read_batch(&mut output, &mut state);
        assert_eq!(output.shape().dims(), &[3, 2]);
        assert_eq!(output.as_slice(), &[0.0, 1.0, 0.2, 0.4, 1.0, 0.0]);
        assert_eq!(state.raw_labels(), &[1, 0, 1]);
        assert_eq!(state.batch_size(), 3);
    }

    #[test]
    fn test_open_skips_headers() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data");
        let label_path = dir.path().join("labels");
        let mut data = vec![7u8; DATA_HEADER];
        data.extend([10, 20, 30, 40]);
        let mut labels = vec![9u8; LABEL_HEADER];
        labels.extend([3, 4]);
        fs::write(&data_path, data).unwrap();
        fs::write(&label_path, labels).unwrap();
        let data_set = DataSet::open(&DataSetConfig {
            data_path,
            data_block: 2,
            label_path,
            label_block: 1,
            batch_size: 1,
        })
        .unwrap();
        assert_eq!(data_set.len(), 2);
        assert_eq!(data_set.example(1), (&[30u8, 40][..], 4));
    }

    #[test]
    fn test_open_rejects_truncated_files() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data");
        let label_path = dir.path().join("labels");
        fs::write(&data_path, [0u8; DATA_HEADER]).unwrap();
        fs::write(&label_path, [0u8; LABEL_HEADER + 1]).unwrap();
        let config = DataSetConfig {
            data_path,
            data_block: 1,
            label_path,
            label_block: 1,
            batch_size: 1,
        };
        assert!(matches!(
            DataSet::open(&config),
            Err(Error::TruncatedDataSet { header: DATA_HEADER, len: DATA_HEADER, .. })
        ));
        let missing = DataSetConfig {
            data_path: PathBuf::from("/nonexistent/data"),
            ..config
        };
        assert!(matches!(DataSet::open(&missing), Err(Error::Io { .. })));
    }
}
