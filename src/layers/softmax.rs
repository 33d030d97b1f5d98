use crate::{IterationState, Node, ops};

/// Row-wise softmax over `{batch, classes}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftmaxLayer;

impl SoftmaxLayer {
    pub const NAME: &'static str = "Softmax";

    pub fn forward(&self, input: &Node, output: &mut Node) {
        let x = &input.value;
        output.value.resize(x.shape().clone(), 0.0);
        ops::softmax(
            x.as_slice(),
            output.value.as_mut_slice(),
            x.shape().count_from(1),
        );
    }

    /// `dx[i,j] = y[i,j] · (dout[i,j] − Σ_k dout[i,k] · y[i,k])`
    pub fn backward(&self, output: &Node, input: &mut Node) {
        let (y, dout) = (&output.value, &output.grad);
        let cols = dout.shape().count_from(1);
        input.grad.resize(dout.shape().clone(), 0.0);
        if cols == 0 {
            return;
        }
        let rows = y
            .as_slice()
            .chunks_exact(cols)
            .zip(dout.as_slice().chunks_exact(cols))
            .zip(input.grad.as_mut_slice().chunks_exact_mut(cols));
        for ((y, dout), dx) in rows {
            let dot: f32 = y.iter().zip(dout).map(|(y, dout)| y * dout).sum();
            for ((dx, &y), &dout) in dx.iter_mut().zip(y).zip(dout) {
                *dx = -y * dot + y * dout;
            }
        }
    }
}

/// Softmax followed by the cross-entropy loss against the labels of the iteration.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftmaxWithLossLayer;

impl SoftmaxWithLossLayer {
    pub const NAME: &'static str = "SoftmaxWithLoss";

    /// Records the loss in `state`. Without labels (pure inference) only the softmax is computed.
    pub fn forward(&self, state: &mut IterationState, input: &Node, output: &mut Node) {
        SoftmaxLayer.forward(input, output);
        if state.raw_labels().is_empty() {
            return;
        }
        let classes = output.value.shape().count_from(1);
        let label = state.parse_labels(classes);
        let loss = ops::cross_entropy(output.value.as_slice(), label.as_slice(), classes);
        state.set_loss(loss);
    }

    /// `dx = (y − label) / batch_size`
    #[track_caller]
    pub fn backward(&self, state: &IterationState, output: &Node, input: &mut Node) {
        let label = state.label();
        assert_eq!(
            label.shape(),
            output.value.shape(),
            "labels don't match the softmax output"
        );
        input.grad.assign(&output.value);
        input.grad -= label;
        input.grad /= state.batch_size().max(1) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{NdArray, utils::assert_close};

    #[test]
    fn test_softmax_forward_rows_sum_to_one() {
        let input = Node::new(NdArray::from_slice(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0], [2, 3]));
        let mut output = Node::default();
        SoftmaxLayer.forward(&input, &mut output);
        for row in output.value.as_slice().chunks_exact(3) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        }
        assert_close(&output.value.as_slice()[3..], &[1.0 / 3.0; 3], 1e-6);
    }

    #[test]
    fn test_softmax_backward_matches_finite_difference() {
        let x = [0.2f32, -0.4, 1.3];
        let dout = [0.5f32, -1.0, 2.0];
        let mut input = Node::new(NdArray::from_slice(&x, [1, 3]));
        let mut output = Node::default();
        SoftmaxLayer.forward(&input, &mut output);
        output.grad = NdArray::from_slice(&dout, [1, 3]);
        SoftmaxLayer.backward(&output, &mut input);

        // d/dx_j of Σ_k dout_k · softmax(x)_k
        let objective = |x: &[f32]| {
            let mut y = [0.0f32; 3];
            ops::softmax(x, &mut y, 3);
            y.iter().zip(&dout).map(|(y, d)| y * d).sum::<f32>()
        };
        let h = 1e-2;
        for j in 0..3 {
            let mut plus = x;
            let mut minus = x;
            plus[j] += h;
            minus[j] -= h;
            let numeric = (objective(&plus) - objective(&minus)) / (2.0 * h);
            assert!((input.grad.as_slice()[j] - numeric).abs() < 1e-3, "j = {j}");
        }
    }

    #[test]
    fn test_softmax_with_loss() {
        let layer = SoftmaxWithLossLayer;
        let mut state = IterationState::new();
        state.set_labels([2, 0]);
        let mut input = Node::new(NdArray::from_slice(&[0.1, 0.2, 0.7, 1.0, -1.0, 0.0], [2, 3]));
        let mut output = Node::default();
        layer.forward(&mut state, &input, &mut output);

        let y = output.value.as_slice().to_vec();
        let expected_loss = -((y[2] + ops::EPSILON).ln() + (y[3] + ops::EPSILON).ln()) / 2.0;
        assert!((state.loss() - expected_loss).abs() < 1e-6);

        layer.backward(&state, &output, &mut input);
        let one_hot = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        let expected: Vec<f32> = y
            .iter()
            .zip(one_hot)
            .map(|(y, t)| (y - t) / 2.0)
            .collect();
        assert_close(input.grad.as_slice(), &expected, 1e-7);
    }

    #[test]
    fn test_softmax_with_loss_without_labels() {
        let mut state = IterationState::new();
        let input = Node::new(NdArray::from_slice(&[1.0, 1.0], [1, 2]));
        let mut output = Node::default();
        SoftmaxWithLossLayer.forward(&mut state, &input, &mut output);
        assert_eq!(output.value.as_slice(), &[0.5, 0.5]);
        assert_eq!(state.loss(), 0.0);
    }

    #[test]
    #[should_panic(expected = "labels don't match the softmax output")]
    fn test_backward_after_reset_never_sees_stale_labels() {
        let layer = SoftmaxWithLossLayer;
        let mut state = IterationState::new();
        state.set_labels([1]);
        let mut input = Node::new(NdArray::from_slice(&[0.3, -0.3], [1, 2]));
        let mut output = Node::default();
        layer.forward(&mut state, &input, &mut output);
        state.reset();
        layer.forward(&mut state, &input, &mut output);
        layer.backward(&state, &output, &mut input);
    }
}
