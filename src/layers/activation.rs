use std::{
    fmt::{self, Debug},
    iter,
    marker::PhantomData,
};

use crate::{ActivationFunction, Node};

/// Applies `Phi` to every element.
pub struct ActivationLayer<Phi: ActivationFunction> {
    _marker: PhantomData<Phi>,
}

impl<Phi: ActivationFunction> Default for ActivationLayer<Phi> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Phi: ActivationFunction> Debug for ActivationLayer<Phi> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ActivationLayer<{}>", Phi::NAME)
    }
}

impl<Phi: ActivationFunction> ActivationLayer<Phi> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    pub fn forward(&self, input: &Node, output: &mut Node) {
        output.value.resize(input.value.shape().clone(), 0.0);
        Phi::apply_multiple(input.value.as_slice(), output.value.as_mut_slice());
    }

    /// `dx = dout · φ'(x)`
    pub fn backward(&self, output: &Node, input: &mut Node) {
        let x = &input.value;
        input.grad.resize(x.shape().clone(), 0.0);
        let xs = iter::zip(x.as_slice(), output.value.as_slice());
        let dxs = iter::zip(input.grad.as_mut_slice(), output.grad.as_slice());
        for ((dx, &dout), (&x, &y)) in iter::zip(dxs, xs) {
            *dx = dout * Phi::deriv(x, y);
        }
    }
}
