use std::iter;

use crate::ops;

/// A pointwise activation and its local derivative.
pub trait ActivationFunction: Send + Sync + 'static {
    /// Layer type name used in configurations.
    const NAME: &'static str;

    fn apply(x: f32) -> f32;

    /// `dy/dx` at input `x`, where `y = apply(x)`.
    fn deriv(x: f32, y: f32) -> f32;

    fn apply_multiple(x: &[f32], y: &mut [f32]) {
        for (y, &x) in iter::zip(y, x) {
            *y = Self::apply(x);
        }
    }
}

pub mod activation_functions {
    use super::*;

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Relu;
    impl ActivationFunction for Relu {
        const NAME: &'static str = "Relu";

        fn apply(x: f32) -> f32 {
            if x <= 0.0 { 0.0 } else { x }
        }

        fn deriv(x: f32, _: f32) -> f32 {
            if x <= 0.0 { 0.0 } else { 1.0 }
        }
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Sigmoid;
    impl ActivationFunction for Sigmoid {
        const NAME: &'static str = "Sigmoid";

        fn apply(x: f32) -> f32 {
            ops::sigmoid(x)
        }

        fn deriv(_: f32, y: f32) -> f32 {
            y * (1.0 - y)
        }

        fn apply_multiple(x: &[f32], y: &mut [f32]) {
            ops::sigmoid_multiple(x, y);
        }
    }
}
