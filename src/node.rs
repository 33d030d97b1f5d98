use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Float, NdArray, Shape};

/// A value and the gradient of the loss with respect to it.
#[derive(Debug, Default, Clone)]
pub struct Node {
    pub value: NdArray,
    pub grad: NdArray,
}

impl Node {
    pub fn new(value: NdArray) -> Self {
        let grad = NdArray::zeros(value.shape().clone());
        Self { value, grad }
    }

    /// Resizes both arrays, new elements are zero.
    pub fn resize(&mut self, shape: impl Into<Shape>) {
        let shape = shape.into();
        self.value.resize(shape.clone(), 0.0);
        self.grad.resize(shape, 0.0);
    }
}

/// A named trainable [`Node`], owned by the layer that created it.
///
/// Backward passes take the network by shared reference, so the node sits behind a lock that
/// backward passes write gradients through. Optimizers hold `&mut Parameter` and skip the lock.
#[derive(Debug)]
pub struct Parameter {
    name: String,
    node: RwLock<Node>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: NdArray) -> Self {
        Self {
            name: name.into(),
            node: RwLock::new(Node::new(value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Node> {
        self.node.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Node> {
        self.node.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node_mut(&mut self) -> &mut Node {
        self.node.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shape(&self) -> Shape {
        self.read().value.shape().clone()
    }

    /// Copy of the current value.
    pub fn value(&self) -> NdArray<Float> {
        self.read().value.clone()
    }
}
