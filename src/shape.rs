use std::{
    fmt::{self, Debug, Display},
    ops::Index,
};

use smallvec::SmallVec;

/// Dimensions are stored inline up to this rank.
pub const INLINE_RANK: usize = 5;

type Dims = SmallVec<[usize; INLINE_RANK]>;

/// Extent of an N-dimensional array.
///
/// The element count is computed when the shape is built and a shape is never mutated in place, so
/// `count` can't go stale. The empty shape has a count of zero.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Dims,
    count: usize,
}

impl Shape {
    pub fn new(dims: impl IntoIterator<Item = usize>) -> Self {
        let dims: Dims = dims.into_iter().collect();
        let count = match dims.is_empty() {
            true => 0,
            false => dims.iter().product(),
        };
        Self { dims, count }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Total number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Product of the dimensions from `axis` to the end.
    /// `count_from(1)` of a `{batch, ...}` shape is the number of features per example.
    pub fn count_from(&self, axis: usize) -> usize {
        self.dims.iter().skip(axis).product()
    }

    pub fn get(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }
}

impl Index<usize> for Shape {
    type Output = usize;

    #[track_caller]
    fn index(&self, axis: usize) -> &usize {
        &self.dims[axis]
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.iter().copied())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Shape")?;
        f.debug_list().entries(self.dims.iter()).finish()
    }
}
