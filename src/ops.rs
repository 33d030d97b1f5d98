//! Numeric kernels over plain slices.
//!
//! Matrices are row-major. Kernels never allocate and never look at shapes; callers pass the
//! dimensions they want the buffers interpreted with.

use std::{
    iter,
    ops::{Add, Div, Mul, Sub},
};

use faer::{linalg::matmul::matmul as faer_matmul, prelude::*};

/// Added inside logarithms and square roots to stay away from `-inf` and division by zero.
pub const EPSILON: f32 = 1e-7;

macro_rules! elementwise {
    ($trait_:ident, $op:tt, $name:ident, $name_assign:ident, $name_scalar:ident) => {
        #[doc = concat!("`out[i] = a[i] ", stringify!($op), " b[i]`")]
        #[track_caller]
        pub fn $name<T: Copy + $trait_<Output = T>>(a: &[T], b: &[T], out: &mut [T]) {
            assert_eq!(a.len(), b.len());
            assert_eq!(a.len(), out.len());
            for ((out, &a), &b) in iter::zip(iter::zip(out, a), b) {
                *out = a $op b;
            }
        }

        #[track_caller]
        pub fn $name_assign<T: Copy + $trait_<Output = T>>(a: &mut [T], b: &[T]) {
            assert_eq!(a.len(), b.len());
            for (a, &b) in iter::zip(a, b) {
                *a = *a $op b;
            }
        }

        pub fn $name_scalar<T: Copy + $trait_<Output = T>>(a: &mut [T], b: T) {
            for a in a {
                *a = *a $op b;
            }
        }
    };
}

elementwise!(Add, +, add, add_assign, add_scalar);
elementwise!(Sub, -, sub, sub_assign, sub_scalar);
elementwise!(Mul, *, mul, mul_assign, mul_scalar);
elementwise!(Div, /, div, div_assign, div_scalar);

/// Which operands of a `matmul` are read transposed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    #[default]
    None,
    A,
    B,
    Both,
}

impl Transpose {
    const fn flags(self) -> (bool, bool) {
        match self {
            Transpose::None => (false, false),
            Transpose::A => (true, false),
            Transpose::B => (false, true),
            Transpose::Both => (true, true),
        }
    }
}

/// `c[m×n] = op(a)[m×k] · op(b)[k×n]`.
///
/// A transposed operand is stored with its dimensions swapped, i.e. with `Transpose::A` the buffer
/// `a` holds a `k×m` matrix.
#[track_caller]
pub fn matmul(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    transpose: Transpose,
) {
    assert!(a.len() >= m * k, "lhs holds {} values, need {m}x{k}", a.len());
    assert!(b.len() >= k * n, "rhs holds {} values, need {k}x{n}", b.len());
    assert!(c.len() >= m * n, "dst holds {} values, need {m}x{n}", c.len());
    let (a, b, c) = (&a[..m * k], &b[..k * n], &mut c[..m * n]);
    let (transpose_a, transpose_b) = transpose.flags();
    // faer is column-major, and a row-major buffer read column-major is the transposed matrix.
    // So everything is computed transposed: cᵗ = op(b)ᵗ · op(a)ᵗ.
    let a_t: MatRef<f32> = match transpose_a {
        false => MatRef::from_column_major_slice(a, k, m),
        true => MatRef::from_column_major_slice(a, m, k).transpose(),
    };
    let b_t: MatRef<f32> = match transpose_b {
        false => MatRef::from_column_major_slice(b, n, k),
        true => MatRef::from_column_major_slice(b, k, n).transpose(),
    };
    let c_t: MatMut<f32> = MatMut::from_column_major_slice_mut(c, n, m);
    faer_matmul(c_t, faer::Accum::Replace, b_t, a_t, 1.0, Par::Seq);
}

/// Axis of a [`matrix_sum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of every element, written to `out[0]`.
    All,
    /// One sum per column (summing over rows), `out.len() == cols`.
    Columns,
    /// One sum per row, `out.len() == rows`.
    Rows,
}

#[track_caller]
pub fn matrix_sum(a: &[f32], rows: usize, cols: usize, reduction: Reduction, out: &mut [f32]) {
    assert_eq!(a.len(), rows * cols);
    match reduction {
        Reduction::All => out[0] = a.iter().sum(),
        Reduction::Columns => {
            let out = &mut out[..cols];
            out.fill(0.0);
            for row in a.chunks_exact(cols.max(1)) {
                add_assign(out, row);
            }
        }
        Reduction::Rows => {
            for (out, row) in iter::zip(&mut out[..rows], a.chunks_exact(cols.max(1))) {
                *out = row.iter().sum();
            }
        }
    }
}

/// Row-wise softmax of a `rows×cols` matrix.
#[track_caller]
pub fn softmax(x: &[f32], y: &mut [f32], cols: usize) {
    assert_eq!(x.len(), y.len());
    if cols == 0 {
        return;
    }
    for (x, y) in iter::zip(x.chunks_exact(cols), y.chunks_exact_mut(cols)) {
        let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0f32;
        for (y, &x) in iter::zip(y.iter_mut(), x) {
            *y = (x - max).exp();
            sum += *y;
        }
        div_scalar(y, sum);
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + f32::exp(-x))
}

#[track_caller]
pub fn sigmoid_multiple(x: &[f32], y: &mut [f32]) {
    assert_eq!(x.len(), y.len());
    for (y, &x) in iter::zip(y, x) {
        *y = sigmoid(x);
    }
}

pub fn sqrt_in_place(x: &mut [f32]) {
    for x in x {
        *x = x.sqrt();
    }
}

/// Mean cross-entropy of predictions `y` against one-hot rows `t`, both `rows×cols`.
///
/// The target class of a row is the first index holding the row's maximum.
#[track_caller]
pub fn cross_entropy(y: &[f32], t: &[f32], cols: usize) -> f32 {
    assert_eq!(y.len(), t.len());
    if cols == 0 || y.is_empty() {
        return 0.0;
    }
    let rows = y.len() / cols;
    let sum: f32 = iter::zip(y.chunks_exact(cols), t.chunks_exact(cols))
        .map(|(y, t)| {
            let class = first_argmax(t);
            (y[class] + EPSILON).ln()
        })
        .sum();
    -sum / rows as f32
}

fn first_argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, &x) in row.iter().enumerate() {
        if x > row[best] {
            best = i;
        }
    }
    best
}

/// Index of the maximum of `row`. Ties go to the later index.
pub fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    let mut max = f32::NEG_INFINITY;
    for (i, &x) in row.iter().enumerate() {
        if x >= max {
            max = x;
            best = i;
        }
    }
    best
}
