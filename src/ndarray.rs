use std::{
    fmt::{self, Debug, Display},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign},
    ptr::NonNull,
};

use rand::distr::Distribution;
use rand_distr::StandardNormal;

use crate::{Shape, SlicePtr, ops, utils};

/// Element type of every network tensor.
pub type Float = f32;

enum Storage<T> {
    /// `vec.len()` is the capacity of the array.
    Owned(Vec<T>),
    /// Caller memory. Never freed by the array.
    Borrowed(SlicePtr<T>),
}

/// A dense row-major N-dimensional array.
///
/// The buffer is either owned or borrowed from the caller (see [`NdArray::from_raw_parts`]). Its
/// capacity may exceed `shape.count()`, in which case the tail is unused and only the first
/// `shape.count()` elements are visible through [`as_slice`](Self::as_slice).
pub struct NdArray<T = Float> {
    storage: Storage<T>,
    shape: Shape,
}

// Safety: a borrowed array is an exclusive view, its creator vouched for the memory in
// `from_raw_parts`.
unsafe impl<T: Send> Send for NdArray<T> {}
unsafe impl<T: Sync> Sync for NdArray<T> {}

impl<T> Default for NdArray<T> {
    fn default() -> Self {
        Self {
            storage: Storage::Owned(Vec::new()),
            shape: Shape::default(),
        }
    }
}

impl<T: Copy + Default> NdArray<T> {
    /// An empty owned array.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::filled(T::default(), shape)
    }

    pub fn filled(value: T, shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        Self {
            storage: Storage::Owned(vec![value; shape.count()]),
            shape,
        }
    }

    /// Deep copy of the first `shape.count()` elements of `data`.
    #[track_caller]
    pub fn from_slice(data: &[T], shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        assert!(
            data.len() >= shape.count(),
            "{} values can't fill {shape}",
            data.len()
        );
        Self {
            storage: Storage::Owned(data[..shape.count()].to_vec()),
            shape,
        }
    }

    pub fn randn(shape: impl Into<Shape>) -> Self
    where
        StandardNormal: Distribution<T>,
    {
        let shape = shape.into();
        let mut rng = rand::rng();
        let data = StandardNormal
            .sample_iter(&mut rng)
            .take(shape.count())
            .collect();
        Self {
            storage: Storage::Owned(data),
            shape,
        }
    }

    /// Wraps `capacity` elements of caller memory without taking ownership.
    ///
    /// # Safety
    ///
    /// - `ptr` must be pointing to the beginning of `capacity` initialized items of `T`
    /// - the memory must outlive the array and must not be accessed through anything else while the
    ///   array is alive
    #[track_caller]
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, capacity: usize, shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        assert!(capacity >= shape.count(), "{capacity} values can't hold {shape}");
        Self {
            storage: Storage::Borrowed(SlicePtr::new(ptr, capacity)),
            shape,
        }
    }

    /// # Safety
    ///
    /// See [`from_raw_parts`](Self::from_raw_parts).
    pub unsafe fn from_mut_slice(data: &mut [T], shape: impl Into<Shape>) -> Self {
        let ptr = SlicePtr::from_mut_slice(data);
        unsafe { Self::from_raw_parts(ptr.ptr, ptr.len, shape) }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of visible elements.
    pub fn len(&self) -> usize {
        self.shape.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements the buffer can hold without reallocating.
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Owned(vec) => vec.len(),
            Storage::Borrowed(ptr) => ptr.len,
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self.storage, Storage::Borrowed(_))
    }

    fn buffer(&self) -> &[T] {
        match &self.storage {
            Storage::Owned(vec) => vec,
            // Safety: guaranteed by the contract of `from_raw_parts`.
            Storage::Borrowed(ptr) => unsafe { ptr.as_slice() },
        }
    }

    fn buffer_mut(&mut self) -> &mut [T] {
        match &mut self.storage {
            Storage::Owned(vec) => vec,
            // Safety: guaranteed by the contract of `from_raw_parts`, `&mut self` makes it exclusive.
            Storage::Borrowed(ptr) => unsafe { ptr.as_mut_slice() },
        }
    }

    pub fn as_slice(&self) -> &[T] {
        let count = self.len();
        &self.buffer()[..count]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let count = self.len();
        &mut self.buffer_mut()[..count]
    }

    /// Copies `other` into `self`, reusing the buffer when it is large enough.
    pub fn assign(&mut self, other: &Self) {
        if self.shape == other.shape {
            self.as_mut_slice().copy_from_slice(other.as_slice());
        } else if self.capacity() >= other.len() {
            self.shape = other.shape.clone();
            self.as_mut_slice().copy_from_slice(other.as_slice());
        } else {
            *self = other.clone();
        }
    }

    /// Changes the shape, growing the buffer only when the new count exceeds the capacity.
    /// Elements past the old count are set to `fill`, the rest keep their values.
    ///
    /// A borrowed array that has to grow becomes owned.
    pub fn resize(&mut self, shape: impl Into<Shape>, fill: T) {
        let shape = shape.into();
        let old_count = self.len();
        let new_count = shape.count();
        if new_count > self.capacity() {
            let mut data = Vec::with_capacity(new_count);
            data.extend_from_slice(self.as_slice());
            data.resize(new_count, fill);
            self.storage = Storage::Owned(data);
        } else if new_count > old_count {
            self.buffer_mut()[old_count..new_count].fill(fill);
        }
        self.shape = shape;
    }

    /// Reinterprets the elements with new dimensions. One dimension may be `-1`, its size is then
    /// inferred from the element count.
    ///
    /// Returns `false` and leaves the shape untouched if the dimensions don't describe the same
    /// number of elements, or if more than one is inferred.
    pub fn reshape(&mut self, dims: &[isize]) -> bool {
        let mut wildcard = None;
        let mut known = 1usize;
        for (axis, &dim) in dims.iter().enumerate() {
            match dim {
                -1 if wildcard.is_none() => wildcard = Some(axis),
                dim if dim < 0 => return false,
                dim => match known.checked_mul(dim as usize) {
                    Some(product) => known = product,
                    None => return false,
                },
            }
        }
        let count = self.len();
        let mut new_dims: Vec<usize> = dims.iter().map(|&dim| dim.max(0) as usize).collect();
        match wildcard {
            None if dims.is_empty() && count != 0 => return false,
            None if known != count => return false,
            None => (),
            Some(_) if known == 0 || count % known != 0 => return false,
            Some(axis) => new_dims[axis] = count / known,
        }
        self.shape = Shape::new(new_dims);
        true
    }

    /// Applies `f(block, other)` to every trailing block of `self` that `other` aligns with.
    #[track_caller]
    fn broadcast_with(&mut self, other: &Self, f: impl Fn(&mut [T], &[T])) {
        if self.shape == other.shape {
            f(self.as_mut_slice(), other.as_slice());
            return;
        }
        let (dims, other_dims) = (self.shape.dims(), other.shape.dims());
        assert!(
            !other_dims.is_empty() && dims.len() > other_dims.len(),
            "can't broadcast {} onto {}",
            other.shape,
            self.shape,
        );
        assert!(
            dims.ends_with(other_dims),
            "can't broadcast {} onto {}: trailing dimensions differ",
            other.shape,
            self.shape,
        );
        let block = other.len();
        if block == 0 {
            return;
        }
        let other = other.as_slice();
        for chunk in self.as_mut_slice().chunks_exact_mut(block) {
            f(chunk, other);
        }
    }
}

impl NdArray<f32> {
    /// An array holding the native-endian `f32` values encoded in `bytes`.
    #[track_caller]
    pub fn from_bytes(bytes: &[u8], shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let data = utils::bytes_to_floats(bytes);
        assert_eq!(
            data.len(),
            shape.count(),
            "{} bytes don't describe {shape}",
            bytes.len()
        );
        Self {
            storage: Storage::Owned(data),
            shape,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        utils::floats_to_bytes(self.as_slice())
    }
}

impl<T: Copy + Default> Clone for NdArray<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Storage::Owned(self.as_slice().to_vec()),
            shape: self.shape.clone(),
        }
    }
}

impl<T: Copy + Default + PartialEq> PartialEq for NdArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.as_slice() == other.as_slice()
    }
}

macro_rules! impl_compound_op {
    ($trait_:ident, $method:ident, $op_trait:ident, $kernel:ident, $scalar_kernel:ident) => {
        impl<T: Copy + Default + $op_trait<Output = T>> $trait_<&NdArray<T>> for NdArray<T> {
            #[track_caller]
            fn $method(&mut self, rhs: &NdArray<T>) {
                self.broadcast_with(rhs, ops::$kernel);
            }
        }

        impl<T: Copy + Default + $op_trait<Output = T>> $trait_<T> for NdArray<T> {
            fn $method(&mut self, rhs: T) {
                ops::$scalar_kernel(self.as_mut_slice(), rhs);
            }
        }
    };
}

impl_compound_op!(AddAssign, add_assign, Add, add_assign, add_scalar);
impl_compound_op!(SubAssign, sub_assign, Sub, sub_assign, sub_scalar);
impl_compound_op!(MulAssign, mul_assign, Mul, mul_assign, mul_scalar);
impl_compound_op!(DivAssign, div_assign, Div, div_assign, div_scalar);

fn fmt_nested<T: Display>(f: &mut fmt::Formatter, data: &[T], dims: &[usize]) -> fmt::Result {
    write!(f, "[")?;
    match dims {
        [] | [_] => {
            for (i, x) in data.iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }
                Display::fmt(x, f)?;
            }
        }
        [outer, inner @ ..] => {
            let block = inner.iter().product::<usize>();
            for i in 0..*outer {
                if i != 0 {
                    write!(f, ", ")?;
                }
                fmt_nested(f, &data[i * block..(i + 1) * block], inner)?;
            }
        }
    }
    write!(f, "]")
}

impl<T: Copy + Default + Display> Display for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_nested(f, self.as_slice(), self.shape.dims())
    }
}

impl<T: Copy + Default + Debug> Debug for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NdArray")
            .field("shape", &self.shape)
            .field("borrowed", &self.is_borrowed())
            .field("data", &self.as_slice())
            .finish()
    }
}
