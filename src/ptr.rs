use std::ptr::NonNull;

/// A non-null pointer to a slice that the holder does not own.
pub struct SlicePtr<T> {
    pub ptr: NonNull<T>,
    pub len: usize,
}

impl<T> Eq for SlicePtr<T> {}

impl<T> PartialEq for SlicePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.len == other.len
    }
}

impl<T> Clone for SlicePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlicePtr<T> {}

impl<T> SlicePtr<T> {
    pub const fn new(ptr: NonNull<T>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// A zero-length view over a dangling pointer.
    pub const fn dangling() -> Self {
        Self::new(NonNull::dangling(), 0)
    }

    pub fn from_mut_slice(slice: &mut [T]) -> Self {
        Self::new(NonNull::from(&mut *slice).cast(), slice.len())
    }

    /// # Safety
    ///
    /// - `ptr` must be pointing to the beginning of `len` initialized items of `T`
    /// - the items must satisfy aliasing requirements for being cast into a `&'a` reference
    pub const unsafe fn as_slice<'a>(self) -> &'a [T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// # Safety
    ///
    /// - `ptr` must be pointing to the beginning of `len` initialized items of `T`
    /// - the items must satisfy aliasing requirements for being cast into a `&'a mut` reference
    pub const unsafe fn as_mut_slice<'a>(self) -> &'a mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}
