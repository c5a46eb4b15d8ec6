//! Typed vector views and their iterator.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::error::Result;
use crate::table::TableAccessor;
use crate::types::Scalar;
use crate::vector::{VectorAccessor, VectorAccessorMut};

/// Element type readable from a vector.
///
/// Implemented here for every scalar, for strings and for tables. Inline
/// structs are defined by the schema, so their accessor types implement
/// this themselves, usually through [`VectorAccessor::get_struct`].
pub trait VectorElement<'a>: Sized {
    /// Reads element `index`.
    fn read(vector: &VectorAccessor<'a>, index: usize) -> Result<Self>;
}

macro_rules! impl_scalar_element {
    ($($ty:ty),*) => {
        $(
            impl<'a> VectorElement<'a> for $ty {
                #[inline]
                fn read(vector: &VectorAccessor<'a>, index: usize) -> Result<Self> {
                    vector.get::<$ty>(index)
                }
            }
        )*
    };
}

impl_scalar_element!(u8, i8, bool, u16, i16, u32, i32, u64, i64, f32, f64);

impl<'a> VectorElement<'a> for &'a str {
    fn read(vector: &VectorAccessor<'a>, index: usize) -> Result<Self> {
        vector.get_str(index)
    }
}

impl<'a> VectorElement<'a> for TableAccessor<'a> {
    fn read(vector: &VectorAccessor<'a>, index: usize) -> Result<Self> {
        vector.get_table(index)
    }
}

/// A vector whose elements are all of type `T`.
pub struct Vector<'a, T> {
    accessor: VectorAccessor<'a>,
    _element: PhantomData<T>,
}

impl<'a, T: VectorElement<'a>> Vector<'a, T> {
    /// Types an untyped vector.
    pub fn new(accessor: VectorAccessor<'a>) -> Self {
        Self {
            accessor,
            _element: PhantomData,
        }
    }

    /// Returns the untyped accessor.
    pub fn accessor(&self) -> VectorAccessor<'a> {
        self.accessor
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.accessor.len()
    }

    /// Returns true if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.accessor.is_empty()
    }

    /// Reads element `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        T::read(&self.accessor, index)
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> VectorIter<'a, T> {
        VectorIter::new(*self)
    }
}

impl<'a, T: Scalar + VectorElement<'a>> Vector<'a, T> {
    /// Decodes every element into a new `Vec`.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.len());
        for item in self.iter() {
            out.push(item?);
        }
        Ok(out)
    }

    /// Decodes `count` elements starting at `src_index` into
    /// `dst[dst_offset..]`.
    pub fn copy_to(
        &self,
        src_index: usize,
        dst: &mut [T],
        dst_offset: usize,
        count: usize,
    ) -> Result<()> {
        self.accessor.copy_to(src_index, dst, dst_offset, count)
    }
}

impl<T> Clone for Vector<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Vector<'_, T> {}

impl<T> fmt::Debug for Vector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("position", &self.accessor.cursor().position())
            .field("len", &self.accessor.len())
            .finish()
    }
}

impl<'a, T: VectorElement<'a>> IntoIterator for Vector<'a, T> {
    type Item = Result<T>;
    type IntoIter = VectorIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        VectorIter::new(self)
    }
}

/// Forward iterator over a [`Vector`].
///
/// The element count is read when iteration starts; [`VectorIter::reset`]
/// starts over and reads it again.
pub struct VectorIter<'a, T> {
    vector: Vector<'a, T>,
    index: usize,
    len: Option<usize>,
}

impl<'a, T: VectorElement<'a>> VectorIter<'a, T> {
    fn new(vector: Vector<'a, T>) -> Self {
        Self {
            vector,
            index: 0,
            len: None,
        }
    }

    /// Rewinds to the first element.
    pub fn reset(&mut self) {
        self.index = 0;
        self.len = None;
    }
}

impl<'a, T: VectorElement<'a>> Iterator for VectorIter<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.len.get_or_insert_with(|| self.vector.len());
        if self.index >= len {
            return None;
        }
        let item = self.vector.get(self.index);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len.unwrap_or_else(|| self.vector.len());
        let remaining = len.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, T: VectorElement<'a>> ExactSizeIterator for VectorIter<'a, T> {}

impl<'a, T: VectorElement<'a>> FusedIterator for VectorIter<'a, T> {}

/// A vector of scalars that can be overwritten in place.
///
/// Only fixed-size elements are settable; strings and tables are read-only
/// once written.
pub struct VectorMut<'a, T> {
    accessor: VectorAccessorMut<'a>,
    _element: PhantomData<T>,
}

impl<'a, T: Scalar> VectorMut<'a, T> {
    /// Types an untyped mutable vector.
    pub fn new(accessor: VectorAccessorMut<'a>) -> Self {
        Self {
            accessor,
            _element: PhantomData,
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.accessor.len()
    }

    /// Returns true if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.accessor.is_empty()
    }

    /// Reads element `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        self.accessor.get(index)
    }

    /// Overwrites element `index`.
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.accessor.set(index, value)
    }

    /// Overwrites `count` elements starting at `dst_index` with
    /// `src[src_offset..]`.
    pub fn copy_from(
        &mut self,
        src: &[T],
        src_offset: usize,
        dst_index: usize,
        count: usize,
    ) -> Result<()> {
        self.accessor.copy_from(src, src_offset, dst_index, count)
    }
}

impl<T> fmt::Debug for VectorMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorMut")
            .field("len", &self.accessor.len())
            .finish()
    }
}
