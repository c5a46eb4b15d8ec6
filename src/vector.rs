//! Element lookup in length-prefixed vectors.
//!
//! A vector starts with a `u32` element count. Fixed-size elements (scalars
//! and structs) follow inline; variable-size elements (strings and tables)
//! are stored as uoffsets.

use crate::cursor::{Cursor, CursorMut, INDIRECT_STRIDE};
use crate::error::{Error, Result};
use crate::memory;
use crate::table::{root_table, TableAccessor};
use crate::types::{Scalar, SIZE_PREFIX_LENGTH};

/// Checks that `count` elements starting at `index` fit in `len`.
fn check_span(index: usize, count: usize, len: usize) -> Result<()> {
    match index.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::index_out_of_range(index.saturating_add(count), len)),
    }
}

/// Read-only view of one vector.
#[derive(Debug, Clone, Copy)]
pub struct VectorAccessor<'a> {
    cursor: Cursor<'a>,
    len: usize,
}

impl<'a> VectorAccessor<'a> {
    /// Wraps the vector at `cursor`, reading its element count.
    pub fn new(cursor: Cursor<'a>) -> Result<Self> {
        let len = cursor.load::<u32>(0)? as usize;
        Ok(Self { cursor, len })
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the vector's position (its length prefix).
    pub fn cursor(&self) -> Cursor<'a> {
        self.cursor
    }

    /// Returns the position of the first element.
    pub fn data_position(&self) -> usize {
        self.cursor.position() + SIZE_PREFIX_LENGTH
    }

    /// Returns the position of element `index` for elements `stride` bytes wide.
    pub fn element(&self, index: usize, stride: usize) -> Result<Cursor<'a>> {
        if index >= self.len {
            return Err(Error::index_out_of_range(index, self.len));
        }
        let rel = index
            .checked_mul(stride)
            .and_then(|rel| rel.checked_add(SIZE_PREFIX_LENGTH))
            .ok_or_else(|| Error::index_out_of_range(index, self.len))?;
        Ok(self.cursor.resolve_inline(rel))
    }

    /// Reads a scalar element.
    pub fn get<T: Scalar>(&self, index: usize) -> Result<T> {
        self.element(index, T::SIZE)?.load(0)
    }

    /// Returns the position of an inline struct element.
    pub fn get_struct(&self, index: usize, stride: usize) -> Result<Cursor<'a>> {
        let element = self.element(index, stride)?;
        // the whole struct must be inside the buffer, not just its start
        element.bytes(0, stride)?;
        Ok(element)
    }

    /// Reads a string element.
    pub fn get_str(&self, index: usize) -> Result<&'a str> {
        self.get_vector(index)?.as_str()
    }

    /// Reads a string element as raw bytes.
    pub fn get_string_bytes(&self, index: usize) -> Result<&'a [u8]> {
        self.get_vector(index)?.as_bytes()
    }

    /// Reads a table element.
    pub fn get_table(&self, index: usize) -> Result<TableAccessor<'a>> {
        let at = self.element(index, INDIRECT_STRIDE)?;
        TableAccessor::new(at.resolve_indirect(0)?)
    }

    /// Reads a vector element of a vector of vectors.
    pub fn get_vector(&self, index: usize) -> Result<VectorAccessor<'a>> {
        let at = self.element(index, INDIRECT_STRIDE)?;
        VectorAccessor::new(at.resolve_indirect(0)?)
    }

    /// Borrows the element bytes of a byte or string vector, without copying.
    pub fn as_bytes(&self) -> Result<&'a [u8]> {
        self.cursor.bytes(SIZE_PREFIX_LENGTH, self.len)
    }

    /// Borrows a string vector as text.
    pub fn as_str(&self) -> Result<&'a str> {
        std::str::from_utf8(self.as_bytes()?).map_err(|_| Error::InvalidUtf8)
    }

    /// Decodes `count` scalar elements starting at element `src_index` into
    /// `dst[dst_offset..]`.
    pub fn copy_to<T: Scalar>(
        &self,
        src_index: usize,
        dst: &mut [T],
        dst_offset: usize,
        count: usize,
    ) -> Result<()> {
        check_span(src_index, count, self.len)?;
        check_span(dst_offset, count, dst.len())?;
        if count == 0 {
            return Ok(());
        }
        let start = self.element(src_index, T::SIZE)?.position();
        memory::load_slice(
            self.cursor.buffer(),
            start,
            &mut dst[dst_offset..dst_offset + count],
        )
    }

    /// Returns the bytes of a complete buffer embedded as this byte vector.
    pub fn nested_buffer(&self) -> Result<&'a [u8]> {
        self.as_bytes()
    }

    /// Returns the root table of the embedded buffer.
    pub fn nested_root(&self) -> Result<TableAccessor<'a>> {
        root_table(self.nested_buffer()?)
    }
}

/// Mutable view of one vector, for overwriting fixed-size elements.
#[derive(Debug)]
pub struct VectorAccessorMut<'a> {
    cursor: CursorMut<'a>,
    len: usize,
}

impl<'a> VectorAccessorMut<'a> {
    /// Wraps the vector at `cursor`.
    pub fn new(cursor: CursorMut<'a>) -> Result<Self> {
        let len = cursor.load::<u32>(0)? as usize;
        Ok(Self { cursor, len })
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrows this vector read-only.
    pub fn as_accessor(&self) -> VectorAccessor<'_> {
        VectorAccessor {
            cursor: self.cursor.as_cursor(),
            len: self.len,
        }
    }

    /// Reads a scalar element.
    pub fn get<T: Scalar>(&self, index: usize) -> Result<T> {
        self.as_accessor().get(index)
    }

    /// Overwrites a scalar element.
    pub fn set<T: Scalar>(&mut self, index: usize, value: T) -> Result<()> {
        let at = self.as_accessor().element(index, T::SIZE)?.position();
        let rel = at - self.cursor.position();
        self.cursor.store(rel, value)
    }

    /// Returns a mutable cursor at an inline struct element.
    pub fn get_struct_mut(&mut self, index: usize, stride: usize) -> Result<CursorMut<'_>> {
        let at = self.as_accessor().get_struct(index, stride)?.position();
        let rel = at - self.cursor.position();
        Ok(self.cursor.reborrow().resolve_inline(rel))
    }

    /// Encodes `src[src_offset..src_offset + count]` over the elements
    /// starting at `dst_index`.
    pub fn copy_from<T: Scalar>(
        &mut self,
        src: &[T],
        src_offset: usize,
        dst_index: usize,
        count: usize,
    ) -> Result<()> {
        check_span(src_offset, count, src.len())?;
        check_span(dst_index, count, self.len)?;
        if count == 0 {
            return Ok(());
        }
        let at = self.as_accessor().element(dst_index, T::SIZE)?.position();
        let rel = at - self.cursor.position();
        self.cursor.store_slice(rel, &src[src_offset..src_offset + count])
    }
}
