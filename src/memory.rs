//! Bounds-checked little-endian access to a byte region.
//!
//! The free functions work on any byte slice and back both the builder's
//! [`MemoryView`] and the read-side cursors. [`MemoryView`] adds ownership:
//! it either owns its bytes, borrows a caller-owned region, or has been
//! released, in which case it behaves as an empty region.

use crate::error::{Error, Result};
use crate::types::Scalar;

/// Checks that `size` bytes at `offset` fit inside `len`.
#[inline]
pub(crate) fn check_range(len: usize, offset: usize, size: usize) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::out_of_range(offset, size, len)),
    }
}

/// Loads a scalar at `offset`.
#[inline]
pub fn load<T: Scalar>(bytes: &[u8], offset: usize) -> Result<T> {
    check_range(bytes.len(), offset, T::SIZE)?;
    Ok(T::read_le(&bytes[offset..offset + T::SIZE]))
}

/// Stores a scalar at `offset`.
#[inline]
pub fn store<T: Scalar>(bytes: &mut [u8], offset: usize, value: T) -> Result<()> {
    check_range(bytes.len(), offset, T::SIZE)?;
    value.write_le(&mut bytes[offset..offset + T::SIZE]);
    Ok(())
}

/// Borrows `len` bytes at `offset`.
#[inline]
pub fn slice(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    check_range(bytes.len(), offset, len)?;
    Ok(&bytes[offset..offset + len])
}

/// Mutably borrows `len` bytes at `offset`.
#[inline]
pub fn slice_mut(bytes: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    check_range(bytes.len(), offset, len)?;
    Ok(&mut bytes[offset..offset + len])
}

/// Decodes `dst.len()` consecutive scalars starting at `offset`.
pub fn load_slice<T: Scalar>(bytes: &[u8], offset: usize, dst: &mut [T]) -> Result<()> {
    let src = slice(bytes, offset, byte_len::<T>(dst.len(), offset, bytes.len())?)?;
    T::read_slice_le(src, dst);
    Ok(())
}

/// Encodes `src` as consecutive scalars starting at `offset`.
pub fn store_slice<T: Scalar>(bytes: &mut [u8], offset: usize, src: &[T]) -> Result<()> {
    let capacity = bytes.len();
    let dst = slice_mut(bytes, offset, byte_len::<T>(src.len(), offset, capacity)?)?;
    T::write_slice_le(src, dst);
    Ok(())
}

/// Decodes `len` bytes at `offset` as UTF-8 text.
pub fn load_str(bytes: &[u8], offset: usize, len: usize) -> Result<&str> {
    std::str::from_utf8(slice(bytes, offset, len)?).map_err(|_| Error::InvalidUtf8)
}

fn byte_len<T: Scalar>(count: usize, offset: usize, capacity: usize) -> Result<usize> {
    count
        .checked_mul(T::SIZE)
        .ok_or_else(|| Error::out_of_range(offset, usize::MAX, capacity))
}

/// Backing storage of a [`MemoryView`].
#[derive(Debug)]
enum Region<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
    Released,
}

/// A bounded byte region with typed little-endian load and store.
///
/// Release is tied to ownership: dropping the view (or calling
/// [`MemoryView::release`]) gives the region back exactly once, and any
/// access after `release` fails with [`Error::OutOfRange`].
#[derive(Debug)]
pub struct MemoryView<'a> {
    region: Region<'a>,
}

impl MemoryView<'static> {
    /// Creates a zeroed, owned region of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::from_vec(vec![0u8; capacity])
    }

    /// Takes ownership of an existing vector.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            region: Region::Owned(bytes),
        }
    }
}

impl<'a> MemoryView<'a> {
    /// Wraps a caller-owned region. The view can never grow.
    pub fn borrowed(bytes: &'a mut [u8]) -> Self {
        Self {
            region: Region::Borrowed(bytes),
        }
    }

    /// Returns the number of addressable bytes (0 once released).
    pub fn capacity(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if the view owns its bytes and can therefore grow.
    pub fn is_owned(&self) -> bool {
        matches!(self.region, Region::Owned(_))
    }

    /// Returns true once the region has been given back.
    pub fn is_released(&self) -> bool {
        matches!(self.region, Region::Released)
    }

    /// Returns the whole region.
    pub fn as_slice(&self) -> &[u8] {
        match &self.region {
            Region::Owned(bytes) => bytes.as_slice(),
            Region::Borrowed(bytes) => &**bytes,
            Region::Released => &[],
        }
    }

    /// Returns the whole region mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.region {
            Region::Owned(bytes) => bytes.as_mut_slice(),
            Region::Borrowed(bytes) => &mut **bytes,
            Region::Released => &mut [],
        }
    }

    /// Loads a scalar at `offset`.
    pub fn load<T: Scalar>(&self, offset: usize) -> Result<T> {
        load(self.as_slice(), offset)
    }

    /// Stores a scalar at `offset`.
    pub fn store<T: Scalar>(&mut self, offset: usize, value: T) -> Result<()> {
        store(self.as_mut_slice(), offset, value)
    }

    /// Borrows `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        slice(self.as_slice(), offset, len)
    }

    /// Sets `len` bytes at `offset` to `value`.
    pub fn fill(&mut self, offset: usize, len: usize, value: u8) -> Result<()> {
        slice_mut(self.as_mut_slice(), offset, len)?.fill(value);
        Ok(())
    }

    /// Copies raw bytes into the region at `offset`.
    pub fn store_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        slice_mut(self.as_mut_slice(), offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Encodes an array of scalars into the region at `offset`.
    pub fn store_slice<T: Scalar>(&mut self, offset: usize, src: &[T]) -> Result<()> {
        store_slice(self.as_mut_slice(), offset, src)
    }

    /// Decodes scalars from the region at `offset` into `dst`.
    pub fn load_slice<T: Scalar>(&self, offset: usize, dst: &mut [T]) -> Result<()> {
        load_slice(self.as_slice(), offset, dst)
    }

    /// Writes the UTF-8 bytes of `text` at `offset` and returns their length.
    pub fn store_str(&mut self, offset: usize, text: &str) -> Result<usize> {
        self.store_bytes(offset, text.as_bytes())?;
        Ok(text.len())
    }

    /// Decodes `len` bytes at `offset` as UTF-8.
    pub fn load_str(&self, offset: usize, len: usize) -> Result<&str> {
        load_str(self.as_slice(), offset, len)
    }

    /// Copies `len` bytes between two views.
    pub fn copy(
        src: &MemoryView<'_>,
        src_offset: usize,
        dst: &mut MemoryView<'_>,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        let bytes = src.slice(src_offset, len)?;
        dst.store_bytes(dst_offset, bytes)
    }

    /// Reallocates to `new_capacity`, moving the existing bytes to the tail
    /// of the new region so that distances from the end are preserved.
    pub(crate) fn grow_front(&mut self, new_capacity: usize) -> Result<()> {
        let old = match &mut self.region {
            Region::Owned(bytes) => std::mem::take(bytes),
            Region::Borrowed(bytes) => {
                return Err(Error::CapacityExceeded {
                    needed: new_capacity,
                    max: bytes.len(),
                })
            }
            Region::Released => return Err(Error::out_of_range(0, new_capacity, 0)),
        };
        if new_capacity < old.len() {
            self.region = Region::Owned(old);
            return Err(Error::StructureViolation("a buffer can only grow"));
        }
        let mut grown = vec![0u8; new_capacity];
        grown[new_capacity - old.len()..].copy_from_slice(&old);
        self.region = Region::Owned(grown);
        Ok(())
    }

    /// Gives the region back. Returns the bytes if the view owned them.
    ///
    /// Later calls are no-ops returning `None`.
    pub fn release(&mut self) -> Option<Vec<u8>> {
        match std::mem::replace(&mut self.region, Region::Released) {
            Region::Owned(bytes) => Some(bytes),
            Region::Borrowed(_) | Region::Released => None,
        }
    }
}
