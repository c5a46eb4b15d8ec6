//! Wire format constants, scalar types and typed offsets.

use std::fmt;
use std::marker::PhantomData;

use byteorder::{ByteOrder, LittleEndian};

/// Size of an unsigned offset (uoffset) to a table, vector or string.
pub const SIZE_UOFFSET: usize = 4;

/// Size of the signed offset (soffset) from a table to its vtable.
pub const SIZE_SOFFSET: usize = 4;

/// Size of a vtable entry.
pub const SIZE_VOFFSET: usize = 2;

/// Size of a vector's element count prefix.
pub const SIZE_PREFIX_LENGTH: usize = 4;

/// Length of an optional file identifier.
pub const FILE_IDENTIFIER_LENGTH: usize = 4;

/// Entries preceding the field offsets in every vtable: its own byte size
/// and the byte size of the table.
pub const VTABLE_METADATA_FIELDS: usize = 2;

/// Largest field count whose vtable size still fits in a `u16`.
pub const MAX_FIELDS: usize = (u16::MAX as usize) / SIZE_VOFFSET - VTABLE_METADATA_FIELDS;

/// Builders refuse to grow past 2 GiB.
pub const MAX_BUFFER_SIZE: usize = 1 << 31;

/// Initial builder capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

mod private {
    pub trait Sealed {}
}

/// Fixed-size little-endian value stored directly in a buffer.
///
/// Implemented for the integer types, `f32`, `f64` and `bool`. Booleans are
/// stored as one byte, written as 0 or 1 and read as "nonzero".
pub trait Scalar: Copy + PartialEq + fmt::Debug + private::Sealed {
    /// Encoded size, which is also the value's alignment.
    const SIZE: usize;

    /// Decodes from exactly `SIZE` bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encodes into exactly `SIZE` bytes.
    fn write_le(self, bytes: &mut [u8]);

    /// Decodes `dst.len()` consecutive values from `src`.
    fn read_slice_le(src: &[u8], dst: &mut [Self]) {
        for (value, chunk) in dst.iter_mut().zip(src.chunks_exact(Self::SIZE)) {
            *value = Self::read_le(chunk);
        }
    }

    /// Encodes `src` as consecutive values into `dst`.
    fn write_slice_le(src: &[Self], dst: &mut [u8]) {
        for (value, chunk) in src.iter().zip(dst.chunks_exact_mut(Self::SIZE)) {
            value.write_le(chunk);
        }
    }
}

impl private::Sealed for u8 {}
impl Scalar for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[0] = self;
    }

    fn read_slice_le(src: &[u8], dst: &mut [Self]) {
        dst.copy_from_slice(&src[..dst.len()]);
    }

    fn write_slice_le(src: &[Self], dst: &mut [u8]) {
        dst[..src.len()].copy_from_slice(src);
    }
}

impl private::Sealed for i8 {}
impl Scalar for i8 {
    const SIZE: usize = 1;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[0] = self as u8;
    }
}

impl private::Sealed for bool {}
impl Scalar for bool {
    const SIZE: usize = 1;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[0] = u8::from(self);
    }
}

macro_rules! impl_scalar {
    ($ty:ty, $read:ident, $write:ident, $read_into:ident, $write_into:ident) => {
        impl private::Sealed for $ty {}
        impl Scalar for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                LittleEndian::$read(bytes)
            }

            #[inline]
            fn write_le(self, bytes: &mut [u8]) {
                LittleEndian::$write(bytes, self)
            }

            fn read_slice_le(src: &[u8], dst: &mut [Self]) {
                let len = dst.len() * Self::SIZE;
                LittleEndian::$read_into(&src[..len], dst)
            }

            fn write_slice_le(src: &[Self], dst: &mut [u8]) {
                let len = src.len() * Self::SIZE;
                LittleEndian::$write_into(src, &mut dst[..len])
            }
        }
    };
}

impl_scalar!(u16, read_u16, write_u16, read_u16_into, write_u16_into);
impl_scalar!(i16, read_i16, write_i16, read_i16_into, write_i16_into);
impl_scalar!(u32, read_u32, write_u32, read_u32_into, write_u32_into);
impl_scalar!(i32, read_i32, write_i32, read_i32_into, write_i32_into);
impl_scalar!(u64, read_u64, write_u64, read_u64_into, write_u64_into);
impl_scalar!(i64, read_i64, write_i64, read_i64_into, write_i64_into);
impl_scalar!(f32, read_f32, write_f32, read_f32_into, write_f32_into);
impl_scalar!(f64, read_f64, write_f64, read_f64_into, write_f64_into);

/// Marker for offsets to tables.
#[derive(Debug)]
pub enum TableKind {}

/// Marker for offsets to vectors.
#[derive(Debug)]
pub enum VectorKind {}

/// Marker for offsets to strings.
#[derive(Debug)]
pub enum StringKind {}

/// Marker for offsets to inline structs.
#[derive(Debug)]
pub enum StructKind {}

/// Builder cursor of an emitted object: its distance from the buffer's end.
///
/// The kind parameter keeps table, vector, string and struct offsets from
/// being mixed up; it carries no data.
pub struct Offset<K> {
    value: u32,
    _kind: PhantomData<K>,
}

/// Offset of a finished table.
pub type TableOffset = Offset<TableKind>;
/// Offset of a finished vector.
pub type VectorOffset = Offset<VectorKind>;
/// Offset of a finished string.
pub type StringOffset = Offset<StringKind>;
/// Offset of a struct written at the current cursor.
pub type StructOffset = Offset<StructKind>;

impl<K> Offset<K> {
    /// Wraps a raw cursor value.
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            _kind: PhantomData,
        }
    }

    /// Returns the raw cursor value.
    pub const fn value(self) -> u32 {
        self.value
    }
}

impl<K> Clone for Offset<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Offset<K> {}

impl<K> PartialEq for Offset<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K> Eq for Offset<K> {}

impl<K> fmt::Debug for Offset<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Offset").field(&self.value).finish()
    }
}

/// Byte offset of field `index`'s entry within a vtable.
#[inline]
pub const fn field_index_to_vtable_offset(index: usize) -> usize {
    (index + VTABLE_METADATA_FIELDS) * SIZE_VOFFSET
}
