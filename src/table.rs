//! Table field lookup through vtables.
//!
//! A table starts with an `i32` soffset; its vtable lives at
//! `table - soffset`. The vtable holds its own byte size, the table's byte
//! size, then one `u16` per field giving the field's distance from the start
//! of the table. A zero entry, or an entry beyond the vtable's end (data
//! written before the field existed), means the field was not stored and
//! readers return the caller's default.

use byteorder::{ByteOrder, LittleEndian};

use crate::cursor::{Cursor, CursorMut};
use crate::error::{Error, Result};
use crate::types::{
    field_index_to_vtable_offset, Scalar, FILE_IDENTIFIER_LENGTH, SIZE_UOFFSET, SIZE_VOFFSET,
    VTABLE_METADATA_FIELDS,
};
use crate::vector::{VectorAccessor, VectorAccessorMut};
use crate::view::{Vector, VectorElement};

/// Locates and validates the vtable of the table at `pos`.
///
/// Returns the vtable's position and byte size.
fn locate_vtable(buf: &[u8], pos: usize) -> Result<(usize, usize)> {
    let soffset = crate::memory::load::<i32>(buf, pos)? as i64;
    let vtable = pos as i64 - soffset;
    let min_size = VTABLE_METADATA_FIELDS * SIZE_VOFFSET;
    if vtable < 0 || vtable as usize + min_size > buf.len() {
        return Err(Error::malformed(format!(
            "table at {pos} has vtable at {vtable}, outside a buffer of {} bytes",
            buf.len()
        )));
    }
    let vtable = vtable as usize;
    let size = crate::memory::load::<u16>(buf, vtable)? as usize;
    if size < min_size || size % SIZE_VOFFSET != 0 || vtable + size > buf.len() {
        return Err(Error::malformed(format!(
            "vtable at {vtable} declares invalid size {size}"
        )));
    }
    Ok((vtable, size))
}

/// Reads field `index`'s vtable entry; 0 if absent.
fn vtable_entry(buf: &[u8], vtable: usize, vtable_size: usize, index: usize) -> usize {
    if index >= vtable_size / SIZE_VOFFSET - VTABLE_METADATA_FIELDS {
        return 0;
    }
    let entry = field_index_to_vtable_offset(index);
    // locate_vtable checked vtable + vtable_size against the buffer
    LittleEndian::read_u16(&buf[vtable + entry..vtable + entry + SIZE_VOFFSET]) as usize
}

/// Returns the root table of a finished buffer.
pub fn root_table(buf: &[u8]) -> Result<TableAccessor<'_>> {
    TableAccessor::new(Cursor::root(buf)?)
}

/// Returns the root table after checking the buffer's file identifier.
pub fn root_table_with_identifier<'a>(buf: &'a [u8], ident: &str) -> Result<TableAccessor<'a>> {
    if !TableAccessor::has_identifier(buf, ident)? {
        return Err(Error::malformed(format!(
            "buffer does not carry file identifier {ident:?}"
        )));
    }
    root_table(buf)
}

/// Read-only view of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableAccessor<'a> {
    cursor: Cursor<'a>,
    vtable: usize,
    vtable_size: usize,
}

impl<'a> TableAccessor<'a> {
    /// Wraps the table at `cursor`, resolving and validating its vtable.
    pub fn new(cursor: Cursor<'a>) -> Result<Self> {
        let (vtable, vtable_size) = locate_vtable(cursor.buffer(), cursor.position())?;
        Ok(Self {
            cursor,
            vtable,
            vtable_size,
        })
    }

    /// Returns true if the identifier follows the root offset of `buf`.
    ///
    /// Fails only if `ident` is not exactly four bytes long.
    pub fn has_identifier(buf: &[u8], ident: &str) -> Result<bool> {
        if ident.len() != FILE_IDENTIFIER_LENGTH {
            return Err(Error::InvalidIdentifier(ident.len()));
        }
        Ok(buf.get(SIZE_UOFFSET..SIZE_UOFFSET + FILE_IDENTIFIER_LENGTH) == Some(ident.as_bytes()))
    }

    /// Returns the table's position.
    pub fn cursor(&self) -> Cursor<'a> {
        self.cursor
    }

    /// Returns the byte size of the vtable.
    pub fn vtable_byte_size(&self) -> usize {
        self.vtable_size
    }

    /// Returns the table's byte size as recorded in its vtable.
    pub fn table_byte_size(&self) -> usize {
        LittleEndian::read_u16(&self.cursor.buffer()[self.vtable + SIZE_VOFFSET..]) as usize
    }

    /// Returns the field's distance from the table start, or 0 if the
    /// field was not written.
    pub fn field_offset(&self, index: usize) -> usize {
        vtable_entry(self.cursor.buffer(), self.vtable, self.vtable_size, index)
    }

    /// Returns true if the field was written.
    pub fn has_field(&self, index: usize) -> bool {
        self.field_offset(index) != 0
    }

    /// Returns the field's distance from the table start if it was written,
    /// checking that its first `size` bytes lie inside the buffer.
    fn field(&self, index: usize, size: usize) -> Result<Option<usize>> {
        let offset = self.field_offset(index);
        if offset == 0 {
            return Ok(None);
        }
        let pos = self.cursor.position();
        let len = self.cursor.buffer().len();
        match pos.checked_add(offset).and_then(|at| at.checked_add(size)) {
            Some(end) if end <= len => Ok(Some(offset)),
            _ => Err(Error::malformed(format!(
                "field {index} of table at {pos} runs past a buffer of {len} bytes"
            ))),
        }
    }

    /// Reads a scalar field, or `default` if it was not written.
    pub fn get<T: Scalar>(&self, index: usize, default: T) -> Result<T> {
        match self.field(index, T::SIZE)? {
            None => Ok(default),
            Some(offset) => self.cursor.load(offset),
        }
    }

    /// Resolves the uoffset held by a field.
    fn indirect(&self, index: usize) -> Result<Option<Cursor<'a>>> {
        match self.field(index, SIZE_UOFFSET)? {
            None => Ok(None),
            Some(offset) => self.cursor.resolve_indirect(offset).map(Some),
        }
    }

    /// Reads a string field.
    pub fn get_str(&self, index: usize) -> Result<Option<&'a str>> {
        self.get_vector(index)?.map(|v| v.as_str()).transpose()
    }

    /// Reads a string field as raw bytes, without UTF-8 validation.
    pub fn get_string_bytes(&self, index: usize) -> Result<Option<&'a [u8]>> {
        self.get_vector(index)?.map(|v| v.as_bytes()).transpose()
    }

    /// Reads a vector field.
    pub fn get_vector(&self, index: usize) -> Result<Option<VectorAccessor<'a>>> {
        self.indirect(index)?.map(VectorAccessor::new).transpose()
    }

    /// Reads a vector field as a typed view.
    pub fn get_vector_of<T: VectorElement<'a>>(
        &self,
        index: usize,
    ) -> Result<Option<Vector<'a, T>>> {
        Ok(self.get_vector(index)?.map(Vector::new))
    }

    /// Returns the position of an inline struct field.
    pub fn get_struct(&self, index: usize) -> Result<Option<Cursor<'a>>> {
        Ok(self
            .field(index, 1)?
            .map(|offset| self.cursor.resolve_inline(offset)))
    }

    /// Reads a sub-table field.
    pub fn get_table(&self, index: usize) -> Result<Option<TableAccessor<'a>>> {
        self.indirect(index)?.map(TableAccessor::new).transpose()
    }
}

/// Mutable view of one table, for overwriting fields that were written.
///
/// Mutation never grows the buffer, so a field omitted at build time
/// cannot be set afterwards.
#[derive(Debug)]
pub struct TableAccessorMut<'a> {
    cursor: CursorMut<'a>,
    vtable: usize,
    vtable_size: usize,
}

impl<'a> TableAccessorMut<'a> {
    /// Wraps the table at `pos` in `buf`.
    pub fn new(buf: &'a mut [u8], pos: usize) -> Result<Self> {
        Self::from_cursor(CursorMut::new(buf, pos))
    }

    /// Wraps the table at `cursor`.
    pub fn from_cursor(cursor: CursorMut<'a>) -> Result<Self> {
        let view = cursor.as_cursor();
        let (vtable, vtable_size) = locate_vtable(view.buffer(), view.position())?;
        Ok(Self {
            cursor,
            vtable,
            vtable_size,
        })
    }

    /// Wraps the root table of a finished buffer.
    pub fn root(buf: &'a mut [u8]) -> Result<Self> {
        let pos = Cursor::root(buf)?.position();
        Self::new(buf, pos)
    }

    /// Borrows this table read-only.
    pub fn as_accessor(&self) -> TableAccessor<'_> {
        TableAccessor {
            cursor: self.cursor.as_cursor(),
            vtable: self.vtable,
            vtable_size: self.vtable_size,
        }
    }

    /// Returns the field's distance from the table start, or 0.
    pub fn field_offset(&self, index: usize) -> usize {
        self.as_accessor().field_offset(index)
    }

    /// Returns true if the field was written.
    pub fn has_field(&self, index: usize) -> bool {
        self.field_offset(index) != 0
    }

    /// Reads a scalar field, or `default` if it was not written.
    pub fn get<T: Scalar>(&self, index: usize, default: T) -> Result<T> {
        self.as_accessor().get(index, default)
    }

    /// Overwrites a scalar field in place.
    ///
    /// Returns false, leaving the buffer untouched, if the field was
    /// omitted when the table was built.
    pub fn mutate<T: Scalar>(&mut self, index: usize, value: T) -> Result<bool> {
        match self.as_accessor().field(index, T::SIZE)? {
            None => Ok(false),
            Some(offset) => {
                self.cursor.store(offset, value)?;
                Ok(true)
            }
        }
    }

    /// Returns a mutable cursor at an inline struct field.
    pub fn get_struct_mut(&mut self, index: usize) -> Option<CursorMut<'_>> {
        match self.field_offset(index) {
            0 => None,
            offset => Some(self.cursor.reborrow().resolve_inline(offset)),
        }
    }

    /// Returns a mutable view of a sub-table field.
    pub fn get_table_mut(&mut self, index: usize) -> Result<Option<TableAccessorMut<'_>>> {
        match self.as_accessor().field(index, SIZE_UOFFSET)? {
            None => Ok(None),
            Some(offset) => {
                let cursor = self.cursor.reborrow().resolve_indirect(offset)?;
                TableAccessorMut::from_cursor(cursor).map(Some)
            }
        }
    }

    /// Returns a mutable view of a vector field.
    pub fn get_vector_mut(&mut self, index: usize) -> Result<Option<VectorAccessorMut<'_>>> {
        match self.as_accessor().field(index, SIZE_UOFFSET)? {
            None => Ok(None),
            Some(offset) => {
                let cursor = self.cursor.reborrow().resolve_indirect(offset)?;
                VectorAccessorMut::new(cursor).map(Some)
            }
        }
    }
}
