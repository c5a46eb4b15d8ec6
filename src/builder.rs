//! Buffer construction.
//!
//! The builder writes from the end of its region towards the front. Every
//! written object is identified by its distance from the end (its *offset*),
//! which stays valid when the region grows because growth moves the existing
//! bytes to the tail of the new region.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::memory::MemoryView;
use crate::table::TableAccessor;
use crate::types::{
    Offset, Scalar, StringOffset, StructOffset, TableOffset, VectorOffset, DEFAULT_CAPACITY,
    FILE_IDENTIFIER_LENGTH, MAX_BUFFER_SIZE, MAX_FIELDS, SIZE_UOFFSET, SIZE_VOFFSET,
    VTABLE_METADATA_FIELDS,
};

/// Builds one buffer per session.
///
/// A session runs from creation (or [`Builder::clear`]) to
/// [`Builder::finish`]. Tables are opened with [`Builder::start_object`] and
/// closed with [`Builder::end_object`]; strings, vectors and sub-tables must
/// be created before the table that refers to them is opened.
///
/// # Example
///
/// ```rust
/// use flatbuf::{root_table, Builder};
///
/// # fn main() -> flatbuf::Result<()> {
/// let mut builder = Builder::new();
/// let name = builder.create_string("orc")?;
/// builder.start_object(2)?;
/// builder.add_offset_field(1, name)?;
/// builder.add_field::<i16>(0, 80, 100)?;
/// let monster = builder.end_object()?;
/// builder.finish(monster)?;
///
/// let table = root_table(builder.finished_data()?)?;
/// assert_eq!(table.get::<i16>(0, 100)?, 80);
/// assert_eq!(table.get_str(1)?, Some("orc"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Builder<'a> {
    buf: MemoryView<'a>,
    space: usize,
    min_align: usize,
    /// Offsets of the open object's fields, 0 for fields not written.
    vtable: Vec<usize>,
    object_fields: Option<usize>,
    object_start: usize,
    /// Offsets of every vtable written this session.
    vtables: Vec<usize>,
    vector_elems: Option<usize>,
    head: Option<usize>,
    force_defaults: bool,
    dedup_vtables: bool,
}

impl Builder<'static> {
    /// Creates a builder with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a builder with the given initial capacity.
    ///
    /// The capacity is only a starting point; the region doubles as needed.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_view(MemoryView::new(capacity.clamp(1, MAX_BUFFER_SIZE)))
    }
}

impl Default for Builder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Builder<'a> {
    /// Creates a builder that writes into a caller-owned region.
    ///
    /// The region cannot grow: running out of room fails with
    /// [`Error::CapacityExceeded`].
    pub fn from_buffer(bytes: &'a mut [u8]) -> Self {
        Self::from_view(MemoryView::borrowed(bytes))
    }

    fn from_view(buf: MemoryView<'a>) -> Self {
        let space = buf.capacity();
        Self {
            buf,
            space,
            min_align: 1,
            vtable: Vec::new(),
            object_fields: None,
            object_start: 0,
            vtables: Vec::new(),
            vector_elems: None,
            head: None,
            force_defaults: false,
            dedup_vtables: true,
        }
    }

    /// Resets the builder for a new session, keeping its region.
    pub fn clear(&mut self) {
        self.space = self.buf.capacity();
        self.min_align = 1;
        self.vtable.clear();
        self.object_fields = None;
        self.object_start = 0;
        self.vtables.clear();
        self.vector_elems = None;
        self.head = None;
    }

    /// Writes fields even when they equal their default.
    pub fn set_force_defaults(&mut self, force_defaults: bool) {
        self.force_defaults = force_defaults;
    }

    /// Returns true if fields equal to their default are written.
    pub fn force_defaults(&self) -> bool {
        self.force_defaults
    }

    /// Enables or disables sharing of identical vtables (enabled by default).
    pub fn set_dedup_vtables(&mut self, dedup: bool) {
        self.dedup_vtables = dedup;
    }

    /// Returns the current write offset: bytes written so far.
    pub fn offset(&self) -> usize {
        self.buf.capacity() - self.space
    }

    /// Returns the size of the region.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the bytes written so far, including padding.
    pub fn data(&self) -> &[u8] {
        self.buf.as_slice().get(self.space..).unwrap_or_default()
    }

    /// Returns the finished buffer.
    pub fn finished_data(&self) -> Result<&[u8]> {
        let head = self
            .head
            .ok_or(Error::StructureViolation("buffer has not been finished"))?;
        self.buf.slice(head, self.buf.capacity() - head)
    }

    /// Returns a copy of the finished buffer.
    pub fn to_finished_vec(&self) -> Result<Vec<u8>> {
        self.finished_data().map(<[u8]>::to_vec)
    }

    fn assert_not_nested(&self, msg: &'static str) -> Result<()> {
        if self.object_fields.is_some() || self.vector_elems.is_some() {
            return Err(Error::StructureViolation(msg));
        }
        Ok(())
    }

    /// Moves the write position `len` bytes towards the front and returns it.
    fn reserve(&mut self, len: usize) -> Result<usize> {
        self.space = self
            .space
            .checked_sub(len)
            .ok_or(Error::out_of_range(0, len, self.space))?;
        Ok(self.space)
    }

    fn grow(&mut self, needed: usize) -> Result<()> {
        let old = self.buf.capacity();
        let mut new = old.max(1);
        while new < needed {
            new *= 2;
            if new > MAX_BUFFER_SIZE {
                return Err(Error::CapacityExceeded {
                    needed,
                    max: MAX_BUFFER_SIZE,
                });
            }
        }
        self.buf.grow_front(new)?;
        self.space += new - old;
        Ok(())
    }

    /// Writes `len` zero bytes.
    pub fn pad(&mut self, len: usize) -> Result<()> {
        let at = self.reserve(len)?;
        self.buf.fill(at, len, 0)
    }

    /// Aligns so that a `size`-byte value written after `additional` more
    /// bytes lands on a `size`-aligned offset, growing the region if needed.
    pub fn prep(&mut self, size: usize, additional: usize) -> Result<()> {
        if !size.is_power_of_two() {
            return Err(Error::StructureViolation("alignment must be a power of two"));
        }
        self.min_align = self.min_align.max(size);
        let used = self.offset();
        let align_size = (!used.wrapping_add(additional)).wrapping_add(1) & (size - 1);
        let required = align_size + size + additional;
        if self.space < required {
            self.grow(used + required)?;
        }
        self.pad(align_size)
    }

    /// Writes a scalar without aligning. The caller must have called
    /// [`Builder::prep`].
    pub fn put<T: Scalar>(&mut self, value: T) -> Result<()> {
        let at = self.reserve(T::SIZE)?;
        self.buf.store(at, value)
    }

    /// Aligns and writes a scalar.
    pub fn add<T: Scalar>(&mut self, value: T) -> Result<()> {
        self.prep(T::SIZE, 0)?;
        self.put(value)
    }

    /// Writes a uoffset referring to an object written earlier.
    pub fn add_offset<K>(&mut self, target: Offset<K>) -> Result<()> {
        self.prep(SIZE_UOFFSET, 0)?;
        let target = target.value() as usize;
        let current = self.offset();
        if target > current {
            return Err(Error::InvalidOffset { target, current });
        }
        self.put((current - target + SIZE_UOFFSET) as u32)
    }

    /// Opens a vector of `count` elements of `elem_size` bytes.
    ///
    /// Elements are then written last to first with [`Builder::put`] or
    /// [`Builder::add`], and the vector closed with [`Builder::end_vector`].
    pub fn start_vector(
        &mut self,
        elem_size: usize,
        count: usize,
        alignment: usize,
    ) -> Result<()> {
        self.assert_not_nested("vectors cannot be started inside an object or vector")?;
        let len = elem_size
            .checked_mul(count)
            .filter(|len| *len <= MAX_BUFFER_SIZE)
            .ok_or(Error::CapacityExceeded {
                needed: usize::MAX,
                max: MAX_BUFFER_SIZE,
            })?;
        self.prep(SIZE_UOFFSET, len)?;
        self.prep(alignment, len)?;
        self.vector_elems = Some(count);
        Ok(())
    }

    /// Closes the open vector by writing its element count.
    pub fn end_vector(&mut self) -> Result<VectorOffset> {
        let count = self
            .vector_elems
            .take()
            .ok_or(Error::StructureViolation("end_vector without start_vector"))?;
        self.add(count as u32)?;
        Ok(Offset::new(self.offset() as u32))
    }

    /// Writes a NUL-terminated byte string.
    pub fn create_byte_string(&mut self, bytes: &[u8]) -> Result<StringOffset> {
        self.assert_not_nested("strings cannot be created inside an object or vector")?;
        self.add(0u8)?;
        self.start_vector(1, bytes.len(), 1)?;
        let at = self.reserve(bytes.len())?;
        self.buf.store_bytes(at, bytes)?;
        Ok(Offset::new(self.end_vector()?.value()))
    }

    /// Writes a UTF-8 string.
    pub fn create_string(&mut self, text: &str) -> Result<StringOffset> {
        self.create_byte_string(text.as_bytes())
    }

    /// Writes a byte vector, without the trailing NUL of a string.
    pub fn create_byte_vector(&mut self, bytes: &[u8]) -> Result<VectorOffset> {
        self.create_vector(bytes)
    }

    /// Writes a vector of scalars in one bulk copy.
    pub fn create_vector<T: Scalar>(&mut self, values: &[T]) -> Result<VectorOffset> {
        self.start_vector(T::SIZE, values.len(), T::SIZE)?;
        let at = self.reserve(T::SIZE * values.len())?;
        self.buf.store_slice(at, values)?;
        self.end_vector()
    }

    /// Writes a vector of uoffsets to strings, tables or vectors.
    pub fn create_vector_of_offsets<K>(
        &mut self,
        offsets: &[Offset<K>],
    ) -> Result<VectorOffset> {
        self.start_vector(SIZE_UOFFSET, offsets.len(), SIZE_UOFFSET)?;
        for offset in offsets.iter().rev() {
            self.add_offset(*offset)?;
        }
        self.end_vector()
    }

    /// Opens a struct of `size` bytes. Fields are written last to first.
    pub fn start_struct(&mut self, size: usize, alignment: usize) -> Result<()> {
        self.prep(alignment, size)
    }

    /// Returns the offset of the struct just written.
    pub fn end_struct(&self) -> StructOffset {
        Offset::new(self.offset() as u32)
    }

    /// Opens a table with room for `num_fields` fields.
    pub fn start_object(&mut self, num_fields: usize) -> Result<()> {
        self.assert_not_nested("objects cannot be nested")?;
        if num_fields > MAX_FIELDS {
            return Err(Error::StructureViolation("too many fields for one vtable"));
        }
        self.vtable.clear();
        self.vtable.resize(num_fields, 0);
        self.object_fields = Some(num_fields);
        self.object_start = self.offset();
        Ok(())
    }

    fn check_field(&self, index: usize) -> Result<()> {
        let field_count = self
            .object_fields
            .ok_or(Error::StructureViolation("fields can only be added to an open object"))?;
        if index >= field_count {
            return Err(Error::InvalidField { index, field_count });
        }
        Ok(())
    }

    /// Records the value just written as field `index` of the open table.
    pub fn slot(&mut self, index: usize) -> Result<()> {
        self.check_field(index)?;
        let offset = self.offset();
        self.vtable[index] = offset;
        Ok(())
    }

    /// Writes a scalar field, unless it equals `default`.
    pub fn add_field<T: Scalar>(&mut self, index: usize, value: T, default: T) -> Result<()> {
        self.check_field(index)?;
        if self.force_defaults || value != default {
            self.add(value)?;
            self.slot(index)?;
        }
        Ok(())
    }

    /// Writes a field referring to a string, vector or table written earlier.
    ///
    /// An offset of 0 refers to nothing, so the field is left out.
    pub fn add_offset_field<K>(&mut self, index: usize, offset: Offset<K>) -> Result<()> {
        self.check_field(index)?;
        if offset.value() != 0 {
            self.add_offset(offset)?;
            self.slot(index)?;
        }
        Ok(())
    }

    /// Records the struct just written as field `index`.
    ///
    /// Structs are stored inline, so `offset` must be the current offset.
    pub fn add_struct_field(&mut self, index: usize, offset: StructOffset) -> Result<()> {
        self.check_field(index)?;
        if offset.value() != 0 {
            if offset.value() as usize != self.offset() {
                return Err(Error::StructureViolation("structs must be written inline"));
            }
            self.slot(index)?;
        }
        Ok(())
    }

    /// Closes the open table, writing or sharing its vtable.
    pub fn end_object(&mut self) -> Result<TableOffset> {
        let field_count = self
            .object_fields
            .ok_or(Error::StructureViolation("end_object without start_object"))?;

        self.add(0i32)?;
        let table = self.offset();
        let table_size = u16::try_from(table - self.object_start)
            .map_err(|_| Error::StructureViolation("table too large for its vtable"))?;

        for i in (0..field_count).rev() {
            let field = self.vtable[i];
            let entry = if field != 0 { table - field } else { 0 };
            self.add(entry as u16)?;
        }
        self.add(table_size)?;
        self.add(((field_count + VTABLE_METADATA_FIELDS) * SIZE_VOFFSET) as u16)?;

        let existing = if self.dedup_vtables {
            self.find_vtable()?
        } else {
            None
        };
        let table_pos = self.capacity() - table;
        match existing {
            Some(vtable) => {
                // drop the candidate and point at the shared copy
                self.space = table_pos;
                self.buf.store(table_pos, soffset(vtable, table)?)?;
            }
            None => {
                let vtable = self.offset();
                if self.dedup_vtables {
                    self.vtables.push(vtable);
                }
                self.buf.store(table_pos, soffset(vtable, table)?)?;
            }
        }

        self.vtable.clear();
        self.object_fields = None;
        Ok(Offset::new(table as u32))
    }

    /// Looks for a vtable byte-identical to the one just written.
    fn find_vtable(&self) -> Result<Option<usize>> {
        let bytes = self.buf.as_slice();
        let len = self.buf.load::<u16>(self.space)? as usize;
        let candidate = crate::memory::slice(bytes, self.space, len)?;
        for &vtable in &self.vtables {
            let at = self.capacity() - vtable;
            let existing_len = self.buf.load::<u16>(at)? as usize;
            if existing_len == len && crate::memory::slice(bytes, at, len)? == candidate {
                return Ok(Some(vtable));
            }
        }
        Ok(None)
    }

    /// Checks that a table built this session wrote field `index`.
    pub fn required(&self, table: TableOffset, index: usize) -> Result<()> {
        let pos = self
            .capacity()
            .checked_sub(table.value() as usize)
            .ok_or(Error::out_of_range(0, table.value() as usize, self.capacity()))?;
        let accessor = TableAccessor::new(Cursor::new(self.buf.as_slice(), pos))?;
        if !accessor.has_field(index) {
            return Err(Error::MissingRequiredField { index });
        }
        Ok(())
    }

    /// Seals the buffer with `root` as its root table.
    pub fn finish(&mut self, root: TableOffset) -> Result<()> {
        self.finish_impl(root, None)
    }

    /// Seals the buffer with `root` as its root table and a four byte file
    /// identifier.
    pub fn finish_with_identifier(&mut self, root: TableOffset, ident: &str) -> Result<()> {
        self.finish_impl(root, Some(ident))
    }

    fn finish_impl(&mut self, root: TableOffset, ident: Option<&str>) -> Result<()> {
        self.assert_not_nested("cannot finish while an object or vector is open")?;
        if let Some(ident) = ident {
            if ident.len() != FILE_IDENTIFIER_LENGTH {
                return Err(Error::InvalidIdentifier(ident.len()));
            }
            self.prep(self.min_align, SIZE_UOFFSET + FILE_IDENTIFIER_LENGTH)?;
            for byte in ident.bytes().rev() {
                self.add(byte)?;
            }
        }
        self.prep(self.min_align, SIZE_UOFFSET)?;
        self.add_offset(root)?;
        self.head = Some(self.space);
        Ok(())
    }
}

/// Distance from a table back to its vtable, both given as offsets.
fn soffset(vtable: usize, table: usize) -> Result<i32> {
    i32::try_from(vtable as i64 - table as i64).map_err(|_| Error::CapacityExceeded {
        needed: vtable.max(table),
        max: MAX_BUFFER_SIZE,
    })
}
