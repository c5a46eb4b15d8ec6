//! Buffer addressing: a byte slice plus a position.
//!
//! The format has two pointer kinds. Structs and vtable entries are reached
//! inline, by adding a distance to a known base ([`Cursor::resolve_inline`]).
//! Tables, vectors and strings are reached through a uoffset, a `u32` stored
//! at some location `L` whose referent lives at `L + value`
//! ([`Cursor::resolve_indirect`]).

use crate::error::{Error, Result};
use crate::memory;
use crate::types::{Scalar, SIZE_UOFFSET};

/// Follows the uoffset stored at `at`, checking the target stays in bounds.
pub(crate) fn follow_uoffset(bytes: &[u8], at: usize) -> Result<usize> {
    let value = memory::load::<u32>(bytes, at)? as usize;
    match at.checked_add(value) {
        Some(target) if target < bytes.len() => Ok(target),
        _ => Err(Error::malformed(format!(
            "uoffset {value} at {at} points outside a buffer of {} bytes",
            bytes.len()
        ))),
    }
}

/// Read-only position in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at `pos`.
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Creates a cursor at the root object of a finished buffer.
    pub fn root(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < SIZE_UOFFSET {
            return Err(Error::malformed(format!(
                "buffer of {} bytes has no room for a root offset",
                buf.len()
            )));
        }
        Self::new(buf, 0).resolve_indirect(0)
    }

    /// Returns the underlying buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Returns the byte position within the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Loads a scalar `rel` bytes past this position.
    #[inline]
    pub fn load<T: Scalar>(&self, rel: usize) -> Result<T> {
        memory::load(self.buf, self.address(rel)?)
    }

    /// Borrows `len` bytes starting `rel` bytes past this position.
    pub fn bytes(&self, rel: usize, len: usize) -> Result<&'a [u8]> {
        memory::slice(self.buf, self.address(rel)?, len)
    }

    /// Returns a cursor `rel` bytes further on, without indirection.
    #[inline]
    pub fn resolve_inline(&self, rel: usize) -> Cursor<'a> {
        Cursor::new(self.buf, self.pos.saturating_add(rel))
    }

    /// Returns a cursor at the object referenced by the uoffset stored
    /// `rel` bytes past this position.
    #[inline]
    pub fn resolve_indirect(&self, rel: usize) -> Result<Cursor<'a>> {
        let target = follow_uoffset(self.buf, self.address(rel)?)?;
        Ok(Cursor::new(self.buf, target))
    }

    fn address(&self, rel: usize) -> Result<usize> {
        self.pos
            .checked_add(rel)
            .ok_or_else(|| Error::out_of_range(self.pos, rel, self.buf.len()))
    }
}

/// Position in a mutable buffer, for in-place updates of written values.
#[derive(Debug)]
pub struct CursorMut<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> CursorMut<'a> {
    /// Creates a cursor at `pos`.
    pub fn new(buf: &'a mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Returns the byte position within the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Borrows this cursor as a read-only one.
    pub fn as_cursor(&self) -> Cursor<'_> {
        Cursor::new(&*self.buf, self.pos)
    }

    /// Reborrows for a shorter lifetime so `self` stays usable.
    pub fn reborrow(&mut self) -> CursorMut<'_> {
        CursorMut::new(self.buf, self.pos)
    }

    /// Loads a scalar `rel` bytes past this position.
    pub fn load<T: Scalar>(&self, rel: usize) -> Result<T> {
        self.as_cursor().load(rel)
    }

    /// Overwrites the scalar `rel` bytes past this position.
    pub fn store<T: Scalar>(&mut self, rel: usize, value: T) -> Result<()> {
        let at = self
            .pos
            .checked_add(rel)
            .ok_or_else(|| Error::out_of_range(self.pos, rel, self.buf.len()))?;
        memory::store(self.buf, at, value)
    }

    /// Encodes `src` over consecutive values starting `rel` bytes past
    /// this position.
    pub fn store_slice<T: Scalar>(&mut self, rel: usize, src: &[T]) -> Result<()> {
        let at = self
            .pos
            .checked_add(rel)
            .ok_or_else(|| Error::out_of_range(self.pos, rel, self.buf.len()))?;
        memory::store_slice(self.buf, at, src)
    }

    /// Moves `rel` bytes further on, without indirection.
    pub fn resolve_inline(self, rel: usize) -> CursorMut<'a> {
        let pos = self.pos.saturating_add(rel);
        CursorMut::new(self.buf, pos)
    }

    /// Moves to the object referenced by the uoffset `rel` bytes on.
    pub fn resolve_indirect(self, rel: usize) -> Result<CursorMut<'a>> {
        let pos = self.as_cursor().resolve_indirect(rel)?.position();
        Ok(CursorMut::new(self.buf, pos))
    }
}

/// Size of the uoffset slot an indirect element occupies.
pub(crate) const INDIRECT_STRIDE: usize = SIZE_UOFFSET;
