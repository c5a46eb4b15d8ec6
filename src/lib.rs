//! Flatbuf - zero-copy builder and accessors for the FlatBuffers binary format
//!
//! Buffers are built back to front by a [`Builder`] and read in place through
//! [`TableAccessor`] and [`VectorAccessor`] without any decoding step. Field
//! layouts (indices, sizes and defaults) come from the caller, typically
//! generated code; this crate never looks at a schema.
//!
//! # Example
//!
//! ```rust
//! use flatbuf::{root_table, Builder, Result};
//!
//! fn main() -> Result<()> {
//!     // Encoding
//!     let mut builder = Builder::new();
//!     let name = builder.create_string("hello")?;
//!     let scores = builder.create_vector(&[3u16, 1, 2])?;
//!     builder.start_object(3)?;
//!     builder.add_offset_field(1, name)?;
//!     builder.add_offset_field(2, scores)?;
//!     builder.add_field::<i32>(0, 42, 0)?;
//!     let root = builder.end_object()?;
//!     builder.finish(root)?;
//!     let data = builder.finished_data()?;
//!
//!     // Decoding
//!     let table = root_table(data)?;
//!     assert_eq!(table.get::<i32>(0, 0)?, 42);
//!     assert_eq!(table.get_str(1)?, Some("hello"));
//!     let scores = table.get_vector_of::<u16>(2)?.map(|v| v.to_vec()).transpose()?;
//!     assert_eq!(scores, Some(vec![3, 1, 2]));
//!     Ok(())
//! }
//! ```

mod builder;
mod cursor;
mod error;
pub mod memory;
mod table;
mod types;
mod vector;
mod view;

pub use builder::Builder;
pub use cursor::{Cursor, CursorMut};
pub use error::{Error, Result};
pub use memory::MemoryView;
pub use table::{root_table, root_table_with_identifier, TableAccessor, TableAccessorMut};
pub use types::{
    field_index_to_vtable_offset, Offset, Scalar, StringKind, StringOffset, StructKind,
    StructOffset, TableKind, TableOffset, VectorKind, VectorOffset, DEFAULT_CAPACITY,
    FILE_IDENTIFIER_LENGTH, MAX_BUFFER_SIZE, MAX_FIELDS, SIZE_PREFIX_LENGTH, SIZE_SOFFSET,
    SIZE_UOFFSET, SIZE_VOFFSET, VTABLE_METADATA_FIELDS,
};
pub use vector::{VectorAccessor, VectorAccessorMut};
pub use view::{Vector, VectorElement, VectorIter, VectorMut};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
