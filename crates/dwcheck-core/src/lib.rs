//! # dwcheck-core
//!
//! DWARF entry-graph examination and integrity checking.
//!
//! This crate reads the debug information of a compiled binary (executable,
//! shared library, or object file) and verifies structural soundness of its
//! DIE graph, primarily that every abstract-origin back-reference resolves
//! to a real, registered DIE. The pieces:
//!
//! - [`image::DebugImage`]: opens an ELF/Mach-O/PE container and extracts
//!   the DWARF sections
//! - [`source::EntrySource`]: a forward-only cursor over the DIE stream,
//!   with [`source::DwarfEntrySource`] as the gimli-backed implementation
//! - [`examiner::Examiner`]: rebuilds the DIE tree from the flat stream and
//!   answers random-access lookups through a single-slot cache
//! - [`checks`]: the reference validator and type-name collector
//! - [`lines`]: line-table decoding and dumping
//!
//! One examiner is built per binary from a single pass over its stream and
//! discarded afterwards; instances are not safe for concurrent use, but
//! separate binaries can be examined fully independently.

pub mod checks;
pub mod entry;
pub mod error;
pub mod examiner;
pub mod image;
pub mod lines;
pub mod source;

pub use checks::ValidationStats;
pub use entry::{AttrKind, AttrValue, Entry, EntryAttr, EntryKind, Position};
pub use error::{CheckError, Result};
pub use examiner::Examiner;
pub use image::{DebugImage, SizeReport};
pub use lines::{walk_line_tables, LineMode, LineStats};
pub use source::{DwarfEntrySource, EntrySource, OwnedDwarf, OwnedReader};
