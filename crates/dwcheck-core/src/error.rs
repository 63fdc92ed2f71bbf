//! # Error Types
//!
//! General error handling for the checker.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::entry::Position;

/// Main error type for checker operations
///
/// ## Error Categories
///
/// 1. **Construction errors**: MalformedStream, DuplicatePosition, UnterminatedEntry
/// 2. **Lookup errors**: UnknownPosition, IndexOutOfRange
/// 3. **Navigation errors**: InvalidState, CorruptNavigation
/// 4. **Check failures**: UnresolvedReference, the user-visible pass/fail signal
/// 5. **Source errors**: Read, UnexpectedEnd
/// 6. **Container errors**: Object, MissingDebugInfo, Io
#[derive(Error, Debug)]
pub enum CheckError
{
    /// A terminator record appeared with no open parent: the nesting stack
    /// underflowed. The position is the last DIE registered before the
    /// stray terminator.
    #[error("malformed DWARF at offset {position}: nesting stack underflow")]
    MalformedStream
    {
        position: Position,
    },

    /// The same stream position was registered twice during construction
    #[error("DIE clash on offset {position}")]
    DuplicatePosition
    {
        position: Position,
    },

    /// End of stream was reached with an entry still open
    #[error("missing terminator, last DIE at offset {last}")]
    UnterminatedEntry
    {
        last: Position,
    },

    /// Lookup for a position that was never registered
    ///
    /// Raised before any source I/O happens, so the cursor state is
    /// untouched.
    #[error("no DIE registered at offset {position}")]
    UnknownPosition
    {
        position: Position,
    },

    /// Lookup by a document-order index past the end of the graph
    #[error("DIE index {0} out of range")]
    IndexOutOfRange(usize),

    /// A navigator operation was invoked in a state that cannot support it,
    /// e.g. `skip_children` with no current entry
    #[error("invalid examiner state: {0}")]
    InvalidState(&'static str),

    /// A subtree skip landed on a record that was never registered in the
    /// graph built from the same source, meaning the stream and the graph
    /// disagree
    #[error("skip_children from DIE at offset {from} landed on unknown DIE at offset {landed}")]
    CorruptNavigation
    {
        from: Position,
        landed: Position,
    },

    /// A derived-from reference does not resolve to a registered DIE
    ///
    /// This is the primary corruption signal the tool exists to report.
    #[error("unresolved abstract origin ref from DIE {index} at offset {position} to bad offset {target}")]
    UnresolvedReference
    {
        index: usize,
        position: Position,
        target: Position,
    },

    /// The source reported end of stream where a record had to exist
    #[error("entry stream ended unexpectedly at offset {position}")]
    UnexpectedEnd
    {
        position: Position,
    },

    /// A low-level DWARF read failed
    #[error("DWARF read error while {context}: {source}")]
    Read
    {
        context: String,
        source: gimli::Error,
    },

    /// The container file could not be parsed as ELF, Mach-O, or PE
    #[error("failed to parse {}: {source}", path.display())]
    Object
    {
        path: PathBuf,
        source: object::Error,
    },

    /// The container parsed fine but carries no `.debug_info`
    #[error("no DWARF debug info in {}", path.display())]
    MissingDebugInfo
    {
        path: PathBuf,
    },

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError
{
    /// Wrap a gimli error with a short description of what was being read
    pub fn read(context: impl Into<String>, source: gimli::Error) -> Self
    {
        CheckError::Read {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for `Result<T, CheckError>`
pub type Result<T> = std::result::Result<T, CheckError>;
