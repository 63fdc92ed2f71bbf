//! DIE stream entry model.
//!
//! One [`Entry`] is one record in the `.debug_info` stream: a position, a
//! tag, a has-children flag, and an ordered attribute list. Entries are
//! plain owned data so the examiner can cache and hand them out without
//! borrowing from the underlying section readers.

use std::fmt;

use gimli::{constants, DwAt, DwTag};

/// Strongly typed `.debug_info` stream offset
///
/// This wrapper around `u64` is the only stable identifier a DIE has across
/// re-reads of the stream, and the only valid cross-reference key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u64);

impl Position
{
    /// Rewind sentinel: seeking here repositions the source at the first
    /// record of the stream. A real DIE can never live at offset zero
    /// because the unit header precedes it.
    pub const START: Self = Position(0);

    pub const fn new(value: u64) -> Self
    {
        Position(value)
    }

    pub const fn value(self) -> u64
    {
        self.0
    }
}

impl From<u64> for Position
{
    fn from(value: u64) -> Self
    {
        Position(value)
    }
}

impl fmt::Display for Position
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

/// What a DIE describes
///
/// The tags the checker actually inspects get their own variants; everything
/// else rides along as `Other` so dumps stay faithful to the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind
{
    CompileUnit,
    Subprogram,
    InlinedSubroutine,
    ArrayType,
    BaseType,
    PointerType,
    StructType,
    Typedef,
    SubrangeType,
    SubroutineType,
    /// Zero-payload record closing the most recently opened child list
    Terminator,
    Other(DwTag),
}

impl EntryKind
{
    pub fn from_tag(tag: DwTag) -> Self
    {
        match tag {
            constants::DW_TAG_compile_unit => EntryKind::CompileUnit,
            constants::DW_TAG_subprogram => EntryKind::Subprogram,
            constants::DW_TAG_inlined_subroutine => EntryKind::InlinedSubroutine,
            constants::DW_TAG_array_type => EntryKind::ArrayType,
            constants::DW_TAG_base_type => EntryKind::BaseType,
            constants::DW_TAG_pointer_type => EntryKind::PointerType,
            constants::DW_TAG_structure_type => EntryKind::StructType,
            constants::DW_TAG_typedef => EntryKind::Typedef,
            constants::DW_TAG_subrange_type => EntryKind::SubrangeType,
            constants::DW_TAG_subroutine_type => EntryKind::SubroutineType,
            other => EntryKind::Other(other),
        }
    }

    /// True for the fixed set of tags that declare a type (the set the
    /// type-name collector reports on).
    pub fn is_type_describing(self) -> bool
    {
        matches!(
            self,
            EntryKind::SubrangeType
                | EntryKind::SubroutineType
                | EntryKind::ArrayType
                | EntryKind::BaseType
                | EntryKind::PointerType
                | EntryKind::StructType
                | EntryKind::Typedef
        )
    }
}

impl fmt::Display for EntryKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            EntryKind::CompileUnit => write!(f, "CompileUnit"),
            EntryKind::Subprogram => write!(f, "Subprogram"),
            EntryKind::InlinedSubroutine => write!(f, "InlinedSubroutine"),
            EntryKind::ArrayType => write!(f, "ArrayType"),
            EntryKind::BaseType => write!(f, "BaseType"),
            EntryKind::PointerType => write!(f, "PointerType"),
            EntryKind::StructType => write!(f, "StructType"),
            EntryKind::Typedef => write!(f, "Typedef"),
            EntryKind::SubrangeType => write!(f, "SubrangeType"),
            EntryKind::SubroutineType => write!(f, "SubroutineType"),
            EntryKind::Terminator => write!(f, "Terminator"),
            EntryKind::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// Attribute kinds the checker cares about, plus a passthrough
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind
{
    /// `DW_AT_name`
    Name,
    /// `DW_AT_abstract_origin`: links a concrete DIE back to the abstract
    /// DIE it was specialized from
    DerivedFrom,
    Other(DwAt),
}

impl fmt::Display for AttrKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            AttrKind::Name => write!(f, "DW_AT_name"),
            AttrKind::DerivedFrom => write!(f, "DW_AT_abstract_origin"),
            AttrKind::Other(at) => write!(f, "{at}"),
        }
    }
}

/// Variant-typed attribute payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue
{
    Text(String),
    /// A position reference into the same stream
    Ref(Position),
    Scalar(u64),
    /// Forms the checker does not interpret (expressions, blocks, ...)
    Other,
}

impl fmt::Display for AttrValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            AttrValue::Text(text) => write!(f, "{text}"),
            AttrValue::Ref(position) => write!(f, "{position}"),
            AttrValue::Scalar(value) => write!(f, "0x{value:x}"),
            AttrValue::Other => write!(f, "<other>"),
        }
    }
}

/// One (attribute kind, value) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAttr
{
    pub kind: AttrKind,
    pub value: AttrValue,
}

/// One record of the debug-info stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry
{
    pub position: Position,
    pub kind: EntryKind,
    pub has_children: bool,
    pub attrs: Vec<EntryAttr>,
}

impl Entry
{
    /// A terminator record at the given position
    pub fn terminator(position: Position) -> Self
    {
        Entry {
            position,
            kind: EntryKind::Terminator,
            has_children: false,
            attrs: Vec::new(),
        }
    }

    pub fn is_terminator(&self) -> bool
    {
        self.kind == EntryKind::Terminator
    }

    /// The `DW_AT_name` string, if present
    pub fn name(&self) -> Option<&str>
    {
        self.attrs.iter().find_map(|attr| match (&attr.kind, &attr.value) {
            (AttrKind::Name, AttrValue::Text(text)) => Some(text.as_str()),
            _ => None,
        })
    }

    /// The `DW_AT_abstract_origin` target, if the attribute is present and
    /// carries a position reference
    pub fn derived_from(&self) -> Option<Position>
    {
        self.attrs.iter().find_map(|attr| match (&attr.kind, &attr.value) {
            (AttrKind::DerivedFrom, AttrValue::Ref(position)) => Some(*position),
            _ => None,
        })
    }
}
