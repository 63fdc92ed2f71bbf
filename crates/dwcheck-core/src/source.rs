//! Forward-only entry sources over the debug-info stream.
//!
//! The examiner never touches gimli directly; it consumes an [`EntrySource`],
//! which models the stream the way `.debug_info` is actually encoded: a flat
//! pre-order record sequence where terminators close child lists, plus an
//! expensive reposition primitive. [`DwarfEntrySource`] is the production
//! implementation on top of gimli's raw entry reader.

use gimli::{constants, Attribute, AttributeValue, Dwarf, EndianArcSlice, Reader as _, RunTimeEndian, Unit,
    UnitOffset, UnitSectionOffset};

use crate::entry::{AttrKind, AttrValue, Entry, EntryAttr, EntryKind, Position};
use crate::error::{CheckError, Result};

pub type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub type OwnedDwarf = Dwarf<OwnedReader>;

/// A forward-only cursor over the debug-info record stream
///
/// Terminator records are yielded like any other record; `next` returning
/// `Ok(None)` means end of stream.
pub trait EntrySource
{
    /// Read the next record, advancing past it
    fn next(&mut self) -> Result<Option<Entry>>;

    /// Reposition the cursor so the following `next` re-reads the record at
    /// `position`. Seeking to [`Position::START`] rewinds to the first
    /// record of the stream.
    fn seek(&mut self, position: Position) -> Result<()>;

    /// Advance past all descendants of the record most recently returned by
    /// `next`, landing just before its next sibling or terminator. A no-op
    /// when that record has no children or when nothing has been read yet.
    fn skip_subtree(&mut self) -> Result<()>;
}

/// One materialized compilation unit plus its `.debug_info` byte range
struct UnitSlot
{
    unit: Unit<OwnedReader>,
    start: u64,
    end: u64,
}

#[derive(Debug, Clone, Copy)]
struct Cursor
{
    unit: usize,
    /// None = positioned at the first DIE of the unit
    offset: Option<UnitOffset<usize>>,
}

/// [`EntrySource`] over gimli's raw `.debug_info` entry reader
///
/// Units are materialized up front; the cursor state is a (unit, unit
/// offset) pair and a fresh raw reader is opened per read, which sidesteps
/// holding a borrowing gimli cursor inside the struct. Seeks are direct
/// rather than a rescan, but callers must not rely on that: the trait
/// contract still treats them as expensive.
pub struct DwarfEntrySource
{
    dwarf: OwnedDwarf,
    units: Vec<UnitSlot>,
    cursor: Cursor,
    /// has-children flag of the most recently returned record; None when no
    /// record is current (fresh source, or right after a seek/skip)
    last_children: Option<bool>,
}

impl DwarfEntrySource
{
    pub fn new(dwarf: OwnedDwarf) -> Result<Self>
    {
        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| CheckError::read("reading .debug_info unit header", err))?
        {
            let start = match header.offset() {
                UnitSectionOffset::DebugInfoOffset(offset) => offset.0 as u64,
                UnitSectionOffset::DebugTypesOffset(offset) => offset.0 as u64,
            };
            let end = start + header.length_including_self() as u64;
            let unit = dwarf
                .unit(header)
                .map_err(|err| CheckError::read("parsing compilation unit", err))?;
            units.push(UnitSlot { unit, start, end });
        }

        Ok(Self {
            dwarf,
            units,
            cursor: Cursor { unit: 0, offset: None },
            last_children: None,
        })
    }

    pub fn unit_count(&self) -> usize
    {
        self.units.len()
    }
}

impl EntrySource for DwarfEntrySource
{
    fn next(&mut self) -> Result<Option<Entry>>
    {
        loop {
            let Some(slot) = self.units.get(self.cursor.unit) else {
                self.last_children = None;
                return Ok(None);
            };

            let mut raw = slot
                .unit
                .entries_raw(self.cursor.offset)
                .map_err(|err| CheckError::read("positioning raw entry reader", err))?;
            if raw.is_empty() {
                // Unit exhausted; continue with the next one.
                self.cursor = Cursor {
                    unit: self.cursor.unit + 1,
                    offset: None,
                };
                continue;
            }

            let unit_offset = raw.next_offset();
            let position = Position::new(slot.start + unit_offset.0 as u64);
            let abbrev = raw
                .read_abbreviation()
                .map_err(|err| CheckError::read("reading DIE abbreviation", err))?;

            let entry = match abbrev {
                None => Entry::terminator(position),
                Some(abbrev) => {
                    let mut attrs = Vec::with_capacity(abbrev.attributes().len());
                    for spec in abbrev.attributes() {
                        let attr = raw
                            .read_attribute(*spec)
                            .map_err(|err| CheckError::read("reading DIE attribute", err))?;
                        attrs.push(convert_attribute(&self.dwarf, slot, &attr));
                    }
                    Entry {
                        position,
                        kind: EntryKind::from_tag(abbrev.tag()),
                        has_children: abbrev.has_children(),
                        attrs,
                    }
                }
            };

            self.cursor.offset = Some(raw.next_offset());
            self.last_children = Some(entry.has_children);
            return Ok(Some(entry));
        }
    }

    fn seek(&mut self, position: Position) -> Result<()>
    {
        self.last_children = None;
        if position == Position::START {
            self.cursor = Cursor { unit: 0, offset: None };
            return Ok(());
        }

        let target = position.value();
        let Some(index) = self.units.iter().position(|slot| target >= slot.start && target < slot.end) else {
            return Err(CheckError::UnknownPosition { position });
        };
        let offset = UnitOffset((target - self.units[index].start) as usize);
        self.cursor = Cursor {
            unit: index,
            offset: Some(offset),
        };
        Ok(())
    }

    fn skip_subtree(&mut self) -> Result<()>
    {
        if self.last_children != Some(true) {
            // No current record, or a childless one: already at the next
            // sibling position.
            return Ok(());
        }
        let Some(slot) = self.units.get(self.cursor.unit) else {
            return Ok(());
        };

        // The cursor sits at the first child. Scan raw records, tracking
        // nesting depth, until the terminator that closes the child list.
        let mut raw = slot
            .unit
            .entries_raw(self.cursor.offset)
            .map_err(|err| CheckError::read("positioning raw entry reader", err))?;
        let mut depth = 1_usize;
        while depth > 0 {
            if raw.is_empty() {
                // Truncated unit; next() will move on to the next unit.
                break;
            }
            match raw
                .read_abbreviation()
                .map_err(|err| CheckError::read("skipping subtree", err))?
            {
                None => depth -= 1,
                Some(abbrev) => {
                    raw.skip_attributes(abbrev.attributes())
                        .map_err(|err| CheckError::read("skipping subtree attributes", err))?;
                    if abbrev.has_children() {
                        depth += 1;
                    }
                }
            }
        }

        self.cursor.offset = Some(raw.next_offset());
        self.last_children = None;
        Ok(())
    }
}

fn convert_attribute(dwarf: &OwnedDwarf, slot: &UnitSlot, attr: &Attribute<OwnedReader>) -> EntryAttr
{
    let kind = match attr.name() {
        constants::DW_AT_name => AttrKind::Name,
        constants::DW_AT_abstract_origin => AttrKind::DerivedFrom,
        other => AttrKind::Other(other),
    };

    let value = match attr.value() {
        AttributeValue::UnitRef(offset) => AttrValue::Ref(Position::new(slot.start + offset.0 as u64)),
        AttributeValue::DebugInfoRef(offset) => AttrValue::Ref(Position::new(offset.0 as u64)),
        value => {
            if let Ok(reader) = dwarf.attr_string(&slot.unit, value) {
                match reader.to_string_lossy() {
                    Ok(text) => AttrValue::Text(text.into_owned()),
                    Err(_) => AttrValue::Other,
                }
            } else if let Some(scalar) = attr.udata_value() {
                AttrValue::Scalar(scalar)
            } else {
                AttrValue::Other
            }
        }
    };

    EntryAttr { kind, value }
}
