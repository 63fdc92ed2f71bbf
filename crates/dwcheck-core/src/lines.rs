//! Line-number-table decoding and dumping.
//!
//! Decoding every unit's line program is a cheap way to shake out corrupt
//! `.debug_line` data even when nothing is printed; dump mode additionally
//! prints one line per row for manual inspection.

use std::borrow::Cow;
use std::num::NonZeroU64;

use gimli::{AttributeValue, FileEntry, LineProgramHeader, Reader as _, Unit};
use tracing::debug;

use crate::error::{CheckError, Result};
use crate::source::{OwnedDwarf, OwnedReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode
{
    /// Decode every row, print nothing
    Silent,
    /// Decode and print every row
    Dump,
}

/// Counters from a line-table walk
#[derive(Debug, Clone, Copy, Default)]
pub struct LineStats
{
    pub programs: usize,
    pub rows: u64,
}

/// Decode the line table of every compilation unit
pub fn walk_line_tables(dwarf: &OwnedDwarf, mode: LineMode) -> Result<LineStats>
{
    let mut stats = LineStats::default();

    let mut headers = dwarf.units();
    while let Some(header) = headers
        .next()
        .map_err(|err| CheckError::read("reading .debug_info unit header", err))?
    {
        let unit = dwarf
            .unit(header)
            .map_err(|err| CheckError::read("parsing compilation unit", err))?;
        let Some(program) = unit.line_program.clone() else {
            continue;
        };
        stats.programs += 1;

        let mut rows = program.rows();
        while let Some((header, row)) = rows
            .next_row()
            .map_err(|err| CheckError::read("decoding line table row", err))?
        {
            stats.rows += 1;
            if mode == LineMode::Dump {
                let file = row
                    .file(header)
                    .map_or_else(|| "?".to_string(), |entry| render_file_name(dwarf, &unit, header, entry));
                let line = row.line().map_or(0, NonZeroU64::get);
                println!(
                    "Address: {:x} File: {} Line: {} IsStmt: {} PrologueEnd: {}",
                    row.address(),
                    file,
                    line,
                    row.is_stmt(),
                    row.prologue_end()
                );
            }
        }
    }

    debug!(programs = stats.programs, rows = stats.rows, "decoded line tables");
    Ok(stats)
}

fn render_file_name(
    dwarf: &OwnedDwarf,
    unit: &Unit<OwnedReader>,
    header: &LineProgramHeader<OwnedReader>,
    entry: &FileEntry<OwnedReader>,
) -> String
{
    let name = attr_display(dwarf, unit, entry.path_name());
    match entry.directory(header).map(|dir| attr_display(dwarf, unit, dir)) {
        Some(dir) if !dir.is_empty() && !name.starts_with('/') => format!("{dir}/{name}"),
        _ => name,
    }
}

fn attr_display(dwarf: &OwnedDwarf, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> String
{
    dwarf
        .attr_string(unit, value)
        .ok()
        .and_then(|reader| reader.to_string_lossy().ok().map(Cow::into_owned))
        .unwrap_or_else(|| "?".to_string())
}
