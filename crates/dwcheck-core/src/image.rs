//! Binary container parsing and DWARF section loading.
//!
//! This is the file-format layer around the examiner: it opens an ELF,
//! Mach-O, or PE binary with the `object` crate, pulls the DWARF sections
//! into owned blobs, and hands out a lazily built `gimli::Dwarf`. Section
//! size accounting and GNU build-id extraction live here too since both are
//! container-level concerns.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use once_cell::sync::OnceCell;

use crate::error::{CheckError, Result};
use crate::source::{OwnedDwarf, OwnedReader};

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
    (".debug_frame", &[".debug_frame", "__debug_frame"]),
    (".debug_macro", &[".debug_macro", "__debug_macro"]),
    (".debug_cu_index", &[".debug_cu_index"]),
    (".debug_tu_index", &[".debug_tu_index"]),
];

/// True for sections that are DWARF under the covers, `.eh_frame` included
fn is_debug_section(name: &str) -> bool
{
    name.starts_with(".debug_")
        || name.starts_with(".zdebug_")
        || name.starts_with(".eh_frame")
        || name.starts_with("__debug_")
        || name.starts_with("__zdebug_")
        || name.starts_with("__eh_frame")
}

fn load_section_bytes(file: &object::File<'_>, path: &Path, names: &[&str]) -> Result<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data().map_err(|err| CheckError::Object {
                path: path.to_path_buf(),
                source: err,
            })?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

/// Per-section byte accounting
#[derive(Debug, Clone)]
pub struct SectionSize
{
    pub name: String,
    pub size: u64,
    pub is_debug: bool,
}

/// DWARF-vs-file size breakdown for one binary
#[derive(Debug, Clone, Default)]
pub struct SizeReport
{
    pub sections: Vec<SectionSize>,
    pub debug_total: u64,
    pub file_total: u64,
}

impl SizeReport
{
    pub fn render_summary(&self) -> String
    {
        format!("DWARF size total: {} bytes", self.debug_total)
    }

    pub fn render_detail(&self) -> String
    {
        let mut out = String::new();
        for section in &self.sections {
            if section.is_debug {
                let _ = writeln!(
                    out,
                    "section {:>15}: {:>10} bytes, {} of DWARF, {} of exe",
                    section.name,
                    section.size,
                    percent(section.size, self.debug_total),
                    percent(section.size, self.file_total)
                );
            } else {
                let _ = writeln!(
                    out,
                    "section {:>15}: {:>10} bytes, {} of exe",
                    section.name,
                    section.size,
                    percent(section.size, self.file_total)
                );
            }
        }
        let _ = writeln!(
            out,
            "DWARF size total: {} bytes, {} of exe",
            self.debug_total,
            percent(self.debug_total, self.file_total)
        );
        let _ = write!(out, "Exe size total: {} bytes", self.file_total);
        out
    }
}

fn percent(value: u64, total: u64) -> String
{
    if value == 0 || total == 0 {
        return "0%".to_string();
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = value as f64 / total as f64;
    format!("{:2.2}%", ratio * 100.0)
}

/// One opened binary with its DWARF sections cached in memory
pub struct DebugImage
{
    path: PathBuf,
    endian: RunTimeEndian,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    build_id: Option<Vec<u8>>,
    sizes: SizeReport,
    dwarf_cache: OnceCell<OwnedDwarf>,
}

impl DebugImage
{
    /// Read the file and extract everything the checks need
    ///
    /// Fails with `MissingDebugInfo` when the container parses but carries
    /// no `.debug_info` section; there is nothing to examine then.
    pub fn parse(path: impl Into<PathBuf>) -> Result<Self>
    {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let file = object::File::parse(&*bytes).map_err(|err| CheckError::Object {
            path: path.clone(),
            source: err,
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            let data = load_section_bytes(&file, &path, aliases)?;
            sections.insert(*canonical, data);
        }
        if sections.get(".debug_info").is_none_or(|data| data.is_empty()) {
            return Err(CheckError::MissingDebugInfo { path });
        }

        let build_id = file.build_id().ok().flatten().map(<[u8]>::to_vec);

        let mut sizes = SizeReport::default();
        for section in file.sections() {
            let name = section.name().unwrap_or("<unnamed>").to_string();
            let size = section.size();
            let is_debug = is_debug_section(&name);
            sizes.file_total += size;
            if is_debug {
                sizes.debug_total += size;
            }
            sizes.sections.push(SectionSize { name, size, is_debug });
        }

        Ok(Self {
            path,
            endian,
            debug_sections: sections,
            build_id,
            sizes,
            dwarf_cache: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn endian(&self) -> RunTimeEndian
    {
        self.endian
    }

    /// GNU build id bytes, when the container carries one
    pub fn build_id(&self) -> Option<&[u8]>
    {
        self.build_id.as_deref()
    }

    pub fn size_report(&self) -> &SizeReport
    {
        &self.sizes
    }

    /// The parsed DWARF, built on first use from the cached section blobs
    pub fn dwarf(&self) -> Result<&OwnedDwarf>
    {
        self.dwarf_cache.get_or_try_init(|| self.load_dwarf())
    }

    /// A fresh owned DWARF instance, for handing off to an entry source
    ///
    /// Cheap: the section blobs are shared, only the unit bookkeeping is
    /// rebuilt.
    pub fn load_dwarf(&self) -> Result<OwnedDwarf>
    {
        Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
            .map_err(|err| CheckError::read("loading DWARF sections", err))
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let key = match id {
            SectionId::DebugAbbrev => ".debug_abbrev",
            SectionId::DebugAddr => ".debug_addr",
            SectionId::DebugInfo => ".debug_info",
            SectionId::DebugLine => ".debug_line",
            SectionId::DebugLineStr => ".debug_line_str",
            SectionId::DebugRanges => ".debug_ranges",
            SectionId::DebugRngLists => ".debug_rnglists",
            SectionId::DebugStr => ".debug_str",
            SectionId::DebugStrOffsets => ".debug_str_offsets",
            SectionId::DebugTypes => ".debug_types",
            SectionId::DebugLoc => ".debug_loc",
            SectionId::DebugLocLists => ".debug_loclists",
            SectionId::DebugFrame => ".debug_frame",
            SectionId::DebugMacro => ".debug_macro",
            SectionId::DebugCuIndex => ".debug_cu_index",
            SectionId::DebugTuIndex => ".debug_tu_index",
            _ => "",
        };

        let data = self
            .debug_sections
            .get(key)
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }
}

/// Render a build id as lowercase hex for reporting
pub fn hex_string(bytes: &[u8]) -> String
{
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
