//! dwcheck: reads the DWARF info of a load module (executable, shared
//! library, or object file) and inspects it for problems, primarily
//! abstract-origin references that do not resolve.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};
use dwcheck_core::image::hex_string;
use dwcheck_core::{walk_line_tables, CheckError, DebugImage, DwarfEntrySource, Examiner, LineMode};
use dwcheck_utils::{debug, init_logging, init_logging_with_level, warn, LogFormat, LogLevel};

/// Checks compiled binaries for DWARF debug-info corruption.
#[derive(Parser, Debug)]
#[command(name = "dwcheck")]
#[command(version)]
#[command(about = "Checks compiled binaries for DWARF debug-info corruption", long_about = None)]
struct Cli
{
    /// Binaries to examine
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Verbose trace output level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Number of examination iterations per file
    #[arg(long, default_value_t = 1)]
    iters: u32,

    /// Skip the abstract-origin reference check
    #[arg(long, default_value_t = false)]
    no_check: bool,

    /// Dump the names of all declared types
    #[arg(long, default_value_t = false)]
    types: bool,

    /// Dump the GNU build id
    #[arg(long, default_value_t = false)]
    build_id: bool,

    /// Report total DWARF section size
    #[arg(long, default_value_t = false)]
    sizes: bool,

    /// Report per-section sizes with percentages
    #[arg(long, default_value_t = false)]
    sizes_detail: bool,

    /// Decode every compilation unit's line table
    #[arg(long, default_value_t = false)]
    lines: bool,

    /// Decode and print every line table row
    #[arg(long, default_value_t = false)]
    dump_lines: bool,
}

fn main()
{
    let cli = Cli::parse();

    // -v raises the level; with no -v the environment config applies
    let init_result = match cli.verbose {
        0 => init_logging(),
        1 => init_logging_with_level(LogLevel::Debug, LogFormat::Pretty),
        _ => init_logging_with_level(LogLevel::Trace, LogFormat::Pretty),
    };
    if let Err(e) = init_result {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(2);
    }

    let mut status = 0;
    for file in &cli.files {
        for _ in 0..cli.iters {
            if !examine_file(file, &cli) {
                status = 1;
            }
        }
    }
    process::exit(status);
}

/// Examine one binary; warns and returns false on any failure
fn examine_file(path: &Path, cli: &Cli) -> bool
{
    debug!("examining DWARF for {}", path.display());
    let image = match DebugImage::parse(path) {
        Ok(image) => image,
        Err(err) => {
            warn!("unable to open {}: {err}", path.display());
            return false;
        }
    };

    if cli.build_id {
        match image.build_id() {
            Some(id) => println!("found build id '{}' in {}", hex_string(id), path.display()),
            None => println!("no build id in {}", path.display()),
        }
    }

    if cli.sizes || cli.sizes_detail {
        if cli.sizes_detail {
            println!("{}", image.size_report().render_detail());
        } else {
            println!("{}", image.size_report().render_summary());
        }
    }

    if !cli.no_check || cli.types {
        if !examine_entry_graph(path, cli, &image) {
            return false;
        }
    }

    if cli.lines || cli.dump_lines {
        let mode = if cli.dump_lines { LineMode::Dump } else { LineMode::Silent };
        let dwarf = match image.dwarf() {
            Ok(dwarf) => dwarf,
            Err(err) => {
                warn!("error loading DWARF for {}: {err}", path.display());
                return false;
            }
        };
        if let Err(err) = walk_line_tables(dwarf, mode) {
            warn!("error decoding line tables for {}: {err}", path.display());
            return false;
        }
    }

    true
}

fn examine_entry_graph(path: &Path, cli: &Cli, image: &DebugImage) -> bool
{
    let examiner = image
        .load_dwarf()
        .and_then(DwarfEntrySource::new)
        .and_then(Examiner::new);
    let mut examiner = match examiner {
        Ok(examiner) => examiner,
        Err(err) => {
            warn!("error initializing examiner for {}: {err}", path.display());
            return false;
        }
    };

    if !cli.no_check {
        match examiner.validate() {
            Ok(stats) => {
                debug!(
                    "read {} DIEs, processed {} abstract origin refs",
                    stats.entries_visited, stats.refs_checked
                );
            }
            Err(err) => {
                warn!("{}: {err}", path.display());
                // Dump the offending entry and its parent for triage
                if let CheckError::UnresolvedReference { index, .. } = err {
                    match examiner.render_entry(index, false, true) {
                        Ok(dump) => eprintln!("{dump}"),
                        Err(render_err) => eprintln!("{render_err}"),
                    }
                }
                return false;
            }
        }
    }

    if cli.types {
        let names = match examiner.collect_type_names() {
            Ok(names) => names,
            Err(err) => {
                warn!("error collecting type names for {}: {err}", path.display());
                return false;
            }
        };
        println!("Types:");
        for (index, name) in names.iter().enumerate() {
            println!("{index} {name}");
        }
    }

    true
}
