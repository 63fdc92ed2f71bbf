//! Examiner tests over scripted in-memory entry streams.
//!
//! A `ScriptSource` replays a fixed record sequence with the same cursor
//! semantics as the DWARF-backed source: forward-only reads, rewind on
//! seek-to-start, and depth-counting subtree skips. This exercises the graph
//! builder, the locator cache, the navigator, and the checks without
//! needing a fixture binary.

use std::cell::Cell;
use std::rc::Rc;

use dwcheck_core::entry::{AttrKind, AttrValue, Entry, EntryAttr, EntryKind, Position};
use dwcheck_core::error::CheckError;
use dwcheck_core::source::EntrySource;
use dwcheck_core::Examiner;

#[derive(Debug, Default, Clone)]
struct Counters
{
    reads: Rc<Cell<usize>>,
    seeks: Rc<Cell<usize>>,
    fail_next_read: Rc<Cell<bool>>,
}

#[derive(Debug)]
struct ScriptSource
{
    entries: Vec<Entry>,
    cursor: usize,
    last: Option<usize>,
    counters: Counters,
    /// Swapped in at the end of the first full pass, to simulate a source
    /// that disagrees with the graph built from it
    post_build_swap: Option<(usize, Entry)>,
}

impl ScriptSource
{
    fn new(entries: Vec<Entry>) -> Self
    {
        ScriptSource {
            entries,
            cursor: 0,
            last: None,
            counters: Counters::default(),
            post_build_swap: None,
        }
    }

    fn with_counters(entries: Vec<Entry>, counters: Counters) -> Self
    {
        ScriptSource {
            counters,
            ..ScriptSource::new(entries)
        }
    }
}

impl EntrySource for ScriptSource
{
    fn next(&mut self) -> dwcheck_core::Result<Option<Entry>>
    {
        self.counters.reads.set(self.counters.reads.get() + 1);
        if self.counters.fail_next_read.replace(false) {
            return Err(CheckError::read("scripted read failure", gimli::Error::Io));
        }
        if self.cursor >= self.entries.len() {
            if let Some((index, entry)) = self.post_build_swap.take() {
                self.entries[index] = entry;
            }
            self.last = None;
            return Ok(None);
        }
        let entry = self.entries[self.cursor].clone();
        self.last = Some(self.cursor);
        self.cursor += 1;
        Ok(Some(entry))
    }

    fn seek(&mut self, position: Position) -> dwcheck_core::Result<()>
    {
        self.counters.seeks.set(self.counters.seeks.get() + 1);
        self.last = None;
        if position == Position::START {
            self.cursor = 0;
            return Ok(());
        }
        match self.entries.iter().position(|entry| entry.position == position) {
            Some(index) => {
                self.cursor = index;
                Ok(())
            }
            None => Err(CheckError::UnknownPosition { position }),
        }
    }

    fn skip_subtree(&mut self) -> dwcheck_core::Result<()>
    {
        let Some(last) = self.last.take() else {
            return Ok(());
        };
        if !self.entries[last].has_children {
            return Ok(());
        }
        let mut depth = 1_usize;
        while depth > 0 && self.cursor < self.entries.len() {
            let entry = &self.entries[self.cursor];
            self.cursor += 1;
            if entry.is_terminator() {
                depth -= 1;
            } else if entry.has_children {
                depth += 1;
            }
        }
        Ok(())
    }
}

fn die(position: u64, kind: EntryKind, has_children: bool) -> Entry
{
    Entry {
        position: Position::new(position),
        kind,
        has_children,
        attrs: Vec::new(),
    }
}

fn named(mut entry: Entry, name: &str) -> Entry
{
    entry.attrs.push(EntryAttr {
        kind: AttrKind::Name,
        value: AttrValue::Text(name.to_string()),
    });
    entry
}

fn derived(mut entry: Entry, target: u64) -> Entry
{
    entry.attrs.push(EntryAttr {
        kind: AttrKind::DerivedFrom,
        value: AttrValue::Ref(Position::new(target)),
    });
    entry
}

fn end(position: u64) -> Entry
{
    Entry::terminator(Position::new(position))
}

/// CU with a base type, a subprogram owning an inlined call, and a struct
fn well_formed_stream() -> Vec<Entry>
{
    vec![
        die(0x0b, EntryKind::CompileUnit, true),
        named(die(0x10, EntryKind::BaseType, false), "int"),
        named(die(0x18, EntryKind::Subprogram, true), "main"),
        derived(die(0x20, EntryKind::InlinedSubroutine, false), 0x18),
        end(0x26),
        named(die(0x30, EntryKind::StructType, false), "pair"),
        end(0x38),
    ]
}

#[test]
fn test_build_well_formed_stream()
{
    let examiner = Examiner::new(ScriptSource::new(well_formed_stream())).unwrap();
    assert_eq!(examiner.len(), 5);
    assert!(!examiner.is_empty());

    // Document order, terminators unregistered
    let positions: Vec<u64> = examiner.positions().iter().map(|p| p.value()).collect();
    assert_eq!(positions, vec![0x0b, 0x10, 0x18, 0x20, 0x30]);

    // Adjacency: CU owns base type, subprogram, struct; inlined call sits
    // under the subprogram
    assert_eq!(examiner.child_indices(0), &[1, 2, 4]);
    assert_eq!(examiner.child_indices(2), &[3]);
    assert_eq!(examiner.parent_index(3), Some(2));
    assert_eq!(examiner.parent_index(0), None);
}

#[test]
fn test_build_rejects_stray_terminator()
{
    let stream = vec![die(0x10, EntryKind::CompileUnit, false), end(0x14)];
    let err = Examiner::new(ScriptSource::new(stream)).unwrap_err();
    assert!(matches!(err, CheckError::MalformedStream { position } if position.value() == 0x10));
}

#[test]
fn test_build_rejects_leading_terminator()
{
    let err = Examiner::new(ScriptSource::new(vec![end(0x04)])).unwrap_err();
    assert!(matches!(err, CheckError::MalformedStream { position } if position == Position::START));
}

#[test]
fn test_build_rejects_missing_terminator()
{
    let stream = vec![
        die(0x10, EntryKind::CompileUnit, true),
        die(0x20, EntryKind::Subprogram, false),
    ];
    let err = Examiner::new(ScriptSource::new(stream)).unwrap_err();
    assert!(matches!(err, CheckError::UnterminatedEntry { last } if last.value() == 0x20));
}

#[test]
fn test_build_rejects_duplicate_position()
{
    let stream = vec![
        die(0x10, EntryKind::BaseType, false),
        die(0x10, EntryKind::Typedef, false),
    ];
    let err = Examiner::new(ScriptSource::new(stream)).unwrap_err();
    assert!(matches!(err, CheckError::DuplicatePosition { position } if position.value() == 0x10));
}

#[test]
fn test_lookup_every_registered_position()
{
    let mut examiner = Examiner::new(ScriptSource::new(well_formed_stream())).unwrap();
    for position in examiner.positions().to_vec() {
        let entry = examiner.entry_at_position(position).unwrap();
        assert_eq!(entry.position, position);
    }
}

#[test]
fn test_lookup_unknown_position_reads_nothing()
{
    let counters = Counters::default();
    let source = ScriptSource::with_counters(well_formed_stream(), counters.clone());
    let mut examiner = Examiner::new(source).unwrap();

    let reads_after_build = counters.reads.get();
    let err = examiner.entry_at_position(Position::new(0x999)).unwrap_err();
    assert!(matches!(err, CheckError::UnknownPosition { position } if position.value() == 0x999));
    assert_eq!(counters.reads.get(), reads_after_build, "unknown lookup must not touch the source");
}

#[test]
fn test_lookup_is_idempotent()
{
    let mut examiner = Examiner::new(ScriptSource::new(well_formed_stream())).unwrap();
    let first = examiner.entry_at_position(Position::new(0x18)).unwrap();
    let other = examiner.entry_at_position(Position::new(0x30)).unwrap();
    let again = examiner.entry_at_position(Position::new(0x18)).unwrap();
    assert_eq!(first, again);
    assert_eq!(other.position.value(), 0x30);
}

#[test]
fn test_document_order_walk_uses_forward_probe()
{
    // Flat stream: no nesting, so a sequential walk should need exactly the
    // one seek that primes the cursor.
    let stream = vec![
        die(0x10, EntryKind::BaseType, false),
        die(0x18, EntryKind::BaseType, false),
        die(0x20, EntryKind::BaseType, false),
    ];
    let counters = Counters::default();
    let mut examiner = Examiner::new(ScriptSource::with_counters(stream, counters.clone())).unwrap();

    for position in examiner.positions().to_vec() {
        examiner.entry_at_position(position).unwrap();
    }
    assert_eq!(counters.seeks.get(), 1);
}

#[test]
fn test_lookup_by_index()
{
    let mut examiner = Examiner::new(ScriptSource::new(well_formed_stream())).unwrap();
    let entry = examiner.entry_at_index(1).unwrap();
    assert_eq!(entry.position.value(), 0x10);
    assert_eq!(entry.name(), Some("int"));

    let err = examiner.entry_at_index(99).unwrap_err();
    assert!(matches!(err, CheckError::IndexOutOfRange(99)));
}

#[test]
fn test_probe_failure_resets_cursor_and_recovers()
{
    let counters = Counters::default();
    let source = ScriptSource::with_counters(well_formed_stream(), counters.clone());
    let mut examiner = Examiner::new(source).unwrap();

    // Prime the cache, then poison the next read.
    examiner.entry_at_position(Position::new(0x0b)).unwrap();
    counters.fail_next_read.set(true);

    let err = examiner.entry_at_position(Position::new(0x30)).unwrap_err();
    assert!(matches!(err, CheckError::Read { .. }));

    // The failed probe invalidated the cache and rewound the cursor; the
    // same lookup must succeed afterwards.
    let entry = examiner.entry_at_position(Position::new(0x30)).unwrap();
    assert_eq!(entry.name(), Some("pair"));
}

fn two_unit_stream() -> Vec<Entry>
{
    vec![
        named(die(0x10, EntryKind::CompileUnit, true), "a.c"),
        die(0x20, EntryKind::Subprogram, false),
        end(0x28),
        named(die(0x40, EntryKind::CompileUnit, true), "b.c"),
        die(0x50, EntryKind::Subprogram, false),
        end(0x58),
    ]
}

#[test]
fn test_skip_children_walks_top_level()
{
    let mut examiner = Examiner::new(ScriptSource::new(two_unit_stream())).unwrap();

    let first = examiner.entry_at_position(Position::new(0x10)).unwrap();
    assert_eq!(first.name(), Some("a.c"));

    // Skipping the first unit's subtree lands on the second unit.
    let next = examiner.skip_children().unwrap();
    assert_eq!(next, Some(2));
    let second = examiner.entry_at_index(2).unwrap();
    assert_eq!(second.name(), Some("b.c"));

    // Skipping the last unit's subtree hits end of stream.
    assert_eq!(examiner.skip_children().unwrap(), None);
}

#[test]
fn test_skip_children_from_childless_entry()
{
    let mut examiner = Examiner::new(ScriptSource::new(two_unit_stream())).unwrap();

    // Current entry owns no children: the skip is a no-op and the walk
    // swallows the enclosing terminator to land on the next unit.
    examiner.entry_at_position(Position::new(0x20)).unwrap();
    let next = examiner.skip_children().unwrap();
    assert_eq!(next, Some(2));
}

#[test]
fn test_skip_children_requires_current_entry()
{
    let mut examiner = Examiner::new(ScriptSource::new(two_unit_stream())).unwrap();
    let err = examiner.skip_children().unwrap_err();
    assert!(matches!(err, CheckError::InvalidState(_)));
}

#[test]
fn test_skip_children_detects_unknown_landing()
{
    // After the graph is built, the source starts reporting a record at a
    // position the graph never registered.
    let mut source = ScriptSource::new(two_unit_stream());
    source.post_build_swap = Some((3, die(0x44, EntryKind::CompileUnit, true)));
    let mut examiner = Examiner::new(source).unwrap();

    examiner.entry_at_position(Position::new(0x10)).unwrap();
    let err = examiner.skip_children().unwrap_err();
    assert!(
        matches!(err, CheckError::CorruptNavigation { from, landed }
            if from.value() == 0x10 && landed.value() == 0x44)
    );
}

#[test]
fn test_children_and_parent_navigation()
{
    let mut examiner = Examiner::new(ScriptSource::new(well_formed_stream())).unwrap();

    let kids = examiner.children_of(0).unwrap();
    let names: Vec<Option<&str>> = kids.iter().map(Entry::name).collect();
    assert_eq!(names, vec![Some("int"), Some("main"), Some("pair")]);

    let parent = examiner.parent_of(3).unwrap().unwrap();
    assert_eq!(parent.name(), Some("main"));
    assert!(examiner.parent_of(0).unwrap().is_none());
}

#[test]
fn test_render_entry_includes_parent_context()
{
    let mut examiner = Examiner::new(ScriptSource::new(well_formed_stream())).unwrap();
    let dump = examiner.render_entry(3, false, true).unwrap();

    assert!(dump.contains("0x20: InlinedSubroutine"));
    assert!(dump.contains("at=DW_AT_abstract_origin val=0x18"));
    assert!(dump.contains("Parent:"));
    assert!(dump.contains("0x18: Subprogram"));
}

#[test]
fn test_validate_well_formed_stream()
{
    let mut examiner = Examiner::new(ScriptSource::new(well_formed_stream())).unwrap();
    let stats = examiner.validate().unwrap();
    assert_eq!(stats.entries_visited, 5);
    assert_eq!(stats.refs_checked, 1);
}

#[test]
fn test_validate_reports_first_unresolved_reference()
{
    // Subprogram at 0x20 claims to derive from 0x30, but nothing lives
    // there.
    let stream = vec![
        die(0x10, EntryKind::CompileUnit, true),
        derived(die(0x20, EntryKind::Subprogram, false), 0x30),
        end(0x28),
    ];
    let mut examiner = Examiner::new(ScriptSource::new(stream)).unwrap();
    assert_eq!(examiner.len(), 2);

    let err = examiner.validate().unwrap_err();
    assert!(
        matches!(err, CheckError::UnresolvedReference { index, position, target }
            if index == 1 && position.value() == 0x20 && target.value() == 0x30)
    );
}

#[test]
fn test_validate_resolves_reference_to_later_entry()
{
    // Same stream, but the target entry exists before the unit closes.
    let stream = vec![
        die(0x10, EntryKind::CompileUnit, true),
        derived(die(0x20, EntryKind::Subprogram, false), 0x30),
        die(0x30, EntryKind::Subprogram, false),
        end(0x38),
    ];
    let mut examiner = Examiner::new(ScriptSource::new(stream)).unwrap();
    assert_eq!(examiner.len(), 3);

    let stats = examiner.validate().unwrap();
    assert_eq!(stats.refs_checked, 1);
    let target = examiner.entry_at_position(Position::new(0x30)).unwrap();
    assert_eq!(target.kind, EntryKind::Subprogram);
}

#[test]
fn test_validate_counts_every_reference()
{
    let stream = vec![
        die(0x10, EntryKind::CompileUnit, true),
        die(0x18, EntryKind::Subprogram, false),
        derived(die(0x20, EntryKind::InlinedSubroutine, false), 0x18),
        derived(die(0x28, EntryKind::InlinedSubroutine, false), 0x18),
        end(0x30),
    ];
    let mut examiner = Examiner::new(ScriptSource::new(stream)).unwrap();
    let stats = examiner.validate().unwrap();
    assert_eq!(stats.entries_visited, 4);
    assert_eq!(stats.refs_checked, 2);
}

#[test]
fn test_collect_type_names_sorted_and_deduplicated()
{
    let stream = vec![
        die(0x10, EntryKind::CompileUnit, true),
        named(die(0x18, EntryKind::BaseType, false), "int"),
        named(die(0x20, EntryKind::Typedef, false), "size_t"),
        named(die(0x28, EntryKind::StructType, false), "pair"),
        // Same name declared again in another shape
        named(die(0x30, EntryKind::PointerType, false), "int"),
        // Subprograms are not type-describing
        named(die(0x38, EntryKind::Subprogram, false), "main"),
        // Anonymous types contribute nothing
        die(0x40, EntryKind::StructType, false),
        end(0x48),
    ];
    let mut examiner = Examiner::new(ScriptSource::new(stream)).unwrap();
    let names = examiner.collect_type_names().unwrap();
    assert_eq!(names, vec!["int".to_string(), "pair".to_string(), "size_t".to_string()]);
}

#[test]
fn test_empty_stream_builds_empty_graph()
{
    let mut examiner = Examiner::new(ScriptSource::new(Vec::new())).unwrap();
    assert!(examiner.is_empty());
    let stats = examiner.validate().unwrap();
    assert_eq!(stats.entries_visited, 0);
    assert_eq!(stats.refs_checked, 0);
}
