//! The entry-graph examiner.
//!
//! [`Examiner::new`] consumes an [`EntrySource`] exactly once, end to end,
//! and turns the flat pre-order stream into an addressable graph: a dense
//! document-order position list, a position→index map, and parent/child
//! adjacency. After construction the graph is immutable; the only mutable
//! state is the advisory single-slot entry cache, so one examiner instance
//! must not be shared across threads.

use std::collections::HashMap;
use std::fmt::Write as _;

use smallvec::SmallVec;
use tracing::debug;

use crate::entry::{Entry, Position};
use crate::error::{CheckError, Result};
use crate::source::EntrySource;

#[derive(Debug)]
pub struct Examiner<S: EntrySource>
{
    source: S,
    /// Last entry produced by the source cursor. Advisory: correctness never
    /// depends on it, lookup cost does.
    current: Option<Entry>,
    /// Document-order position list; index = pre-order rank
    positions: Vec<Position>,
    index_by_position: HashMap<Position, usize>,
    children: HashMap<usize, Vec<usize>>,
    parent: HashMap<usize, usize>,
}

impl<S: EntrySource> Examiner<S>
{
    /// Build the graph from a single exhaustive pass over the source
    ///
    /// Construction is all-or-nothing: any structural defect in the stream
    /// (stray terminator, duplicate position, open entry at end of stream)
    /// or source read error fails the whole build.
    pub fn new(mut source: S) -> Result<Self>
    {
        let mut positions: Vec<Position> = Vec::new();
        let mut index_by_position: HashMap<Position, usize> = HashMap::new();
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut nesting: SmallVec<[usize; 16]> = SmallVec::new();
        let mut last = Position::START;

        while let Some(entry) = source.next()? {
            if entry.is_terminator() {
                if nesting.pop().is_none() {
                    return Err(CheckError::MalformedStream { position: last });
                }
                continue;
            }

            if index_by_position.contains_key(&entry.position) {
                return Err(CheckError::DuplicatePosition {
                    position: entry.position,
                });
            }
            let index = positions.len();
            index_by_position.insert(entry.position, index);
            last = entry.position;
            positions.push(entry.position);

            if let Some(&top) = nesting.last() {
                children.entry(top).or_default().push(index);
                parent.insert(index, top);
            }
            if entry.has_children {
                nesting.push(index);
            }
        }

        if !nesting.is_empty() {
            return Err(CheckError::UnterminatedEntry { last });
        }

        debug!(dies = positions.len(), "indexed debug-info entry graph");
        Ok(Self {
            source,
            current: None,
            positions,
            index_by_position,
            children,
            parent,
        })
    }

    /// All registered positions in document order
    pub fn positions(&self) -> &[Position]
    {
        &self.positions
    }

    pub fn len(&self) -> usize
    {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.positions.is_empty()
    }

    /// Document-order rank of a position, if registered
    pub fn index_of(&self, position: Position) -> Option<usize>
    {
        self.index_by_position.get(&position).copied()
    }

    pub fn parent_index(&self, index: usize) -> Option<usize>
    {
        self.parent.get(&index).copied()
    }

    pub fn child_indices(&self, index: usize) -> &[usize]
    {
        self.children.get(&index).map_or(&[], Vec::as_slice)
    }

    pub fn entry_at_index(&mut self, index: usize) -> Result<Entry>
    {
        let position = *self.positions.get(index).ok_or(CheckError::IndexOutOfRange(index))?;
        self.entry_at_position(position)
    }

    /// Load the entry at `position`, re-reading from the source if needed
    ///
    /// Unknown positions fail without touching the source. Otherwise: cache
    /// hit, then a single forward probe (the cursor usually sits just before
    /// the wanted entry during document-order walks), then seek-and-read.
    pub fn entry_at_position(&mut self, position: Position) -> Result<Entry>
    {
        if !self.index_by_position.contains_key(&position) {
            return Err(CheckError::UnknownPosition { position });
        }

        if let Some(current) = &self.current {
            if current.position == position {
                return Ok(current.clone());
            }

            // Read the next record; maybe that is the one.
            match self.source.next() {
                Ok(Some(entry)) => {
                    if entry.position == position {
                        self.current = Some(entry.clone());
                        return Ok(entry);
                    }
                    self.current = Some(entry);
                }
                Ok(None) => {
                    self.current = None;
                }
                Err(err) => {
                    // Put the cursor back in a known state before giving up.
                    self.current = None;
                    let _ = self.source.seek(Position::START);
                    return Err(err);
                }
            }
        }

        // Fall back to seek
        if let Err(err) = self.source.seek(position) {
            self.current = None;
            return Err(err);
        }
        match self.source.next() {
            Ok(Some(entry)) => {
                self.current = Some(entry.clone());
                Ok(entry)
            }
            Ok(None) => {
                self.current = None;
                Err(CheckError::UnexpectedEnd { position })
            }
            Err(err) => {
                self.current = None;
                let _ = self.source.seek(position);
                Err(err)
            }
        }
    }

    /// Skip the current entry's subtree, landing on the next registered
    /// entry
    ///
    /// Returns the index of that entry, or `None` at end of stream.
    /// Terminators closing enclosing contexts are swallowed; any other
    /// unregistered record means the stream and the graph disagree.
    pub fn skip_children(&mut self) -> Result<Option<usize>>
    {
        let from = match &self.current {
            Some(entry) => entry.position,
            None => return Err(CheckError::InvalidState("skip_children called with no current entry")),
        };

        self.source.skip_subtree()?;
        loop {
            let Some(next) = self.source.next()? else {
                return Ok(None);
            };
            if let Some(&index) = self.index_by_position.get(&next.position) {
                self.current = Some(next);
                return Ok(Some(index));
            }
            // End of an enclosing child list; keep reading.
            if next.is_terminator() {
                continue;
            }
            return Err(CheckError::CorruptNavigation {
                from,
                landed: next.position,
            });
        }
    }

    /// Load every direct child of the entry at `index`
    pub fn children_of(&mut self, index: usize) -> Result<Vec<Entry>>
    {
        let kids = self.children.get(&index).cloned().unwrap_or_default();
        let mut entries = Vec::with_capacity(kids.len());
        for kid in kids {
            entries.push(self.entry_at_index(kid)?);
        }
        Ok(entries)
    }

    /// Load the parent of the entry at `index`; `None` for top-level entries
    pub fn parent_of(&mut self, index: usize) -> Result<Option<Entry>>
    {
        let Some(&parent) = self.parent.get(&index) else {
            return Ok(None);
        };
        self.entry_at_index(parent).map(Some)
    }

    /// Structural dump of an entry for triage output
    ///
    /// One `position: kind` line plus one `at=... val=...` line per
    /// attribute; children indented two levels below; the parent (one level
    /// up only) appended after a `Parent:` header.
    pub fn render_entry(&mut self, index: usize, with_children: bool, with_parent: bool) -> Result<String>
    {
        let mut out = String::new();
        self.render_into(&mut out, index, with_children, 0)?;
        if with_parent {
            if let Some(parent) = self.parent.get(&index).copied() {
                out.push_str("\nParent:\n");
                self.render_into(&mut out, parent, false, 0)?;
            }
        }
        Ok(out)
    }

    fn render_into(&mut self, out: &mut String, index: usize, with_children: bool, level: usize) -> Result<()>
    {
        let entry = self.entry_at_index(index)?;
        let pad = "  ".repeat(level);
        let _ = writeln!(out, "{pad}{}: {}", entry.position, entry.kind);
        for attr in &entry.attrs {
            let _ = writeln!(out, "{pad}at={} val={}", attr.kind, attr.value);
        }
        if with_children {
            let kids = self.children.get(&index).cloned().unwrap_or_default();
            for kid in kids {
                self.render_into(out, kid, true, level + 2)?;
            }
        }
        Ok(())
    }
}
