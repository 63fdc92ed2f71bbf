//! Composed checks over the entry graph: reference validation and type-name
//! collection.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::error::{CheckError, Result};
use crate::examiner::Examiner;
use crate::source::EntrySource;

/// Counters reported by a successful validation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats
{
    /// DIEs visited in document order
    pub entries_visited: usize,
    /// Derived-from references resolved
    pub refs_checked: usize,
}

impl<S: EntrySource> Examiner<S>
{
    /// Verify that every derived-from reference resolves to a registered DIE
    ///
    /// Walks the graph in document order and fails fast on the first
    /// unresolved reference. A lookup error while resolving a target is
    /// reported the same way as an unknown target: both mean the reference
    /// cannot be trusted. Whether the target is semantically the right kind
    /// of DIE is not checked.
    pub fn validate(&mut self) -> Result<ValidationStats>
    {
        let offsets = self.positions().to_vec();
        let mut stats = ValidationStats::default();

        for (index, position) in offsets.into_iter().enumerate() {
            trace!("examining DIE at offset {position}");
            let entry = self.entry_at_position(position)?;
            stats.entries_visited += 1;

            let Some(target) = entry.derived_from() else {
                continue;
            };
            stats.refs_checked += 1;

            if let Err(err) = self.entry_at_position(target) {
                debug!("derived-from resolution failed: {err}");
                return Err(CheckError::UnresolvedReference { index, position, target });
            }
        }

        debug!(
            "read {} DIEs, processed {} abstract origin refs",
            stats.entries_visited, stats.refs_checked
        );
        Ok(stats)
    }

    /// Collect the names of all type-describing DIEs, sorted and deduplicated
    pub fn collect_type_names(&mut self) -> Result<Vec<String>>
    {
        let offsets = self.positions().to_vec();
        let mut names = BTreeSet::new();

        for position in offsets {
            let entry = self.entry_at_position(position)?;
            if !entry.kind.is_type_describing() {
                continue;
            }
            if let Some(name) = entry.name() {
                names.insert(name.to_string());
            }
        }

        Ok(names.into_iter().collect())
    }
}
