//! Bounded-depth activity subtree resolution.
//!
//! # Responsibility
//! - Map a root activity name to the ids of the root and its descendants.
//!
//! # Invariants
//! - Expansion is breadth-first over an explicit frontier with a depth counter.
//! - No id deeper than `max_depth` below the root is ever returned.
//! - Termination depends only on the depth bound, so a cyclic parent relation
//!   still finishes after at most `max_depth + 1` layers.

use crate::model::activity::ActivityId;
use crate::query::error::{NotFoundTarget, QueryError, QueryResult};
use crate::repo::directory_repo::DirectoryStore;
use log::debug;
use std::collections::{BTreeSet, VecDeque};

/// Resolves `root_name` into its own id plus descendant ids up to `max_depth`
/// generations below it.
///
/// # Errors
/// - `QueryError::NotFound(NotFoundTarget::ActivityName)` when no activity
///   has exactly that name.
/// - `QueryError::Store` for store failures.
pub fn resolve_subtree<S>(
    store: &S,
    root_name: &str,
    max_depth: u32,
) -> QueryResult<BTreeSet<ActivityId>>
where
    S: DirectoryStore + ?Sized,
{
    let root = store
        .fetch_activity_by_name(root_name)?
        .ok_or_else(|| QueryError::NotFound(NotFoundTarget::ActivityName(root_name.to_string())))?;

    let mut resolved = BTreeSet::new();
    let mut frontier = VecDeque::from([(root.id, 0_u32)]);
    let mut layers = 0_u32;

    while let Some((activity_id, depth)) = frontier.pop_front() {
        // First visit is at minimal depth.
        if !resolved.insert(activity_id) {
            continue;
        }
        layers = layers.max(depth + 1);
        if depth >= max_depth {
            continue;
        }

        for child in store.fetch_children(activity_id)? {
            frontier.push_back((child.id, depth + 1));
        }
    }

    debug!(
        "event=resolve_subtree module=query status=ok root_id={} max_depth={} layers={} count={}",
        root.id,
        max_depth,
        layers,
        resolved.len()
    );
    Ok(resolved)
}
