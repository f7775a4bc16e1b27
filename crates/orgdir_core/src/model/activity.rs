//! Activity domain model.
//!
//! Activities form a forest through `parent_id`. Names are unique across the
//! whole forest, so a name identifies exactly one node.

use serde::{Deserialize, Serialize};

/// Stable activity identifier.
pub type ActivityId = i64;

/// Number of generations below a root that directory queries resolve.
///
/// A root plus two further generations gives three levels in total.
pub const ACTIVITY_TREE_MAX_DEPTH: u32 = 2;

/// Category node in the activity forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    /// `None` for a root activity.
    pub parent_id: Option<ActivityId>,
}
