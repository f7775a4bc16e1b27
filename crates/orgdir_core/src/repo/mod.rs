//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the read-only fetch capabilities the query engine consumes.
//! - Isolate SQLite query details from query orchestration.
//!
//! # Invariants
//! - Repository reads never mutate directory data.
//! - Fetches return natural retrieval order (ascending id).
//! - Absence is reported as `None` or an empty `Vec`; the "empty result is an
//!   error" policy belongs to the query engine, not to the store.

pub mod directory_repo;
