//! Per-request read sessions over a directory database file.
//!
//! # Responsibility
//! - Open one read-only connection per request and hold a deferred read
//!   transaction so every fetch of the request sees one snapshot.
//! - Release both on every exit path.
//!
//! # Invariants
//! - Sessions share nothing; concurrent sessions are independent.
//! - The transaction is always rolled back; sessions never commit.

use crate::db::open_db_read_only;
use crate::query::error::QueryResult;
use crate::repo::directory_repo::SqliteDirectoryStore;
use crate::service::query_service::QueryService;
use log::warn;
use rusqlite::TransactionBehavior;
use std::path::{Path, PathBuf};

/// Query service type handed to session closures.
pub type SessionService<'conn> = QueryService<SqliteDirectoryStore<'conn>>;

/// Entry point that runs directory queries against a database file.
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    db_path: PathBuf,
}

impl DirectoryReader {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `query` inside a fresh read-only snapshot.
    ///
    /// The connection is closed when this returns, whether `query` succeeded,
    /// reported a domain error, or the session failed to open.
    pub fn session<T>(
        &self,
        query: impl FnOnce(&SessionService<'_>) -> QueryResult<T>,
    ) -> QueryResult<T> {
        let mut conn = open_db_read_only(&self.db_path)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let result = {
            let service = QueryService::new(SqliteDirectoryStore::try_new(&tx)?);
            query(&service)
        };

        if let Err(err) = tx.rollback() {
            warn!(
                "event=read_session module=service status=error error_code=rollback_failed error={}",
                err
            );
            if result.is_ok() {
                return Err(err.into());
            }
        }
        result
    }
}
