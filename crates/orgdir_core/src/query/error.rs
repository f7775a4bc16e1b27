//! Query engine error kinds.

use crate::model::activity::ActivityId;
use crate::model::building::BuildingId;
use crate::model::organization::OrganizationId;
use crate::repo::directory_repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by query engine operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// What a `NotFound` refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundTarget {
    /// No activity has this exact name.
    ActivityName(String),
    /// No organization has this id.
    Organization(OrganizationId),
    /// The store holds no buildings.
    Buildings,
    /// No organization is located in this building.
    OrganizationsInBuilding(BuildingId),
    /// No organization is tagged with this activity.
    OrganizationsWithActivity(ActivityId),
    /// No organization is tagged with any activity of this tree.
    OrganizationsInActivityTree(String),
    /// No organization lies within the search radius.
    OrganizationsInRadius,
    /// No organization name contains the fragment.
    OrganizationsByName(String),
}

impl Display for NotFoundTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActivityName(_) => write!(f, "activity not found"),
            Self::Organization(id) => write!(f, "organization not found: {id}"),
            Self::Buildings => write!(f, "no buildings found"),
            Self::OrganizationsInBuilding(id) => {
                write!(f, "no organizations found for building {id}")
            }
            Self::OrganizationsWithActivity(id) => {
                write!(f, "no organizations found for activity {id}")
            }
            Self::OrganizationsInActivityTree(_) => {
                write!(f, "no organizations found for this activity tree")
            }
            Self::OrganizationsInRadius => {
                write!(f, "no organizations found in the specified radius")
            }
            Self::OrganizationsByName(_) => write!(f, "no organizations found with this name"),
        }
    }
}

/// Errors from query engine operations.
///
/// `NotFound` and `Validation` are domain outcomes; `Store` carries an opaque
/// infrastructure failure.
#[derive(Debug)]
pub enum QueryError {
    /// Lookup target absent or final result set empty.
    NotFound(NotFoundTarget),
    /// Request parameters rejected before touching the store.
    Validation(String),
    /// Store-level failure, propagated unchanged.
    Store(StoreError),
}

impl QueryError {
    /// HTTP status a routing layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 422,
            Self::Store(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(target) => write!(f, "{target}"),
            Self::Validation(message) => write!(f, "invalid query: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<crate::db::DbError> for QueryError {
    fn from(value: crate::db::DbError) -> Self {
        Self::Store(StoreError::Db(value))
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::from(value))
    }
}
