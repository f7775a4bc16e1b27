//! Directory domain model.
//!
//! # Responsibility
//! - Define the read models shared by the store, the query engine and the
//!   seeding path.
//! - Validate field-level invariants before data is persisted.
//!
//! # Invariants
//! - Identifiers are SQLite rowids and never reused for another entity.
//! - Relations are expressed by identifier, never by embedded objects.

pub mod activity;
pub mod building;
pub mod organization;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field-level validation failure for directory entities.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValidationError {
    /// Latitude outside `[-90, 90]` or not finite.
    LatitudeOutOfRange(f64),
    /// Longitude outside `[-180, 180]` or not finite.
    LongitudeOutOfRange(f64),
    /// A required text field is blank after trim.
    BlankField(&'static str),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude {value} is outside [-90, 90]")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude {value} is outside [-180, 180]")
            }
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
        }
    }
}

impl Error for ModelValidationError {}
