//! Building domain model.

use super::ModelValidationError;
use serde::{Deserialize, Serialize};

/// Stable building identifier.
pub type BuildingId = i64;

/// Physical location hosting one or more organizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub address: String,
    /// Degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl Building {
    /// Checks address and coordinate ranges.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_address(&self.address)?;
        validate_coordinates(self.latitude, self.longitude)
    }
}

fn validate_address(address: &str) -> Result<(), ModelValidationError> {
    if address.trim().is_empty() {
        return Err(ModelValidationError::BlankField("address"));
    }
    Ok(())
}

/// Rejects non-finite or out-of-range coordinates.
fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ModelValidationError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ModelValidationError::LatitudeOutOfRange(latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ModelValidationError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_coordinates, Building};
    use crate::model::ModelValidationError;

    #[test]
    fn validate_accepts_domain_edges() {
        validate_coordinates(90.0, -180.0).unwrap();
        validate_coordinates(-90.0, 180.0).unwrap();
    }

    #[test]
    fn validate_rejects_out_of_range_and_nan() {
        assert_eq!(
            validate_coordinates(90.5, 0.0),
            Err(ModelValidationError::LatitudeOutOfRange(90.5))
        );
        assert!(matches!(
            validate_coordinates(0.0, f64::NAN),
            Err(ModelValidationError::LongitudeOutOfRange(_))
        ));
    }

    #[test]
    fn validate_rejects_blank_address() {
        let building = Building {
            id: 1,
            address: "   ".to_string(),
            latitude: 0.0,
            longitude: 0.0,
        };
        assert_eq!(
            building.validate(),
            Err(ModelValidationError::BlankField("address"))
        );
    }
}
