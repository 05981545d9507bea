//! Value types shared by the ranking pipeline and the location provider.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A point on the Earth's surface in decimal degrees.
///
/// Fields are public so records can be deserialized as-is; range checks happen
/// in [`Coordinate::new`] and [`Coordinate::validate`], which the ranking
/// pipeline calls before using any coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat", alias = "latitude")]
    pub latitude: f64,
    #[serde(rename = "lon", alias = "longitude", alias = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    /// Antwerp city center, the fallback location used when no real position
    /// can be acquired.
    pub const ANTWERP_CENTER: Self = Self {
        latitude: 51.2194,
        longitude: 4.4025,
    };

    /// Builds a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] if either component is not
    /// finite or falls outside `[-90, 90]` / `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Checks the coordinate against the valid latitude/longitude ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] describing the first violation.
    pub fn validate(&self) -> Result<(), CoreError> {
        let reason = if !self.latitude.is_finite() || !self.longitude.is_finite() {
            Some("components must be finite")
        } else if !(-90.0..=90.0).contains(&self.latitude) {
            Some("latitude must be within [-90, 90]")
        } else if !(-180.0..=180.0).contains(&self.longitude) {
            Some("longitude must be within [-180, 180]")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CoreError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Kind of medical amenity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCategory {
    BabyHatch,
    Clinic,
    Dentist,
    Doctors,
    Hospital,
    NursingHome,
    Pharmacy,
    Veterinary,
}

impl FacilityCategory {
    pub const ALL: [Self; 8] = [
        Self::BabyHatch,
        Self::Clinic,
        Self::Dentist,
        Self::Doctors,
        Self::Hospital,
        Self::NursingHome,
        Self::Pharmacy,
        Self::Veterinary,
    ];

    /// Wire name, as used in catalog files and the data source's `amenity_type`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BabyHatch => "baby_hatch",
            Self::Clinic => "clinic",
            Self::Dentist => "dentist",
            Self::Doctors => "doctors",
            Self::Hospital => "hospital",
            Self::NursingHome => "nursing_home",
            Self::Pharmacy => "pharmacy",
            Self::Veterinary => "veterinary",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::BabyHatch => "Baby Hatch",
            Self::Clinic => "Clinic",
            Self::Dentist => "Dentist",
            Self::Doctors => "Doctor",
            Self::Hospital => "Hospital",
            Self::NursingHome => "Nursing Home",
            Self::Pharmacy => "Pharmacy",
            Self::Veterinary => "Veterinary",
        }
    }
}

impl std::fmt::Display for FacilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacilityCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| CoreError::InvalidCategory(s.to_string()))
    }
}

/// One catalog entry describing a medical amenity at a fixed location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    pub name: String,
    pub category: FacilityCategory,
    pub opening_hours_text: String,
    pub is_open_now: bool,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_tag: Option<String>,
    pub location: Coordinate,
}

/// A facility paired with its rounded distance from a reference coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFacility {
    #[serde(flatten)]
    pub facility: FacilityRecord,
    /// Great-circle distance in kilometres, rounded to one decimal place.
    pub distance_km: f64,
}

impl RankedFacility {
    #[must_use]
    pub fn distance_label(&self) -> String {
        format!("{} km", self.distance_km)
    }
}
