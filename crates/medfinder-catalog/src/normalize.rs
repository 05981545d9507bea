//! Normalization from the data source's wire shape to [`FacilityRecord`].

use medfinder_core::{Coordinate, FacilityCategory, FacilityRecord};

use crate::error::CatalogError;
use crate::types::AmenityDto;

/// Name shown for amenities the source has no name for.
const UNKNOWN_NAME: &str = "Unknown";

/// Normalizes one [`AmenityDto`] into a [`FacilityRecord`].
///
/// # Errors
///
/// Returns [`CatalogError::Normalization`] if the amenity type is not a known
/// facility category, or the location is missing or out of range.
pub fn normalize_amenity(dto: AmenityDto) -> Result<FacilityRecord, CatalogError> {
    let amenity_id = dto.id.to_string();
    let fail = |reason: String| CatalogError::Normalization {
        amenity_id: amenity_id.clone(),
        reason,
    };

    let category = dto
        .medical_type
        .parse::<FacilityCategory>()
        .map_err(|e| fail(e.to_string()))?;

    let (latitude, longitude) = match dto.location {
        Some(loc) => match (loc.lat, loc.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(fail("location is missing lat or lon".to_string())),
        },
        None => return Err(fail("location is missing".to_string())),
    };
    let location = Coordinate::new(latitude, longitude).map_err(|e| fail(e.to_string()))?;

    // Treat empty strings from the source as absent.
    let name = dto
        .name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());
    let special_tag = dto.special_tag.filter(|s| !s.trim().is_empty());

    Ok(FacilityRecord {
        id: amenity_id,
        name,
        category,
        opening_hours_text: dto.opening_hours.unwrap_or_default(),
        is_open_now: dto.is_open.unwrap_or(false),
        address: dto.address.unwrap_or_default(),
        special_tag,
        location,
    })
}
