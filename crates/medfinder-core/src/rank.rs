//! Distance ranking pipeline.
//!
//! Takes a reference coordinate, a slice of facility records and a
//! [`FilterSpec`], and returns the matching facilities ordered nearest-first.
//! Everything here is synchronous and pure: inputs are borrowed, never
//! mutated, and nothing is cached between calls.

use crate::{Coordinate, CoreError, FacilityRecord, FilterSpec, RankedFacility};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two coordinates (unrounded).
#[must_use]
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Haversine distance rounded to one decimal place, half away from zero.
#[must_use]
pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
    round_tenth(haversine_km(from, to))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Ranks `facilities` by distance from `reference` after applying `filter`.
///
/// Filters are applied in order: search text (case-insensitive substring of
/// name or address), category membership, then inclusive maximum distance.
/// The sort is stable, so facilities at the same rounded distance keep their
/// input order.
///
/// # Errors
///
/// Returns [`CoreError::InvalidCoordinate`] if the reference or any facility
/// location is out of range. An empty `facilities` slice is not an error.
pub fn rank_facilities(
    reference: Coordinate,
    facilities: &[FacilityRecord],
    filter: &FilterSpec,
) -> Result<Vec<RankedFacility>, CoreError> {
    reference.validate()?;

    let needle = filter.search_text.to_lowercase();
    let mut ranked = Vec::with_capacity(facilities.len());

    for facility in facilities {
        facility.location.validate()?;
        let distance = distance_km(reference, facility.location);

        if !matches_text(facility, &needle) {
            continue;
        }
        if !filter.categories.is_empty() && !filter.categories.contains(&facility.category) {
            continue;
        }
        if filter.max_distance_km.is_some_and(|max| distance > max) {
            continue;
        }

        ranked.push(RankedFacility {
            facility: facility.clone(),
            distance_km: distance,
        });
    }

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    tracing::debug!(
        reference = %reference,
        candidates = facilities.len(),
        matched = ranked.len(),
        "ranked facilities"
    );
    Ok(ranked)
}

fn matches_text(facility: &FacilityRecord, needle: &str) -> bool {
    needle.is_empty()
        || facility.name.to_lowercase().contains(needle)
        || facility.address.to_lowercase().contains(needle)
}

#[cfg(test)]
#[path = "rank_test.rs"]
mod tests;
