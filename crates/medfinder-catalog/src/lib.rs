//! Remote amenity catalog: fetches facility records from an HTTP data source
//! and normalizes them for ranking.

pub mod client;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod types;

pub use client::{AmenityQuery, CatalogClient};
pub use error::CatalogError;
pub use normalize::normalize_amenity;
pub use types::{AmenityDto, AmenityId, LocationDto};
