pub mod app_config;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod rank;
pub mod types;

pub use app_config::{AppConfig, Environment, UnresolvedPolicy};
pub use catalog::{load_catalog, parse_catalog, CatalogFile};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use filter::{DistanceOption, FilterSpec};
pub use rank::{distance_km, haversine_km, rank_facilities, EARTH_RADIUS_KM};
pub use types::{Coordinate, FacilityCategory, FacilityRecord, RankedFacility};
