use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, FacilityCategory};

/// Caller-chosen criteria for one ranking pass.
///
/// An empty `categories` set means "any category", and a missing
/// `max_distance_km` means "any distance".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub categories: BTreeSet<FacilityCategory>,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

impl FilterSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: FacilityCategory) -> Self {
        self.categories.insert(category);
        self
    }

    #[must_use]
    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = FacilityCategory>,
    ) -> Self {
        self.categories.extend(categories);
        self
    }

    #[must_use]
    pub fn with_max_distance_km(mut self, max_distance_km: Option<f64>) -> Self {
        self.max_distance_km = max_distance_km;
        self
    }

    #[must_use]
    pub fn with_distance_option(self, option: DistanceOption) -> Self {
        self.with_max_distance_km(option.max_distance_km())
    }

    /// True when no criterion restricts the result.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.search_text.is_empty() && self.categories.is_empty() && self.max_distance_km.is_none()
    }
}

/// Radius presets offered by the finder UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceOption {
    OneKm,
    ThreeKm,
    FiveKm,
    #[default]
    All,
}

impl DistanceOption {
    #[must_use]
    pub fn max_distance_km(self) -> Option<f64> {
        match self {
            Self::OneKm => Some(1.0),
            Self::ThreeKm => Some(3.0),
            Self::FiveKm => Some(5.0),
            Self::All => None,
        }
    }
}

impl std::fmt::Display for DistanceOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneKm => write!(f, "1km"),
            Self::ThreeKm => write!(f, "3km"),
            Self::FiveKm => write!(f, "5km"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for DistanceOption {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(' ', "").as_str() {
            "1km" | "1" => Ok(Self::OneKm),
            "3km" | "3" => Ok(Self::ThreeKm),
            "5km" | "5" => Ok(Self::FiveKm),
            "all" => Ok(Self::All),
            _ => Err(CoreError::InvalidDistanceOption(s.to_string())),
        }
    }
}
