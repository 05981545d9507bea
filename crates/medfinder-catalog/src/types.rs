//! Wire types for the external amenity data source.
//!
//! Field names follow the source's JSON (`medicalType`, `openingHours`, ...).
//! Everything except `id` and `medicalType` is optional on the wire; gaps are
//! resolved during normalization.

use serde::Deserialize;

/// Amenity identifiers arrive as strings from some deployments and as
/// integers from others.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AmenityId {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for AmenityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmenityId::Text(s) => f.write_str(s),
            AmenityId::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationDto {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityDto {
    pub id: AmenityId,
    pub name: Option<String>,
    pub medical_type: String,
    pub opening_hours: Option<String>,
    pub address: Option<String>,
    pub special_tag: Option<String>,
    pub is_open: Option<bool>,
    pub location: Option<LocationDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_source_shape_and_ignores_extra_fields() {
        let json = r#"{
            "id": "2",
            "name": "Central Pharmacy",
            "type": "medical",
            "medicalType": "pharmacy",
            "openingHours": "Open until 18:00",
            "address": "Meir 12, 2000 Antwerp",
            "isOpen": true,
            "distance": "0.2 km",
            "distanceValue": 0.2,
            "location": { "lat": 51.2204, "lon": 4.4051 }
        }"#;
        let dto: AmenityDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.id, AmenityId::Text("2".to_string()));
        assert_eq!(dto.medical_type, "pharmacy");
        assert_eq!(dto.is_open, Some(true));
        assert!(dto.special_tag.is_none());
    }

    #[test]
    fn numeric_id_is_accepted() {
        let dto: AmenityDto =
            serde_json::from_str(r#"{"id": 42, "medicalType": "clinic"}"#).unwrap();
        assert_eq!(dto.id.to_string(), "42");
        assert!(dto.location.is_none());
    }
}
