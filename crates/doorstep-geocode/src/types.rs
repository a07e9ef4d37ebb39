//! Geocoding provider response types.
//!
//! Only the fields the lookups read are modelled: `results[].geometry.location`,
//! `results[].formatted_address` and `results[].address_components[]`.
//! Everything else in the body is ignored.

use serde::Deserialize;

/// Top-level envelope: `{ "results": [...], "status": "OK" }`.
///
/// `status` is kept for logging only; an empty `results` array is what
/// decides "no result".
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeCandidate>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A single match returned by the provider.
#[derive(Debug, Deserialize)]
pub struct GeocodeCandidate {
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One entry of `address_components`, e.g.
/// `{ "long_name": "Broadway", "short_name": "Broadway", "types": ["route"] }`.
#[derive(Debug, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    /// The primary type tag (`types[0]`), if any.
    #[must_use]
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }
}
