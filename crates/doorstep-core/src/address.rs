use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Coordinate, ParseError};

/// Sparse postal components flattened from a provider's reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub sublocality: Option<String>,
    pub locality: Option<String>,
}

impl AddressComponents {
    /// `sublocality` and `locality` joined with `", "`, skipping absent or
    /// empty parts.
    #[must_use]
    pub fn area(&self) -> String {
        [self.sublocality.as_deref(), self.locality.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Output of a reverse lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub formatted_address: String,
    pub components: AddressComponents,
}

/// Output of a forward lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
}

impl GeocodeResult {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    #[default]
    Home,
    Office,
    Other,
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressKind::Home => write!(f, "home"),
            AddressKind::Office => write!(f, "office"),
            AddressKind::Other => write!(f, "other"),
        }
    }
}

impl FromStr for AddressKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(AddressKind::Home),
            "office" => Ok(AddressKind::Office),
            "other" => Ok(AddressKind::Other),
            _ => Err(ParseError::AddressKind(s.to_string())),
        }
    }
}

/// One of the three free-text fields of a [`DraftAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    HouseNumber,
    Street,
    Area,
}

/// In-progress address form state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftAddress {
    pub kind: AddressKind,
    pub house_number: String,
    pub street: String,
    pub area: String,
}

impl DraftAddress {
    pub fn set(&mut self, field: DraftField, value: String) {
        match field {
            DraftField::HouseNumber => self.house_number = value,
            DraftField::Street => self.street = value,
            DraftField::Area => self.area = value,
        }
    }

    #[must_use]
    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::HouseNumber => &self.house_number,
            DraftField::Street => &self.street,
            DraftField::Area => &self.area,
        }
    }

    /// Overwrites the text fields from reverse-lookup components. Missing
    /// components clear the corresponding field. The address kind is kept.
    pub fn apply_components(&mut self, components: &AddressComponents) {
        self.house_number = components.street_number.clone().unwrap_or_default();
        self.street = components.route.clone().unwrap_or_default();
        self.area = components.area();
    }

    /// Text sent to forward geocoding: non-empty fields joined with a space.
    #[must_use]
    pub fn query_text(&self) -> String {
        self.join_parts(" ")
    }

    /// Display form stored on a saved address: non-empty fields joined with `", "`.
    #[must_use]
    pub fn full_address(&self) -> String {
        self.join_parts(", ")
    }

    fn join_parts(&self, separator: &str) -> String {
        [&self.house_number, &self.street, &self.area]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Identifier of a saved address: unix milliseconds at creation, bumped when
/// needed so that ids within one collection are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressId(pub u64);

impl std::fmt::Display for AddressId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AddressId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(AddressId)
            .map_err(|_| ParseError::AddressId(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    pub kind: AddressKind,
    pub house_number: String,
    pub street: String,
    pub area: String,
    pub latitude: f64,
    pub longitude: f64,
    pub full_address: String,
    pub created_at: DateTime<Utc>,
}

impl SavedAddress {
    /// Builds a saved record from a finished draft and the selected point.
    #[must_use]
    pub fn from_draft(
        id: AddressId,
        draft: &DraftAddress,
        location: Coordinate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: draft.kind,
            house_number: draft.house_number.clone(),
            street: draft.street.clone(),
            area: draft.area.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            full_address: draft.full_address(),
            created_at,
        }
    }

    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
