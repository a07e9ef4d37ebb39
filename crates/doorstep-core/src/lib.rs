mod address;
mod app_config;
mod config;
mod geo;

use thiserror::Error;

pub use address::{
    AddressComponents, AddressId, AddressKind, DraftAddress, DraftField, GeocodeResult,
    ResolvedAddress, SavedAddress,
};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{Coordinate, LocationSelectionState, MapView, PermissionStatus};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors from parsing domain values supplied as text (CLI flags, env vars).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid coordinate \"{0}\": expected \"<lat>,<lng>\"")]
    Coordinate(String),

    #[error("invalid address kind \"{0}\": expected home, office or other")]
    AddressKind(String),

    #[error("invalid address id \"{0}\"")]
    AddressId(String),
}
