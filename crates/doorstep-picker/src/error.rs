use doorstep_core::AddressId;
use thiserror::Error;

/// Failures of a one-shot device position query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("timed out waiting for a position fix")]
    Timeout,

    /// The platform cannot answer this query at all (e.g. no permission
    /// introspection).
    #[error("geolocation not supported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum PickerError {
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    /// Submit was attempted without a selected location.
    #[error("no location selected")]
    NoSelectedLocation,

    #[error("no address form is open")]
    NoOpenForm,

    #[error("saved address {0} not found")]
    AddressNotFound(AddressId),

    #[error("invalid coordinate {latitude},{longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("picker did not settle within {0:?}")]
    SettleTimeout(std::time::Duration),

    /// The picker task has shut down.
    #[error("picker is closed")]
    Closed,
}
