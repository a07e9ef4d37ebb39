//! Device geolocation boundary.
//!
//! The platform (browser, OS service, test script) implements
//! [`PositionSource`]; the picker only ever asks for a one-shot fix and the
//! current permission state.

use std::future::Future;

use doorstep_core::{Coordinate, PermissionStatus};

use crate::error::GeolocationError;

pub trait PositionSource: Send + Sync + 'static {
    /// One-shot position query. May suspend until the user answers a
    /// permission prompt.
    fn current_position(&self)
        -> impl Future<Output = Result<Coordinate, GeolocationError>> + Send;

    /// Reads the permission state without prompting. Platforms that cannot
    /// introspect return [`GeolocationError::Unsupported`].
    fn permission_state(
        &self,
    ) -> impl Future<Output = Result<PermissionStatus, GeolocationError>> + Send;
}

/// A device that has already granted access and always reports the same fix.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Ok(self.0)
    }

    async fn permission_state(&self) -> Result<PermissionStatus, GeolocationError> {
        Ok(PermissionStatus::Granted)
    }
}

/// A device whose user has refused location access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedPosition;

impl PositionSource for DeniedPosition {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Err(GeolocationError::PermissionDenied)
    }

    async fn permission_state(&self) -> Result<PermissionStatus, GeolocationError> {
        Ok(PermissionStatus::Denied)
    }
}
