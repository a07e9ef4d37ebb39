//! Location state: the last device fix, the user's selected point, and the
//! platform permission status.

use std::sync::Arc;

use doorstep_core::{Coordinate, LocationSelectionState, MapView, PermissionStatus};

use crate::error::GeolocationError;
use crate::position::PositionSource;

pub struct LocationController<P> {
    source: Arc<P>,
    state: LocationSelectionState,
}

impl<P: PositionSource> LocationController<P> {
    pub fn new(source: Arc<P>) -> Self {
        Self {
            source,
            state: LocationSelectionState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &LocationSelectionState {
        &self.state
    }

    #[must_use]
    pub fn selected(&self) -> Option<Coordinate> {
        self.state.selected_location
    }

    /// Shared handle to the position source, for queries run off the
    /// owning task.
    #[must_use]
    pub fn source(&self) -> Arc<P> {
        Arc::clone(&self.source)
    }

    /// Requests a one-shot device position and, on success, makes it both the
    /// current and the selected location.
    ///
    /// For callers that own the controller directly. The picker task runs
    /// the query off-task and feeds the outcome to [`Self::apply_position`].
    ///
    /// # Errors
    ///
    /// Returns the platform's [`GeolocationError`]; state is left unchanged
    /// apart from recording a denied permission.
    pub async fn refresh_from_device(&mut self) -> Result<Coordinate, GeolocationError> {
        let result = self.source.current_position().await;
        self.apply_position(result)
    }

    /// Applies the outcome of a device position query.
    ///
    /// # Errors
    ///
    /// Passes the query's error through unchanged.
    pub fn apply_position(
        &mut self,
        result: Result<Coordinate, GeolocationError>,
    ) -> Result<Coordinate, GeolocationError> {
        match result {
            Ok(coordinate) => {
                self.state.current_location = Some(coordinate);
                self.state.selected_location = Some(coordinate);
                // A fix implies access was granted, whatever we believed before.
                self.state.permission_status = PermissionStatus::Granted;
                tracing::debug!(%coordinate, "device position acquired");
                Ok(coordinate)
            }
            Err(err) => {
                if err == GeolocationError::PermissionDenied {
                    self.state.permission_status = PermissionStatus::Denied;
                }
                tracing::warn!(error = %err, "device position query failed");
                Err(err)
            }
        }
    }

    /// Overwrites the selected location. Never touches `current_location`.
    pub fn set_selection(&mut self, coordinate: Coordinate) {
        self.state.selected_location = Some(coordinate);
    }

    /// Reads the platform permission state and, if access is already granted,
    /// refreshes from the device. A failed refresh is logged, not returned.
    ///
    /// The picker task performs the same steps through
    /// [`Self::apply_permission`] and [`Self::apply_position`].
    pub async fn query_permission(&mut self) -> PermissionStatus {
        let result = self.source.permission_state().await;
        let status = self.apply_permission(result);
        if status == PermissionStatus::Granted {
            // Failure is already logged by apply_position.
            let _ = self.refresh_from_device().await;
        }
        status
    }

    /// Records a permission query outcome. When the platform cannot
    /// introspect, the previously known status is kept.
    pub fn apply_permission(
        &mut self,
        result: Result<PermissionStatus, GeolocationError>,
    ) -> PermissionStatus {
        match result {
            Ok(status) => self.state.permission_status = status,
            Err(err) => {
                tracing::debug!(error = %err, "permission state unavailable, keeping previous");
            }
        }
        self.state.permission_status
    }

    /// Map center and zoom: the selected location, or `fallback` when nothing
    /// is selected yet.
    #[must_use]
    pub fn map_view(&self, fallback: Coordinate, zoom: u8) -> MapView {
        MapView {
            center: self.state.selected_location.unwrap_or(fallback),
            zoom,
        }
    }
}
