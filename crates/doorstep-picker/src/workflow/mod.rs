//! Address resolution workflow.
//!
//! Keeps the selected coordinate and the address form's text in sync without
//! feedback loops:
//!
//! - coordinate -> text: every selection change while a form is open starts a
//!   reverse lookup; its result overwrites the draft as a *derived* write.
//!   Results for a coordinate that is no longer selected are dropped.
//! - text -> coordinate: a *user* edit whose query text is long enough
//!   (re)starts the debounce timer; when it elapses a forward lookup runs and
//!   its result moves the selection.
//!
//! Derived writes never schedule forward lookups, so a forward result settles
//! after exactly one reverse round trip.

mod actor;
mod form;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use doorstep_core::{
    AddressId, AddressKind, AppConfig, Coordinate, DraftField, PermissionStatus, SavedAddress,
};
use doorstep_geocode::GeocodeClient;
use tokio::sync::{mpsc, oneshot};

use self::actor::{Command, PickerActor};
use crate::error::PickerError;
use crate::position::PositionSource;

pub use self::snapshot::{FormSnapshot, PickerSnapshot, ResolutionPhase};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tunables for one picker instance.
#[derive(Debug, Clone, Copy)]
pub struct PickerOptions {
    pub debounce: Duration,
    pub min_query_chars: usize,
    pub map_zoom: u8,
    /// Map center shown before anything is selected.
    pub map_fallback_center: Coordinate,
}

impl PickerOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            min_query_chars: config.min_query_chars,
            map_zoom: config.map_default_zoom,
            map_fallback_center: config.map_default_center,
        }
    }
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            min_query_chars: 5,
            map_zoom: 15,
            map_fallback_center: Coordinate::new(0.0, 0.0),
        }
    }
}

/// Starts a picker task and returns a handle to it.
///
/// The task stops once every clone of the returned handle has been dropped;
/// any pending debounce timer is cancelled then. Must be called from within a
/// Tokio runtime.
pub fn spawn_picker<P: PositionSource>(
    geocoder: Arc<GeocodeClient>,
    source: P,
    options: PickerOptions,
) -> PickerHandle {
    PickerHandle {
        commands: PickerActor::spawn(geocoder, Arc::new(source), options),
    }
}

/// Cloneable front end to a running picker. Every method returns
/// [`PickerError::Closed`] if the picker task has gone away.
#[derive(Clone)]
pub struct PickerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl PickerHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, PickerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| PickerError::Closed)?;
        rx.await.map_err(|_| PickerError::Closed)
    }

    /// Reads the platform permission state; when it is `granted`, also
    /// refreshes from the device before returning.
    ///
    /// # Errors
    ///
    /// [`PickerError::Closed`] only.
    pub async fn query_permission(&self) -> Result<PermissionStatus, PickerError> {
        self.request(Command::QueryPermission).await
    }

    /// One-shot device position query. On success the fix becomes both the
    /// current and the selected location.
    ///
    /// # Errors
    ///
    /// [`PickerError::Geolocation`] when the platform refuses or fails; the
    /// caller should fall back to manual search.
    pub async fn refresh_from_device(&self) -> Result<Coordinate, PickerError> {
        Ok(self.request(Command::RefreshFromDevice).await??)
    }

    /// Map drag-end: moves the selection to `coordinate`.
    ///
    /// # Errors
    ///
    /// [`PickerError::InvalidCoordinate`] for out-of-range points.
    pub async fn drag_pin(&self, coordinate: Coordinate) -> Result<(), PickerError> {
        self.request(|tx| Command::DragPin(coordinate, tx)).await?
    }

    /// "Deliver here": selects a saved address's coordinate.
    ///
    /// # Errors
    ///
    /// [`PickerError::AddressNotFound`] for unknown ids.
    pub async fn select_saved(&self, id: AddressId) -> Result<Coordinate, PickerError> {
        self.request(|tx| Command::SelectSaved(id, tx)).await?
    }

    /// Opens a fresh, empty form, replacing any open one. If a location is
    /// already selected its address is looked up straight away.
    ///
    /// # Errors
    ///
    /// [`PickerError::Closed`] only.
    pub async fn open_form(&self) -> Result<(), PickerError> {
        self.request(Command::OpenForm).await
    }

    /// Discards the open form. Returns `false` if none was open.
    ///
    /// # Errors
    ///
    /// [`PickerError::Closed`] only.
    pub async fn cancel_form(&self) -> Result<bool, PickerError> {
        self.request(Command::CancelForm).await
    }

    /// A keystroke in one of the form's text fields.
    ///
    /// # Errors
    ///
    /// [`PickerError::NoOpenForm`] when no form is open.
    pub async fn edit_field(
        &self,
        field: DraftField,
        value: impl Into<String>,
    ) -> Result<(), PickerError> {
        let value = value.into();
        self.request(|tx| Command::EditField(field, value, tx))
            .await?
    }

    /// # Errors
    ///
    /// [`PickerError::NoOpenForm`] when no form is open.
    pub async fn set_kind(&self, kind: AddressKind) -> Result<(), PickerError> {
        self.request(|tx| Command::SetKind(kind, tx)).await?
    }

    /// Saves the draft at the selected location and closes the form.
    ///
    /// # Errors
    ///
    /// - [`PickerError::NoOpenForm`] when no form is open.
    /// - [`PickerError::NoSelectedLocation`] when nothing is selected; the
    ///   form stays open and nothing is saved.
    pub async fn submit(&self) -> Result<SavedAddress, PickerError> {
        self.request(Command::Submit).await?
    }

    /// Replaces a saved address with the same id. Returns `false` if none matched.
    ///
    /// # Errors
    ///
    /// [`PickerError::Closed`] only.
    pub async fn update_address(&self, address: SavedAddress) -> Result<bool, PickerError> {
        self.request(|tx| Command::UpdateAddress(address, tx)).await
    }

    /// Removes a saved address. Returns `false` if none matched.
    ///
    /// # Errors
    ///
    /// [`PickerError::Closed`] only.
    pub async fn remove_address(&self, id: AddressId) -> Result<bool, PickerError> {
        self.request(|tx| Command::RemoveAddress(id, tx)).await
    }

    /// Saved addresses in display order.
    ///
    /// # Errors
    ///
    /// [`PickerError::Closed`] only.
    pub async fn addresses(&self) -> Result<Vec<SavedAddress>, PickerError> {
        Ok(self.snapshot().await?.addresses)
    }

    /// # Errors
    ///
    /// [`PickerError::Closed`] only.
    pub async fn snapshot(&self) -> Result<PickerSnapshot, PickerError> {
        self.request(Command::Snapshot).await
    }

    /// Waits until no device query, debounce timer or lookup is outstanding.
    ///
    /// # Errors
    ///
    /// [`PickerError::SettleTimeout`] if that takes longer than `timeout`.
    pub async fn settle(&self, timeout: Duration) -> Result<PickerSnapshot, PickerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let snapshot = self.snapshot().await?;
            if snapshot.is_settled() {
                return Ok(snapshot);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PickerError::SettleTimeout(timeout));
            }
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
        }
    }
}
