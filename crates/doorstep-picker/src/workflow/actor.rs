//! The picker task: sole owner of location state, the address book and the
//! open form. Commands arrive from [`PickerHandle`](super::PickerHandle);
//! timers and lookups run as spawned tasks and report back as [`Event`]s, so
//! nothing here ever awaits.

use std::sync::Arc;

use doorstep_core::{
    AddressId, AddressKind, Coordinate, DraftField, GeocodeResult, PermissionStatus,
    ResolvedAddress, SavedAddress,
};
use doorstep_geocode::{GeocodeClient, GeocodeError};
use tokio::sync::{mpsc, oneshot};

use super::form::FormSession;
use super::snapshot::PickerSnapshot;
use super::PickerOptions;
use crate::address_book::AddressBook;
use crate::debounce::Debouncer;
use crate::error::{GeolocationError, PickerError};
use crate::location::LocationController;
use crate::position::PositionSource;

pub(super) const REVERSE_FAILED: &str = "Failed to get address details";
pub(super) const FORWARD_FAILED: &str = "Failed to locate address";

/// Forward results this close to the current selection do not move the pin.
const SAME_POINT_EPSILON: f64 = 1e-7;

pub(super) type Reply<T> = oneshot::Sender<T>;

pub(super) enum Command {
    QueryPermission(Reply<PermissionStatus>),
    RefreshFromDevice(Reply<Result<Coordinate, GeolocationError>>),
    DragPin(Coordinate, Reply<Result<(), PickerError>>),
    SelectSaved(AddressId, Reply<Result<Coordinate, PickerError>>),
    OpenForm(Reply<()>),
    CancelForm(Reply<bool>),
    EditField(DraftField, String, Reply<Result<(), PickerError>>),
    SetKind(AddressKind, Reply<Result<(), PickerError>>),
    Submit(Reply<Result<SavedAddress, PickerError>>),
    UpdateAddress(SavedAddress, Reply<bool>),
    RemoveAddress(AddressId, Reply<bool>),
    Snapshot(Reply<PickerSnapshot>),
}

/// Who answers once a device fix lands.
enum FixReply {
    Caller(Reply<Result<Coordinate, GeolocationError>>),
    /// The fix was chained from a permission query that reported `granted`.
    Permission(PermissionStatus, Reply<PermissionStatus>),
}

enum Event {
    PermissionRead {
        result: Result<PermissionStatus, GeolocationError>,
        reply: Reply<PermissionStatus>,
    },
    DeviceFix {
        result: Result<Coordinate, GeolocationError>,
        reply: FixReply,
    },
    DebounceElapsed {
        form_id: u64,
        revision: u64,
    },
    Reversed {
        form_id: u64,
        target: Coordinate,
        result: Result<Option<ResolvedAddress>, GeocodeError>,
    },
    Forwarded {
        form_id: u64,
        revision: u64,
        generation: u64,
        result: Result<Option<GeocodeResult>, GeocodeError>,
    },
}

#[derive(Debug, Clone, Copy)]
enum SelectionOrigin {
    Device,
    PinDrag,
    ForwardLookup,
    SavedAddress,
}

/// Tag on every draft write. Only user edits may schedule a forward lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftOrigin {
    User,
    Derived,
}

pub(super) struct PickerActor<P> {
    geocoder: Arc<GeocodeClient>,
    location: LocationController<P>,
    book: AddressBook,
    form: Option<FormSession>,
    options: PickerOptions,
    events: mpsc::UnboundedSender<Event>,
    next_form_id: u64,
    /// Bumped on every selection change not made by a forward lookup.
    selection_generation: u64,
    locating: usize,
}

impl<P: PositionSource> PickerActor<P> {
    /// Spawns the actor task and returns its command sender.
    pub(super) fn spawn(
        geocoder: Arc<GeocodeClient>,
        source: Arc<P>,
        options: PickerOptions,
    ) -> mpsc::UnboundedSender<Command> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let actor = Self {
            geocoder,
            location: LocationController::new(source),
            book: AddressBook::new(),
            form: None,
            options,
            events: event_tx,
            next_form_id: 1,
            selection_generation: 0,
            locating: 0,
        };
        tokio::spawn(actor.run(command_rx, event_rx));
        command_tx
    }

    /// Runs until every handle has been dropped.
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }
        // Dropping the form cancels any pending debounce timer.
        self.form = None;
        tracing::debug!("picker closed");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::QueryPermission(reply) => self.start_permission_query(reply),
            Command::RefreshFromDevice(reply) => self.start_device_fix(FixReply::Caller(reply)),
            Command::DragPin(coordinate, reply) => {
                let _ = reply.send(self.drag_pin(coordinate));
            }
            Command::SelectSaved(id, reply) => {
                let _ = reply.send(self.select_saved(id));
            }
            Command::OpenForm(reply) => {
                self.open_form();
                let _ = reply.send(());
            }
            Command::CancelForm(reply) => {
                let _ = reply.send(self.cancel_form());
            }
            Command::EditField(field, value, reply) => {
                let _ = reply.send(self.edit_field(field, value));
            }
            Command::SetKind(kind, reply) => {
                let _ = reply.send(self.set_kind(kind));
            }
            Command::Submit(reply) => {
                let _ = reply.send(self.submit());
            }
            Command::UpdateAddress(address, reply) => {
                let _ = reply.send(self.book.update(address));
            }
            Command::RemoveAddress(id, reply) => {
                let _ = reply.send(self.book.remove(id));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::PermissionRead { result, reply } => self.on_permission_read(result, reply),
            Event::DeviceFix { result, reply } => self.on_device_fix(result, reply),
            Event::DebounceElapsed { form_id, revision } => {
                self.on_debounce_elapsed(form_id, revision);
            }
            Event::Reversed {
                form_id,
                target,
                result,
            } => self.on_reversed(form_id, target, result),
            Event::Forwarded {
                form_id,
                revision,
                generation,
                result,
            } => self.on_forwarded(form_id, revision, generation, result),
        }
    }

    // -----------------------------------------------------------------------
    // Location
    // -----------------------------------------------------------------------

    fn start_permission_query(&mut self, reply: Reply<PermissionStatus>) {
        let source = self.location.source();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = source.permission_state().await;
            let _ = events.send(Event::PermissionRead { result, reply });
        });
    }

    fn on_permission_read(
        &mut self,
        result: Result<PermissionStatus, GeolocationError>,
        reply: Reply<PermissionStatus>,
    ) {
        let status = self.location.apply_permission(result);
        if status == PermissionStatus::Granted {
            self.start_device_fix(FixReply::Permission(status, reply));
        } else {
            let _ = reply.send(status);
        }
    }

    fn start_device_fix(&mut self, reply: FixReply) {
        self.locating += 1;
        let source = self.location.source();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = source.current_position().await;
            let _ = events.send(Event::DeviceFix { result, reply });
        });
    }

    fn on_device_fix(&mut self, result: Result<Coordinate, GeolocationError>, reply: FixReply) {
        self.locating = self.locating.saturating_sub(1);
        let applied = self.location.apply_position(result);
        if let Ok(coordinate) = applied {
            self.on_selection_changed(coordinate, SelectionOrigin::Device);
        }
        match reply {
            FixReply::Caller(reply) => {
                let _ = reply.send(applied);
            }
            // The chained refresh's failure is already logged; the caller only
            // asked for the permission state.
            FixReply::Permission(status, reply) => {
                let _ = reply.send(status);
            }
        }
    }

    fn drag_pin(&mut self, coordinate: Coordinate) -> Result<(), PickerError> {
        if !coordinate.is_valid() {
            return Err(PickerError::InvalidCoordinate {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            });
        }
        self.select(coordinate, SelectionOrigin::PinDrag);
        Ok(())
    }

    fn select_saved(&mut self, id: AddressId) -> Result<Coordinate, PickerError> {
        let coordinate = self
            .book
            .get(id)
            .map(SavedAddress::coordinate)
            .ok_or(PickerError::AddressNotFound(id))?;
        self.select(coordinate, SelectionOrigin::SavedAddress);
        Ok(coordinate)
    }

    fn select(&mut self, coordinate: Coordinate, origin: SelectionOrigin) {
        self.location.set_selection(coordinate);
        self.on_selection_changed(coordinate, origin);
    }

    /// Coordinate -> text direction. Every selection change while a form is
    /// open starts a reverse lookup for the new point.
    fn on_selection_changed(&mut self, coordinate: Coordinate, origin: SelectionOrigin) {
        tracing::debug!(%coordinate, ?origin, "selected location changed");
        if !matches!(origin, SelectionOrigin::ForwardLookup) {
            self.selection_generation += 1;
        }
        if self.form.is_some() {
            self.spawn_reverse(coordinate);
        }
    }

    // -----------------------------------------------------------------------
    // Form
    // -----------------------------------------------------------------------

    fn open_form(&mut self) {
        let id = self.next_form_id;
        self.next_form_id += 1;
        // Replacing an open form drops it, cancelling its timer.
        self.form = Some(FormSession::new(id, Debouncer::new(self.options.debounce)));
        tracing::debug!(form_id = id, "address form opened");
        if let Some(selected) = self.location.selected() {
            self.spawn_reverse(selected);
        }
    }

    fn cancel_form(&mut self) -> bool {
        match self.form.take() {
            Some(form) => {
                tracing::debug!(form_id = form.id, "address form discarded");
                true
            }
            None => false,
        }
    }

    fn edit_field(&mut self, field: DraftField, value: String) -> Result<(), PickerError> {
        let form = self.form.as_mut().ok_or(PickerError::NoOpenForm)?;
        form.draft.set(field, value);
        self.on_draft_changed(DraftOrigin::User);
        Ok(())
    }

    fn set_kind(&mut self, kind: AddressKind) -> Result<(), PickerError> {
        let form = self.form.as_mut().ok_or(PickerError::NoOpenForm)?;
        form.draft.kind = kind;
        Ok(())
    }

    /// Text -> coordinate direction. Derived writes (from reverse lookups)
    /// never schedule a forward lookup; they only drop one that was waiting
    /// on text that has just been replaced.
    fn on_draft_changed(&mut self, origin: DraftOrigin) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        form.cancel_pending_forward();
        if origin == DraftOrigin::Derived {
            return;
        }

        form.revision += 1;
        let query_chars = form.draft.query_text().chars().count();
        if query_chars <= self.options.min_query_chars {
            return;
        }

        let revision = form.revision;
        let form_id = form.id;
        let events = self.events.clone();
        form.pending_forward = Some(revision);
        form.debouncer.schedule(move || {
            let _ = events.send(Event::DebounceElapsed { form_id, revision });
        });
    }

    fn on_debounce_elapsed(&mut self, form_id: u64, revision: u64) {
        let Some(form) = self.form.as_mut().filter(|f| f.id == form_id) else {
            return;
        };
        // A cancel may race a timer that already fired.
        if form.pending_forward != Some(revision) {
            return;
        }
        form.pending_forward = None;
        form.forward_in_flight += 1;
        form.error = None;

        let query = form.draft.query_text();
        let generation = self.selection_generation;
        tracing::debug!(form_id, revision, query = %query, "dispatching forward geocode");
        let geocoder = Arc::clone(&self.geocoder);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = geocoder.forward_geocode(&query).await;
            let _ = events.send(Event::Forwarded {
                form_id,
                revision,
                generation,
                result,
            });
        });
    }

    fn on_forwarded(
        &mut self,
        form_id: u64,
        revision: u64,
        generation: u64,
        result: Result<Option<GeocodeResult>, GeocodeError>,
    ) {
        let Some(form) = self.form.as_mut().filter(|f| f.id == form_id) else {
            tracing::debug!(form_id, "dropping forward result for closed form");
            return;
        };
        form.forward_in_flight = form.forward_in_flight.saturating_sub(1);
        if form.revision != revision {
            tracing::debug!(revision, current = form.revision, "dropping superseded forward result");
            return;
        }
        // The pin was moved by other means while the lookup was in flight.
        if generation != self.selection_generation {
            tracing::debug!(generation, "dropping forward result after selection change");
            return;
        }

        let found = match result {
            Ok(Some(found)) => found,
            Ok(None) => {
                tracing::debug!(revision, "forward geocode found nothing");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "forward geocode failed");
                form.error = Some(FORWARD_FAILED.to_string());
                return;
            }
        };

        let coordinate = found.coordinate();
        if !coordinate.is_valid() {
            tracing::warn!(%coordinate, "forward geocode returned an out-of-range coordinate");
            form.error = Some(FORWARD_FAILED.to_string());
            return;
        }
        let unchanged = self
            .location
            .selected()
            .is_some_and(|current| current.approx_eq(&coordinate, SAME_POINT_EPSILON));
        if unchanged {
            tracing::debug!(%coordinate, "forward geocode matches current selection");
            return;
        }
        // Moving the pin starts exactly one reverse lookup; its derived
        // write cannot schedule another forward lookup.
        self.select(coordinate, SelectionOrigin::ForwardLookup);
    }

    fn spawn_reverse(&mut self, target: Coordinate) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        form.reverse_in_flight += 1;
        form.error = None;

        let form_id = form.id;
        let geocoder = Arc::clone(&self.geocoder);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = geocoder
                .reverse_geocode(target.latitude, target.longitude)
                .await;
            let _ = events.send(Event::Reversed {
                form_id,
                target,
                result,
            });
        });
    }

    fn on_reversed(
        &mut self,
        form_id: u64,
        target: Coordinate,
        result: Result<Option<ResolvedAddress>, GeocodeError>,
    ) {
        let current = self.location.selected();
        let Some(form) = self.form.as_mut().filter(|f| f.id == form_id) else {
            tracing::debug!(form_id, "dropping reverse result for closed form");
            return;
        };
        form.reverse_in_flight = form.reverse_in_flight.saturating_sub(1);
        if current != Some(target) {
            tracing::debug!(%target, "dropping stale reverse result");
            return;
        }

        match result {
            Ok(Some(resolved)) => {
                form.draft.apply_components(&resolved.components);
                tracing::debug!(
                    formatted_address = %resolved.formatted_address,
                    "draft filled from reverse geocode"
                );
                self.on_draft_changed(DraftOrigin::Derived);
            }
            Ok(None) => tracing::debug!(%target, "reverse geocode found nothing"),
            Err(err) => {
                tracing::warn!(error = %err, "reverse geocode failed");
                form.error = Some(REVERSE_FAILED.to_string());
            }
        }
    }

    /// Saves the draft at the selected location and closes the form.
    fn submit(&mut self) -> Result<SavedAddress, PickerError> {
        let form = self.form.as_ref().ok_or(PickerError::NoOpenForm)?;
        let location = self
            .location
            .selected()
            .ok_or(PickerError::NoSelectedLocation)?;
        let saved = self.book.add(&form.draft, location);
        self.form = None;
        Ok(saved)
    }

    fn snapshot(&self) -> PickerSnapshot {
        PickerSnapshot {
            location: self.location.state().clone(),
            map: self
                .location
                .map_view(self.options.map_fallback_center, self.options.map_zoom),
            locating: self.locating > 0,
            form: self.form.as_ref().map(FormSession::snapshot),
            addresses: self.book.list().to_vec(),
        }
    }
}
