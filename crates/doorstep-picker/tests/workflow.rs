//! End-to-end picker behaviour against a wiremock geocoding provider.

use std::sync::Arc;
use std::time::Duration;

use doorstep_core::{AddressId, AddressKind, Coordinate, DraftField, PermissionStatus};
use doorstep_geocode::GeocodeClient;
use doorstep_picker::{
    spawn_picker, DeniedPosition, FixedPosition, GeolocationError, PickerError, PickerHandle,
    PickerOptions, PositionSource, ResolutionPhase,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SETTLE: Duration = Duration::from_secs(5);
const DEBOUNCE: Duration = Duration::from_millis(50);

fn geocoder(server: &MockServer) -> Arc<GeocodeClient> {
    Arc::new(
        GeocodeClient::with_base_url("test-key", 5, "doorstep-test", &server.uri())
            .expect("client construction should not fail"),
    )
}

fn picker<P: PositionSource>(server: &MockServer, source: P) -> PickerHandle {
    let options = PickerOptions {
        debounce: DEBOUNCE,
        ..PickerOptions::default()
    };
    spawn_picker(geocoder(server), source, options)
}

/// A single-candidate response carrying the given `(type, long_name)` parts.
fn address_body(formatted: &str, parts: &[(&str, &str)]) -> Value {
    let components: Vec<Value> = parts
        .iter()
        .map(|(kind, name)| json!({ "long_name": name, "types": [kind, "political"] }))
        .collect();
    json!({
        "status": "OK",
        "results": [{
            "formatted_address": formatted,
            "geometry": { "location": { "lat": 0.0, "lng": 0.0 } },
            "address_components": components
        }]
    })
}

fn location_body(lat: f64, lng: f64) -> Value {
    json!({
        "status": "OK",
        "results": [{
            "formatted_address": "somewhere",
            "geometry": { "location": { "lat": lat, "lng": lng } },
            "address_components": []
        }]
    })
}

fn empty_body() -> Value {
    json!({ "status": "ZERO_RESULTS", "results": [] })
}

async fn mock_reverse(server: &MockServer, latlng: &str, body: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("latlng", latlng))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

async fn mock_forward(server: &MockServer, address: &str, body: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("address", address))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn opening_form_fills_draft_from_selected_location() {
    let server = MockServer::start().await;
    mock_reverse(
        &server,
        "40,-74",
        address_body(
            "12 Main St, Springfield",
            &[
                ("street_number", "12"),
                ("route", "Main St"),
                ("locality", "Springfield"),
            ],
        ),
        1,
    )
    .await;
    // The filled-in text is long enough to search for, but it was not typed.
    mock_forward(&server, "12 Main St Springfield", empty_body(), 0).await;

    let handle = picker(&server, FixedPosition(Coordinate::new(40.0, -74.0)));
    handle.refresh_from_device().await.unwrap();
    handle.open_form().await.unwrap();

    let snapshot = handle.settle(SETTLE).await.unwrap();
    let form = snapshot.form.expect("form should be open");
    assert_eq!(form.draft.house_number, "12");
    assert_eq!(form.draft.street, "Main St");
    assert_eq!(form.draft.area, "Springfield");
    assert!(form.error.is_none());

    tokio::time::sleep(DEBOUNCE * 4).await;
}

#[tokio::test]
async fn rapid_edits_issue_one_forward_lookup() {
    let server = MockServer::start().await;
    mock_forward(&server, "12 Main", location_body(1.0, 2.0), 0).await;
    mock_forward(&server, "12 Main St", location_body(1.0, 2.0), 1).await;
    mock_reverse(&server, "1,2", empty_body(), 1).await;

    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::Street, "12 Main").await.unwrap();
    handle.edit_field(DraftField::Street, "12 Main St").await.unwrap();

    let phase = handle.snapshot().await.unwrap().form.unwrap().phase;
    assert_eq!(phase, ResolutionPhase::ForwardScheduled);

    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert_eq!(
        snapshot.location.selected_location,
        Some(Coordinate::new(1.0, 2.0))
    );
    assert_eq!(snapshot.map.center, Coordinate::new(1.0, 2.0));
    // Nothing came back from the reverse lookup, so the typed text stays.
    assert_eq!(snapshot.form.unwrap().draft.street, "12 Main St");
}

#[tokio::test]
async fn short_queries_are_not_looked_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_body()))
        .expect(0)
        .mount(&server)
        .await;

    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::HouseNumber, "12").await.unwrap();
    handle.edit_field(DraftField::Street, "Ma").await.unwrap();

    let phase = handle.snapshot().await.unwrap().form.unwrap().phase;
    assert_eq!(phase, ResolutionPhase::Idle);
    tokio::time::sleep(DEBOUNCE * 4).await;
}

#[tokio::test]
async fn late_reverse_result_for_old_pin_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("latlng", "40,-74"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(address_body("old", &[("route", "Old St")]))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mock_reverse(
        &server,
        "41,-73",
        address_body("new", &[("route", "New St")]),
        1,
    )
    .await;

    let handle = picker(&server, FixedPosition(Coordinate::new(40.0, -74.0)));
    handle.refresh_from_device().await.unwrap();
    handle.open_form().await.unwrap();
    handle.drag_pin(Coordinate::new(41.0, -73.0)).await.unwrap();

    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert_eq!(snapshot.form.unwrap().draft.street, "New St");
    assert_eq!(
        snapshot.location.current_location,
        Some(Coordinate::new(40.0, -74.0))
    );
}

#[tokio::test]
async fn submit_without_selection_is_rejected() {
    let server = MockServer::start().await;
    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::HouseNumber, "7").await.unwrap();

    let err = handle.submit().await.unwrap_err();
    assert!(matches!(err, PickerError::NoSelectedLocation));

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.addresses.is_empty());
    assert_eq!(snapshot.form.unwrap().draft.house_number, "7");
}

#[tokio::test]
async fn submit_without_open_form_is_rejected() {
    let server = MockServer::start().await;
    let handle = picker(&server, FixedPosition(Coordinate::new(1.0, 1.0)));
    handle.refresh_from_device().await.unwrap();
    assert!(matches!(
        handle.submit().await.unwrap_err(),
        PickerError::NoOpenForm
    ));
    assert!(matches!(
        handle.edit_field(DraftField::Area, "x").await.unwrap_err(),
        PickerError::NoOpenForm
    ));
}

#[tokio::test]
async fn typed_address_moves_pin_and_is_saved() {
    let server = MockServer::start().await;
    mock_reverse(
        &server,
        "40,-74",
        address_body("Broadway, NYC", &[("route", "Broadway"), ("locality", "NYC")]),
        1,
    )
    .await;
    mock_forward(
        &server,
        "221B Broadway NYC",
        location_body(40.7128, -74.0061),
        1,
    )
    .await;
    mock_reverse(
        &server,
        "40.7128,-74.0061",
        address_body(
            "221B Broadway, NYC",
            &[
                ("street_number", "221B"),
                ("route", "Broadway"),
                ("locality", "NYC"),
            ],
        ),
        1,
    )
    .await;

    let handle = picker(&server, FixedPosition(Coordinate::new(40.0, -74.0)));
    assert_eq!(
        handle.query_permission().await.unwrap(),
        PermissionStatus::Granted
    );
    handle.open_form().await.unwrap();
    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert_eq!(snapshot.form.as_ref().unwrap().draft.street, "Broadway");
    assert_eq!(snapshot.form.as_ref().unwrap().draft.house_number, "");

    handle.set_kind(AddressKind::Office).await.unwrap();
    handle
        .edit_field(DraftField::HouseNumber, "221B")
        .await
        .unwrap();
    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert_eq!(
        snapshot.location.selected_location,
        Some(Coordinate::new(40.7128, -74.0061))
    );

    let saved = handle.submit().await.unwrap();
    assert_eq!(saved.full_address, "221B, Broadway, NYC");
    assert_eq!(saved.kind, AddressKind::Office);
    assert!((saved.latitude - 40.7128).abs() < f64::EPSILON);
    assert!((saved.longitude - -74.0061).abs() < f64::EPSILON);

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.form.is_none());
    assert_eq!(snapshot.addresses.len(), 1);
    assert_eq!(snapshot.addresses[0].id, saved.id);
}

#[tokio::test]
async fn forward_result_at_current_pin_does_not_reverse_again() {
    let server = MockServer::start().await;
    mock_reverse(&server, "40,-74", empty_body(), 1).await;
    mock_forward(&server, "Here Street", location_body(40.0, -74.0), 1).await;

    let handle = picker(&server, FixedPosition(Coordinate::new(40.0, -74.0)));
    handle.refresh_from_device().await.unwrap();
    handle.open_form().await.unwrap();
    handle.settle(SETTLE).await.unwrap();

    handle
        .edit_field(DraftField::Street, "Here Street")
        .await
        .unwrap();
    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert_eq!(
        snapshot.location.selected_location,
        Some(Coordinate::new(40.0, -74.0))
    );
}

#[tokio::test]
async fn closing_form_cancels_pending_lookup() {
    let server = MockServer::start().await;
    mock_forward(&server, "12 Main St", location_body(1.0, 2.0), 0).await;

    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::Street, "12 Main St").await.unwrap();
    assert!(handle.cancel_form().await.unwrap());
    assert!(!handle.cancel_form().await.unwrap());

    tokio::time::sleep(DEBOUNCE * 4).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.location.selected_location.is_none());
}

#[tokio::test]
async fn dropping_handle_cancels_pending_lookup() {
    let server = MockServer::start().await;
    mock_forward(&server, "12 Main St", location_body(1.0, 2.0), 0).await;

    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::Street, "12 Main St").await.unwrap();
    drop(handle);

    tokio::time::sleep(DEBOUNCE * 4).await;
}

#[tokio::test]
async fn failed_reverse_lookup_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("latlng", "40,-74"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let handle = picker(&server, FixedPosition(Coordinate::new(40.0, -74.0)));
    handle.refresh_from_device().await.unwrap();
    handle.open_form().await.unwrap();

    let form = handle.settle(SETTLE).await.unwrap().form.unwrap();
    assert_eq!(form.error.as_deref(), Some("Failed to get address details"));
    assert_eq!(form.draft.street, "");
}

#[tokio::test]
async fn failed_forward_lookup_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("address", "Nowhere Lane"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle
        .edit_field(DraftField::Street, "Nowhere Lane")
        .await
        .unwrap();

    let snapshot = handle.settle(SETTLE).await.unwrap();
    let form = snapshot.form.unwrap();
    assert_eq!(form.error.as_deref(), Some("Failed to locate address"));
    assert!(snapshot.location.selected_location.is_none());
}

#[tokio::test]
async fn saved_addresses_can_be_selected_updated_and_removed() {
    let server = MockServer::start().await;
    mock_reverse(&server, "40,-74", empty_body(), 1).await;

    let handle = picker(&server, FixedPosition(Coordinate::new(40.0, -74.0)));
    handle.refresh_from_device().await.unwrap();
    handle.open_form().await.unwrap();
    handle.settle(SETTLE).await.unwrap();
    handle.edit_field(DraftField::Area, "Home").await.unwrap();
    let mut saved = handle.submit().await.unwrap();

    handle.drag_pin(Coordinate::new(10.0, 10.0)).await.unwrap();
    let coordinate = handle.select_saved(saved.id).await.unwrap();
    assert_eq!(coordinate, Coordinate::new(40.0, -74.0));

    saved.area = "Work".to_string();
    assert!(handle.update_address(saved.clone()).await.unwrap());
    assert_eq!(handle.addresses().await.unwrap()[0].area, "Work");

    let unknown = AddressId(1);
    assert!(!handle.remove_address(unknown).await.unwrap());
    assert!(matches!(
        handle.select_saved(unknown).await.unwrap_err(),
        PickerError::AddressNotFound(_)
    ));
    assert!(handle.remove_address(saved.id).await.unwrap());
    assert!(handle.addresses().await.unwrap().is_empty());
}

#[tokio::test]
async fn denied_permission_falls_back_to_manual_search() {
    let server = MockServer::start().await;
    let handle = picker(&server, DeniedPosition);

    assert_eq!(
        handle.query_permission().await.unwrap(),
        PermissionStatus::Denied
    );
    let err = handle.refresh_from_device().await.unwrap_err();
    assert!(matches!(
        err,
        PickerError::Geolocation(GeolocationError::PermissionDenied)
    ));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.location.permission_status, PermissionStatus::Denied);
    assert!(snapshot.location.current_location.is_none());
    assert_eq!(snapshot.map.center, Coordinate::new(0.0, 0.0));
    assert!(!snapshot.locating);
}

#[tokio::test]
async fn dragging_pin_outside_range_is_rejected() {
    let server = MockServer::start().await;
    let handle = picker(&server, DeniedPosition);
    let err = handle
        .drag_pin(Coordinate::new(91.0, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, PickerError::InvalidCoordinate { .. }));
    assert!(handle
        .snapshot()
        .await
        .unwrap()
        .location
        .selected_location
        .is_none());
}

async fn wait_for_phase(handle: &PickerHandle, phase: ResolutionPhase) {
    for _ in 0..300 {
        let current = handle.snapshot().await.unwrap().form.map(|f| f.phase);
        if current == Some(phase) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("form never reached {phase:?}");
}

async fn mock_slow_forward(server: &MockServer, address: &str, body: Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("address", address))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .set_delay(delay),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn pin_drag_during_forward_lookup_keeps_dragged_point() {
    let server = MockServer::start().await;
    mock_slow_forward(
        &server,
        "12 Main St",
        location_body(1.0, 2.0),
        Duration::from_millis(400),
    )
    .await;
    mock_reverse(&server, "5,5", address_body("Elm St", &[("route", "Elm St")]), 1).await;
    mock_reverse(&server, "1,2", address_body("Main St", &[("route", "Main St")]), 0).await;

    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::Street, "12 Main St").await.unwrap();
    wait_for_phase(&handle, ResolutionPhase::ForwardResolving).await;
    handle.drag_pin(Coordinate::new(5.0, 5.0)).await.unwrap();

    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert_eq!(
        snapshot.location.selected_location,
        Some(Coordinate::new(5.0, 5.0))
    );
    assert_eq!(snapshot.form.unwrap().draft.street, "Elm St");
}

#[tokio::test]
async fn edit_after_dispatch_discards_forward_result() {
    let server = MockServer::start().await;
    mock_slow_forward(
        &server,
        "12 Main St",
        location_body(1.0, 2.0),
        Duration::from_millis(300),
    )
    .await;
    mock_forward(&server, "12 Main Street", empty_body(), 1).await;
    mock_reverse(&server, "1,2", empty_body(), 0).await;

    let handle = picker(&server, DeniedPosition);
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::Street, "12 Main St").await.unwrap();
    wait_for_phase(&handle, ResolutionPhase::ForwardResolving).await;
    handle
        .edit_field(DraftField::Street, "12 Main Street")
        .await
        .unwrap();

    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert!(snapshot.location.selected_location.is_none());
    assert_eq!(snapshot.form.unwrap().draft.street, "12 Main Street");
}

#[tokio::test]
async fn reverse_fill_cancels_scheduled_forward_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("latlng", "40,-74"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(address_body(
                    "Broadway, NYC",
                    &[("route", "Broadway"), ("locality", "NYC")],
                ))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mock_forward(&server, "12 Main St", location_body(1.0, 2.0), 0).await;

    let options = PickerOptions {
        debounce: Duration::from_millis(500),
        ..PickerOptions::default()
    };
    let handle = spawn_picker(
        geocoder(&server),
        FixedPosition(Coordinate::new(40.0, -74.0)),
        options,
    );
    handle.refresh_from_device().await.unwrap();
    handle.open_form().await.unwrap();
    handle.edit_field(DraftField::Street, "12 Main St").await.unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;
    let snapshot = handle.settle(SETTLE).await.unwrap();
    assert_eq!(
        snapshot.location.selected_location,
        Some(Coordinate::new(40.0, -74.0))
    );
    assert_eq!(snapshot.form.unwrap().draft.street, "Broadway");
}

#[tokio::test(start_paused = true)]
async fn default_window_waits_one_second_after_last_keystroke() {
    // Nothing listens here; only the timing of the dispatch is observed.
    let geocoder = Arc::new(
        GeocodeClient::with_base_url("test-key", 30, "doorstep-test", "http://127.0.0.1:9")
            .expect("client construction should not fail"),
    );
    let handle = spawn_picker(geocoder, DeniedPosition, PickerOptions::default());
    handle.open_form().await.unwrap();

    let phase = |handle: PickerHandle| async move {
        handle.snapshot().await.unwrap().form.unwrap().phase
    };

    handle.edit_field(DraftField::Street, "12 Main").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    handle.edit_field(DraftField::Street, "12 Main St").await.unwrap();

    // 1200 ms after the first keystroke, 600 ms after the last.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(phase(handle.clone()).await, ResolutionPhase::ForwardScheduled);

    tokio::time::sleep(Duration::from_millis(399)).await;
    assert_eq!(phase(handle.clone()).await, ResolutionPhase::ForwardScheduled);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_ne!(phase(handle.clone()).await, ResolutionPhase::ForwardScheduled);
}
