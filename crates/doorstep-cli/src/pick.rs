//! Scripted run of the address picker: log in, locate, fill in the form,
//! save. Stands in for the interactive screen when exercising a provider.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use doorstep_core::{
    AddressKind, AppConfig, Coordinate, DraftField, PermissionStatus, SavedAddress,
};
use doorstep_geocode::GeocodeClient;
use doorstep_picker::{
    spawn_picker, DeniedPosition, FixedPosition, PickerHandle, PickerOptions, StubAuthenticator,
};

#[derive(Debug, Args)]
pub struct PickArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    /// Latitude the simulated device reports
    #[arg(
        long,
        allow_negative_numbers = true,
        requires = "lng",
        required_unless_present = "deny_location"
    )]
    pub lat: Option<f64>,
    /// Longitude the simulated device reports
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lng: Option<f64>,
    /// Simulate a user who refuses location access
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub deny_location: bool,
    #[arg(long)]
    pub house: Option<String>,
    #[arg(long)]
    pub street: Option<String>,
    #[arg(long)]
    pub area: Option<String>,
    #[arg(long, default_value = "home")]
    pub kind: AddressKind,
    /// How long to wait for lookups after each step
    #[arg(long, default_value = "10")]
    pub settle_secs: u64,
}

impl PickArgs {
    /// Typed edits in form order; fields not given are left to reverse lookup.
    pub(crate) fn edits(&self) -> Vec<(DraftField, &str)> {
        [
            (DraftField::HouseNumber, self.house.as_deref()),
            (DraftField::Street, self.street.as_deref()),
            (DraftField::Area, self.area.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }
}

pub(crate) async fn run_pick(config: &AppConfig, args: PickArgs) -> anyhow::Result<()> {
    let auth = StubAuthenticator::new(Duration::from_millis(config.auth_delay_ms));
    let user = auth.login(&args.email, &args.password).await?;

    let geocoder = Arc::new(GeocodeClient::from_config(config)?);
    let options = PickerOptions::from_config(config);

    let handle = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) if !args.deny_location => {
            let fix = Coordinate::new(lat, lng);
            anyhow::ensure!(fix.is_valid(), "coordinate {fix} is out of range");
            spawn_picker(geocoder, FixedPosition(fix), options)
        }
        _ => spawn_picker(geocoder, DeniedPosition, options),
    };

    let saved = drive(&handle, &args).await?;
    let addresses = handle.addresses().await?;
    let output = serde_json::json!({ "user": user, "saved": saved.id, "addresses": addresses });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn drive(handle: &PickerHandle, args: &PickArgs) -> anyhow::Result<SavedAddress> {
    let settle = Duration::from_secs(args.settle_secs);

    let permission = handle.query_permission().await?;
    tracing::info!(%permission, "location permission");
    if permission != PermissionStatus::Granted {
        if let Err(err) = handle.refresh_from_device().await {
            tracing::warn!(error = %err, "device location unavailable, using manual search");
        }
    }

    handle.open_form().await?;
    let snapshot = handle.settle(settle).await?;
    if let Some(error) = snapshot.form.and_then(|f| f.error) {
        tracing::warn!(%error, "could not prefill address");
    }

    handle.set_kind(args.kind).await?;
    for (field, value) in args.edits() {
        handle.edit_field(field, value).await?;
    }
    let snapshot = handle.settle(settle).await?;
    if let Some(error) = snapshot.form.and_then(|f| f.error) {
        tracing::warn!(%error, "address lookup failed");
    }

    let saved = handle.submit().await?;
    tracing::info!(id = %saved.id, full_address = %saved.full_address, "address saved");
    Ok(saved)
}
