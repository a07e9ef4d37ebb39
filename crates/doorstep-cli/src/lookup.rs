//! One-off geocoding lookups. Matches go to stdout as JSON.

use doorstep_core::{AppConfig, Coordinate};
use doorstep_geocode::GeocodeClient;

pub(crate) async fn run_geocode(config: &AppConfig, query: &str) -> anyhow::Result<()> {
    let client = GeocodeClient::from_config(config)?;
    match client.forward_geocode(query).await? {
        Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        None => println!("no result"),
    }
    Ok(())
}

pub(crate) async fn run_reverse(config: &AppConfig, lat: f64, lng: f64) -> anyhow::Result<()> {
    let coordinate = Coordinate::new(lat, lng);
    anyhow::ensure!(
        coordinate.is_valid(),
        "coordinate {coordinate} is out of range"
    );

    let client = GeocodeClient::from_config(config)?;
    match client.reverse_geocode(lat, lng).await? {
        Some(address) => println!("{}", serde_json::to_string_pretty(&address)?),
        None => println!("no result"),
    }
    Ok(())
}
