//! HTTP client for the geocoding provider's `geocode/json` endpoint.
//!
//! Two lookups share one endpoint: forward (`address=<text>`) and reverse
//! (`latlng=<lat>,<lng>`). Both read only the first candidate. Every call is a
//! fresh round trip: no retries, no caching, no rate limiting.

use std::time::Duration;

use doorstep_core::{AddressComponents, AppConfig, GeocodeResult, ResolvedAddress};
use reqwest::{Client, Url};

use crate::error::GeocodeError;
use crate::types::{AddressComponent, GeocodeCandidate, GeocodeResponse};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/";
const GEOCODE_PATH: &str = "geocode/json";

/// Client for the geocoding provider.
///
/// Use [`GeocodeClient::new`] for production, [`GeocodeClient::from_config`]
/// when an [`AppConfig`] is at hand, or [`GeocodeClient::with_base_url`] to
/// point at a mock server in tests.
pub struct GeocodeClient {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl GeocodeClient {
    /// Creates a client pointed at the production provider.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, GeocodeError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client from the loaded application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`GeocodeClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, GeocodeError> {
        Self::with_base_url(
            &config.geocode_api_key,
            config.geocode_timeout_secs,
            &config.user_agent,
            &config.geocode_base_url,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends rather than replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(GEOCODE_PATH))
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                base_url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
        })
    }

    /// Resolves free text to the provider's best-matching coordinate.
    ///
    /// Returns `Ok(None)` when the provider has no candidates, answers with a
    /// non-2xx status, or `query` is blank.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or timeout.
    /// - [`GeocodeError::Deserialize`] if the body is not the expected JSON.
    /// - [`GeocodeError::Malformed`] if the first candidate has no geometry.
    pub async fn forward_geocode(
        &self,
        query: &str,
    ) -> Result<Option<GeocodeResult>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("skipping forward geocode for blank query");
            return Ok(None);
        }

        let context = format!("forward_geocode(address={query})");
        let url = self.build_url(&[("address", query)]);
        let Some(candidate) = self.first_candidate(&url, &context).await? else {
            return Ok(None);
        };

        let location = candidate
            .geometry
            .map(|g| g.location)
            .ok_or_else(|| GeocodeError::Malformed {
                context,
                reason: "first result has no geometry.location".to_string(),
            })?;

        Ok(Some(GeocodeResult {
            latitude: location.lat,
            longitude: location.lng,
            formatted_address: candidate.formatted_address,
        }))
    }

    /// Resolves a coordinate to the provider's best-matching postal address.
    ///
    /// Returns `Ok(None)` when the provider has no candidates or answers with
    /// a non-2xx status.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or timeout.
    /// - [`GeocodeError::Deserialize`] if the body is not the expected JSON.
    pub async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<ResolvedAddress>, GeocodeError> {
        let latlng = format!("{latitude},{longitude}");
        let context = format!("reverse_geocode(latlng={latlng})");
        let url = self.build_url(&[("latlng", &latlng)]);
        let Some(candidate) = self.first_candidate(&url, &context).await? else {
            return Ok(None);
        };

        Ok(Some(ResolvedAddress {
            components: flatten_components(&candidate.address_components),
            formatted_address: candidate.formatted_address,
        }))
    }

    /// Builds the request URL with percent-encoded lookup parameters followed
    /// by the API key.
    fn build_url(&self, params: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("key", &self.api_key);
        }
        url
    }

    /// Sends the GET and returns the first candidate, or `None` for an empty
    /// result list or a non-2xx status.
    async fn first_candidate(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, context, "geocoding provider returned non-success status");
            return Ok(None);
        }

        let body = response.text().await?;
        let parsed: GeocodeResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: context.to_string(),
                source: e,
            })?;

        let provider_status = parsed.status.as_deref().unwrap_or("unknown");
        match parsed.results.into_iter().next() {
            Some(candidate) => Ok(Some(candidate)),
            None => {
                tracing::debug!(provider_status, context, "geocoding returned no results");
                Ok(None)
            }
        }
    }
}

/// Flattens `address_components` into the sparse mapping the address form
/// uses, keyed by each component's primary type tag. The first component for a
/// given tag wins; components without a type tag are ignored.
pub(crate) fn flatten_components(components: &[AddressComponent]) -> AddressComponents {
    let mut flat = AddressComponents::default();
    for component in components {
        let slot = match component.primary_type() {
            Some("street_number") => &mut flat.street_number,
            Some("route") => &mut flat.route,
            Some("sublocality") => &mut flat.sublocality,
            Some("locality") => &mut flat.locality,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(component.long_name.clone());
        }
    }
    flat
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
