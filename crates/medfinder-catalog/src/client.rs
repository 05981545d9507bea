//! HTTP client for the amenity data source's `/amenities/` endpoint.

use std::time::Duration;

use medfinder_core::{AppConfig, Coordinate, FacilityCategory, FacilityRecord};
use reqwest::Client;

use crate::error::CatalogError;
use crate::normalize::normalize_amenity;
use crate::retry::retry_with_backoff;
use crate::types::AmenityDto;

/// Server-side narrowing for a catalog fetch.
///
/// Both fields are optional hints; the full text, category and distance
/// filtering still happens locally when the records are ranked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmenityQuery {
    pub category: Option<FacilityCategory>,
    pub near: Option<Coordinate>,
}

impl AmenityQuery {
    #[must_use]
    pub fn with_category(mut self, category: FacilityCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn near(mut self, coordinate: Coordinate) -> Self {
        self.near = Some(coordinate);
        self
    }
}

/// Fetches facility records from a remote amenity service.
///
/// Rate limiting (429) and network failures are retried with exponential
/// backoff. Records that fail normalization are skipped with a warning rather
/// than failing the whole fetch.
pub struct CatalogClient {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl CatalogClient {
    /// Creates a client with the given request timeout, `User-Agent` and
    /// retry policy. `max_retries = 0` disables retries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Creates a client from the `MEDFINDER_HTTP_*` settings.
    ///
    /// # Errors
    ///
    /// See [`CatalogClient::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CatalogError> {
        Self::new(
            config.http_timeout_secs,
            &config.http_user_agent,
            config.http_max_retries,
            config.http_retry_backoff_base_secs,
        )
    }

    /// Fetches and normalizes all amenities matching `query`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidBaseUrl`] if `base_url` is not an absolute URL.
    /// - [`CatalogError::RateLimited`] on HTTP 429 after retries run out.
    /// - [`CatalogError::NotFound`] on HTTP 404 (not retried).
    /// - [`CatalogError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`CatalogError::Http`] on network or TLS failure after retries run out.
    /// - [`CatalogError::Deserialize`] if the body is not a JSON array of amenities.
    pub async fn fetch_amenities(
        &self,
        base_url: &str,
        query: &AmenityQuery,
    ) -> Result<Vec<FacilityRecord>, CatalogError> {
        let url = Self::amenities_url(base_url, query)?;
        let domain = url.host_str().unwrap_or(base_url).to_owned();
        let url = url.to_string();

        let amenities = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            let domain = domain.clone();
            async move { self.fetch_once(url, domain).await }
        })
        .await?;

        let fetched = amenities.len();
        let records: Vec<FacilityRecord> = amenities
            .into_iter()
            .filter_map(|dto| match normalize_amenity(dto) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping amenity that failed normalization");
                    None
                }
            })
            .collect();

        tracing::debug!(
            url = %url,
            fetched,
            kept = records.len(),
            "fetched amenities"
        );
        Ok(records)
    }

    async fn fetch_once(
        &self,
        url: String,
        domain: String,
    ) -> Result<Vec<AmenityDto>, CatalogError> {
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(60);
            return Err(CatalogError::RateLimited {
                domain,
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound { url });
        }

        if !status.is_success() {
            return Err(CatalogError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<Vec<AmenityDto>>(&body).map_err(|e| CatalogError::Deserialize {
            context: format!("amenity list from {url}"),
            source: e,
        })
    }

    /// Builds `{base_url}/amenities/` with the query's filters as parameters.
    fn amenities_url(base_url: &str, query: &AmenityQuery) -> Result<reqwest::Url, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason,
        };

        let base = format!("{}/amenities/", base_url.trim_end_matches('/'));
        let mut url = reqwest::Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(category) = query.category {
                pairs.append_pair("amenity_type", category.as_str());
            }
            if let Some(near) = query.near {
                pairs.append_pair("lat", &near.latitude.to_string());
                pairs.append_pair("lon", &near.longitude.to_string());
            }
        }
        // An empty `query_pairs_mut` still leaves a dangling `?`.
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
