//! HTTP dataset fetching.
//!
//! Fetches the ride list and the yearly count series from a static host.
//! An unreachable host or a non-2xx answer means the dataset cannot be
//! loaded, so both are reported as [`RideMapError::DataLoad`] and never
//! retried. [`RideMapError::Http`] is left for client setup failures.

use std::time::{Duration, Instant};

use log::{info, warn};
use reqwest::{Client, StatusCode};

use crate::error::{RideMapError, Result};
use crate::loader::{parse_daily_counts, parse_rides_json};
use crate::{DailyCount, RideRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a session needs before it can start.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub rides: Vec<RideRecord>,
    pub counts: Vec<DailyCount>,
}

fn status_error(status: StatusCode, url: &str) -> RideMapError {
    RideMapError::data_load(format!("GET {} returned {}", url, status))
}

fn transport_error(e: reqwest::Error, url: &str) -> RideMapError {
    match e.status() {
        Some(status) => {
            RideMapError::data_load(format!("GET {} failed ({}): {}", url, status, e))
        }
        None => RideMapError::data_load(format!("GET {} failed: {}", url, e)),
    }
}

/// Dataset fetcher over a pooled reqwest client.
pub struct DatasetFetcher {
    client: Client,
}

impl DatasetFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RideMapError::Http {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;
        Ok(Self { client })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            warn!("[DatasetFetcher] {} returned {}", url, status);
            return Err(status_error(status, url));
        }

        let body = response.text().await.map_err(|e| transport_error(e, url))?;
        info!(
            "[DatasetFetcher] Fetched {} ({} bytes) in {:.2}s",
            url,
            body.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(body)
    }

    /// Fetch and parse a ride list JSON document.
    pub async fn fetch_rides(&self, url: &str) -> Result<Vec<RideRecord>> {
        let body = self.fetch_text(url).await?;
        parse_rides_json(&body)
    }

    /// Fetch and parse a yearly count CSV document.
    pub async fn fetch_daily_counts(&self, url: &str) -> Result<Vec<DailyCount>> {
        let body = self.fetch_text(url).await?;
        parse_daily_counts(&body)
    }

    /// Fetch both documents concurrently. Fails if either fails.
    pub async fn fetch_dataset(&self, rides_url: &str, counts_url: &str) -> Result<Dataset> {
        let (rides, counts) = futures::try_join!(
            self.fetch_rides(rides_url),
            self.fetch_daily_counts(counts_url)
        )?;
        Ok(Dataset { rides, counts })
    }
}

/// Blocking ride list fetch for hosts without an async runtime.
pub fn fetch_rides_blocking(url: &str) -> Result<Vec<RideRecord>> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| RideMapError::Internal {
        message: format!("Failed to create tokio runtime: {}", e),
    })?;
    let fetcher = DatasetFetcher::new()?;
    rt.block_on(fetcher.fetch_rides(url))
}
