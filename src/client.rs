use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{
    AlertOutcome, AlertRequest, AlertResponse, Prediction, RainfallAnalysis, ServiceBody,
    StationListing, StationRecord, StationSeries,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_BACKOFF_MS: u64 = 60_000;

/// HTTP client for the prediction service and its companion endpoints.
pub struct PredictionClient {
    client: Client,
    config: ApiConfig,
    base_url: String,
}

impl PredictionClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("floodwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Score one station record.
    pub async fn predict(&self, record: &StationRecord) -> Result<Prediction> {
        let url = self.url(&self.config.predict_path);
        debug!("Requesting prediction for {} from {}", record.name, url);

        retry_with_backoff(self.config.retries, || async {
            let response = self.client.post(&url).json(record).send().await?;
            decode(response).await
        })
        .await
    }

    pub async fn list_stations(&self) -> Result<StationListing> {
        let listing: StationListing = self.get_json(&self.config.stations_path).await?;
        info!("Found {} stations", listing.len());
        Ok(listing)
    }

    /// Rainfall and flood aggregates used by the chart panels.
    pub async fn analysis(&self) -> Result<RainfallAnalysis> {
        self.get_json(&self.config.analysis_path).await
    }

    pub async fn station_series(&self, station: &str) -> Result<StationSeries> {
        let station = station.trim();
        if station.is_empty() {
            return Err(AppError::InvalidData(
                "Station name cannot be empty".to_string(),
            ));
        }

        let mut url = url::Url::parse(&self.url(&self.config.series_path))
            .map_err(|e| AppError::InvalidData(format!("Invalid series URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidData("Series URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(station);

        debug!("Fetching series for {} from {}", station, url);
        retry_with_backoff(self.config.retries, || async {
            let response = self.client.get(url.clone()).send().await?;
            decode(response).await
        })
        .await
    }

    pub async fn send_alert(&self, message: &str) -> Result<AlertOutcome> {
        let url = self.url(&self.config.alert_path);

        let response: AlertResponse = retry_with_backoff(self.config.retries, || async {
            let response = self
                .client
                .post(&url)
                .json(&AlertRequest { message })
                .send()
                .await?;
            decode(response).await
        })
        .await?;

        if response.status == "success" {
            info!("Alert delivered");
            Ok(AlertOutcome::Delivered)
        } else {
            warn!("Alert endpoint answered with status '{}'", response.status);
            Ok(AlertOutcome::Rejected(response.status))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("Fetching {}", url);

        retry_with_backoff(self.config.retries, || async {
            let response = self.client.get(&url).send().await?;
            decode(response).await
        })
        .await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = response.error_for_status()?;
    let bytes = response.bytes().await?;
    let body: ServiceBody<T> = serde_json::from_slice(&bytes)?;
    body.into_result()
}

/// Retry a future with exponential backoff
pub(crate) async fn retry_with_backoff<F, Fut, T>(max_retries: u32, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                retries += 1;

                if retries > max_retries {
                    return Err(e);
                }

                // Check if error is transient (retryable)
                let should_retry = match &e {
                    AppError::Http(reqwest_err) => {
                        // Retry on connection errors, timeouts, server errors (5xx)
                        reqwest_err.is_timeout()
                            || reqwest_err.is_connect()
                            || reqwest_err
                                .status()
                                .map(|s| s.is_server_error())
                                .unwrap_or(false)
                    }
                    AppError::Io(_) => true,
                    _ => false,
                };

                if !should_retry {
                    return Err(e);
                }

                let delay = backoff_delay(retries);
                warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                    retries,
                    max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// 250ms doubling per attempt, capped at one minute.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(250u64.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_stops_on_non_transient_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Prediction("model not loaded".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(0, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Io(std::io::Error::other("reset")))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(2, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(AppError::Io(std::io::Error::other("reset")))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_delay_doubles_and_saturates() {
        assert_eq!(backoff_delay(1), Duration::from_millis(250));
        assert_eq!(backoff_delay(3), Duration::from_millis(1000));
        assert_eq!(backoff_delay(57), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let config = ApiConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..ApiConfig::default()
        };
        let client = PredictionClient::new(&config).unwrap();
        assert_eq!(client.url("/predict"), "http://localhost:8000/predict");
    }
}
