//! Snapshot fetch over HTTP.
//!
//! A single `GET {api}/stocks`; an empty or `null` body is an empty set.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::application::ports::{SnapshotSource, SourceError, StockBatch};
use crate::infrastructure::config::TableConfig;
use crate::infrastructure::payload::decode_batch_str;

/// One-shot snapshot fetcher.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    url: String,
}

impl HttpSnapshotSource {
    /// Create a fetcher for `url` with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Create a fetcher from the service configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &TableConfig) -> Result<Self, SourceError> {
        Self::new(config.snapshot_url(), config.sources.request_timeout)
    }

    /// Endpoint this fetcher requests.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<StockBatch, SourceError> {
        tracing::debug!(url = %self.url, "Fetching snapshot");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(decode_batch_str(&text, "snapshot"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn source_for(server: &MockServer) -> HttpSnapshotSource {
        HttpSnapshotSource::new(format!("{}/stocks", server.uri()), Duration::from_secs(2))
            .unwrap()
    }

    #[tokio::test]
    async fn fetches_record_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stocks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "1",
                    "symbol": "AAA",
                    "name": "Alpha",
                    "currentPrice": 100.0,
                    "closingPrice": 90.0,
                    "url": "u"
                },
                {
                    "id": "2",
                    "symbol": "BBB",
                    "name": "Beta",
                    "currentPrice": 50.0,
                    "closingPrice": 60.0,
                    "url": "u"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let batch = source_for(&server).await.fetch().await.unwrap().unwrap();
        let symbols: Vec<_> = batch.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, ["AAA", "BBB"]);
    }

    #[tokio::test]
    async fn null_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stocks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        assert_eq!(source_for(&server).await.fetch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stocks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = source_for(&server).await;
        let err = source.fetch().await.unwrap_err();
        assert_eq!(
            err,
            SourceError::Status {
                status: 500,
                url: source.url().to_string(),
            }
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let source =
            HttpSnapshotSource::new("http://127.0.0.1:1/stocks", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(SourceError::Transport(_))
        ));
    }
}
