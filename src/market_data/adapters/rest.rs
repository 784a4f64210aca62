// Shared REST plumbing: one pooled client, one GET per adapter per cycle.

use std::time::Duration;

use reqwest::Client;
use tracing::trace;

use crate::error::AdapterError;

/// Client shared by every adapter. The timeout bounds each exchange's request.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(user_agent)
        .gzip(true)
        .build()
}

#[derive(Debug, Clone)]
pub struct RestEndpoint {
    client: Client,
    url: String,
}

impl RestEndpoint {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    pub async fn get_text(&self) -> Result<String, AdapterError> {
        trace!(url = %self.url, "GET");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status(status));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::adapters::testing::{refused_url, spawn_ticker_server};
    use axum::http::StatusCode;

    fn client() -> Client {
        build_client(Duration::from_secs(5), "arbx-test").unwrap()
    }

    #[tokio::test]
    async fn test_get_text_ok() {
        let url = spawn_ticker_server(StatusCode::OK, r#"[{"symbol":"BTCUSDT","price":"1"}]"#).await;
        let body = RestEndpoint::new(client(), url).get_text().await.unwrap();
        assert_eq!(body, r#"[{"symbol":"BTCUSDT","price":"1"}]"#);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let url = spawn_ticker_server(StatusCode::TOO_MANY_REQUESTS, "slow down").await;
        let err = RestEndpoint::new(client(), url).get_text().await.unwrap_err();
        assert!(matches!(err, AdapterError::Status(s) if s == StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() {
        let err = RestEndpoint::new(client(), refused_url().await).get_text().await.unwrap_err();
        assert!(matches!(err, AdapterError::Http(_)));
    }
}
