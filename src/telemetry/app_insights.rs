use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::error::{ExtractError, Result};

use super::{TelemetryEvent, TelemetryReporter};

pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com/";
const SDK_VERSION: &str = concat!("rust:", env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Application Insights client speaking the `v2/track` ingestion protocol.
///
/// Events are buffered as envelopes by `track` and sent in one request by `flush`.
pub struct AppInsightsClient {
    client: Client,
    track_url: Url,
    instrumentation_key: String,
    buffer: Vec<Value>,
}

impl AppInsightsClient {
    /// Creates a client for the given instrumentation key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the endpoint is
    /// not a valid base URL.
    pub fn new(endpoint: &str, instrumentation_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("checkout-insights/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractError::Config(format!("Failed to create HTTP client: {e}")))?;

        let track_url = Url::parse(endpoint)
            .map_err(|e| ExtractError::Config(format!("Invalid telemetry endpoint: {e}")))?
            .join("v2/track")
            .map_err(|e| ExtractError::Config(format!("Invalid telemetry track URL: {e}")))?;

        Ok(Self {
            client,
            track_url,
            instrumentation_key,
            buffer: Vec::new(),
        })
    }

    fn envelope(&self, event: &TelemetryEvent) -> Value {
        let key_name = self.instrumentation_key.replace('-', "");
        json!({
            "name": format!("Microsoft.ApplicationInsights.{key_name}.Event"),
            "time": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            "iKey": self.instrumentation_key,
            "tags": {
                "ai.internal.sdkVersion": SDK_VERSION,
            },
            "data": {
                "baseType": "EventData",
                "baseData": {
                    "ver": 2,
                    "name": event.name,
                    "properties": event.properties,
                },
            },
        })
    }
}

impl TelemetryReporter for AppInsightsClient {
    async fn track(&mut self, event: TelemetryEvent) -> Result<()> {
        debug!("Tracking event for {}", event.name);
        let envelope = self.envelope(&event);
        self.buffer.push(envelope);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(&mut self.buffer);
        let response = self
            .client
            .post(self.track_url.clone())
            .json(&batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!("Dropping {} telemetry events", batch.len());
            return Err(ExtractError::Telemetry(format!(
                "ingestion endpoint returned {status}: {error_text}"
            )));
        }

        debug!("Flushed {} telemetry events", batch.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use mockito::Matcher;

    fn event() -> TelemetryEvent {
        let mut properties = IndexMap::new();
        properties.insert("repository".to_string(), "org/dep".to_string());
        TelemetryEvent {
            name: "s1".to_string(),
            properties,
        }
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let result = AppInsightsClient::new("not a url", "key".to_string());
        assert!(matches!(result, Err(ExtractError::Config(_))));
    }

    #[test]
    fn test_envelope_shape() {
        let client =
            AppInsightsClient::new(DEFAULT_INGESTION_ENDPOINT, "ab-cd".to_string()).unwrap();
        let envelope = client.envelope(&event());

        assert_eq!(envelope["name"], "Microsoft.ApplicationInsights.abcd.Event");
        assert_eq!(envelope["iKey"], "ab-cd");
        assert_eq!(envelope["data"]["baseType"], "EventData");
        assert_eq!(envelope["data"]["baseData"]["name"], "s1");
        assert_eq!(
            envelope["data"]["baseData"]["properties"]["repository"],
            "org/dep"
        );
    }

    #[tokio::test]
    async fn test_flush_posts_buffered_events() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/track")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Regex(r#""baseType":"EventData""#.to_string()))
            .with_status(200)
            .with_body(r#"{"itemsReceived":1,"itemsAccepted":1,"errors":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let mut client = AppInsightsClient::new(&server.url(), "key".to_string()).unwrap();
        client.track(event()).await.unwrap();
        client.flush().await.unwrap();
        // Nothing left to send.
        client.flush().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_flush_surfaces_rejected_batch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2/track")
            .with_status(400)
            .with_body("invalid instrumentation key")
            .create_async()
            .await;

        let mut client = AppInsightsClient::new(&server.url(), "key".to_string()).unwrap();
        client.track(event()).await.unwrap();
        let err = client.flush().await.unwrap_err();

        assert!(matches!(err, ExtractError::Telemetry(message) if message.contains("400")));
    }
}
