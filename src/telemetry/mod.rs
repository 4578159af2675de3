mod app_insights;
mod dry_run;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Result;
use crate::insights::CheckoutMetric;

pub use app_insights::AppInsightsClient;
pub use dry_run::DryRunReporter;

pub fn app_insights_default_endpoint() -> String {
    app_insights::DEFAULT_INGESTION_ENDPOINT.to_string()
}

/// A named custom event with string properties, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub properties: IndexMap<String, String>,
}

impl TelemetryEvent {
    /// One event per checkout step, named after the step id.
    pub fn from_metric(metric: &CheckoutMetric) -> Result<Self> {
        let mut properties = IndexMap::new();
        properties.insert("startTime".to_string(), metric.start_time.clone());
        properties.insert("finishTime".to_string(), metric.finish_time.clone());
        properties.insert("duration".to_string(), metric.duration.to_string());
        properties.insert("repository".to_string(), metric.repository.clone());
        properties.insert("parameters".to_string(), metric.parameters_json()?);

        Ok(Self {
            name: metric.step_id.clone(),
            properties,
        })
    }
}

/// Sink for checkout metrics.
///
/// `track` may buffer; nothing is guaranteed to be delivered before `flush`.
#[allow(async_fn_in_trait)]
pub trait TelemetryReporter {
    async fn track(&mut self, event: TelemetryEvent) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;

    /// Tracks one metric and flushes it before returning.
    async fn report(&mut self, metric: &CheckoutMetric) -> Result<()> {
        let event = TelemetryEvent::from_metric(metric)?;
        self.track(event).await?;
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_metric() {
        let metric = CheckoutMetric {
            step_id: "s1".to_string(),
            start_time: "2024-01-01T00:00:00.1234567Z".to_string(),
            finish_time: "2024-01-01T00:00:05.1234567Z".to_string(),
            duration: 5.0,
            repository: "org/dep".to_string(),
            parameters: vec![("repository".to_string(), "org/dep".to_string())],
        };

        let event = TelemetryEvent::from_metric(&metric).unwrap();
        assert_eq!(event.name, "s1");
        assert_eq!(
            event.properties.keys().collect::<Vec<_>>(),
            vec!["startTime", "finishTime", "duration", "repository", "parameters"]
        );
        assert_eq!(event.properties["duration"], "5");
        assert_eq!(event.properties["parameters"], r#"[["repository","org/dep"]]"#);
    }
}
