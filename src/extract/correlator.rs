use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtractError, Result};
use crate::insights::CheckoutMetric;

use super::job_context::JobContext;
use super::timestamp::duration_seconds;

pub const CHECKOUT_ACTION: &str = "actions/checkout";

/// Step telemetry published by the worker when a step finishes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    pub action: String,
    pub step_id: String,
    pub start_time: String,
    pub finish_time: String,
}

/// Matches checkout action events against the steps of a job.
pub struct Correlator<'a> {
    context: &'a JobContext,
}

impl<'a> Correlator<'a> {
    pub fn new(context: &'a JobContext) -> Self {
        Self { context }
    }

    /// Builds the metric for one fragment.
    ///
    /// Returns `None` when the fragment is not a checkout action.
    pub fn correlate(&self, fragment: &Value) -> Option<Result<CheckoutMetric>> {
        if fragment.get("action").and_then(Value::as_str) != Some(CHECKOUT_ACTION) {
            return None;
        }

        Some(
            ActionEvent::deserialize(fragment)
                .map_err(ExtractError::from)
                .and_then(|event| self.build_metric(&event)),
        )
    }

    /// Correlates every checkout action in `fragments`, keeping one result per action.
    pub fn correlate_all(&self, fragments: &[Value]) -> Vec<Result<CheckoutMetric>> {
        fragments
            .iter()
            .filter_map(|fragment| self.correlate(fragment))
            .collect()
    }

    fn build_metric(&self, event: &ActionEvent) -> Result<CheckoutMetric> {
        info!("Processing {}", event.step_id);

        let step = self
            .context
            .step(&event.step_id)
            .ok_or_else(|| ExtractError::UnknownStep {
                step_id: event.step_id.clone(),
            })?;

        let (repository, parameters) = match step.repository_input() {
            Some(pair) => {
                let repository =
                    pair.value
                        .clone()
                        .ok_or_else(|| ExtractError::MalformedRepository {
                            step_id: step.id.clone(),
                        })?;
                (repository, step.literal_inputs())
            }
            None => (self.context.main_repository.clone(), vec![]),
        };

        debug!("Action {} checks out {}", step.name, repository);

        let duration = duration_seconds(&event.start_time, &event.finish_time)?;

        Ok(CheckoutMetric {
            step_id: event.step_id.clone(),
            start_time: event.start_time.clone(),
            finish_time: event.finish_time.clone(),
            duration,
            repository,
            parameters,
        })
    }
}
