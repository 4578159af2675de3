use log::info;

use crate::error::Result;

use super::{TelemetryEvent, TelemetryReporter};

/// Reporter that only logs events. Used when no telemetry key is configured.
#[derive(Debug, Default)]
pub struct DryRunReporter {
    pending: Vec<TelemetryEvent>,
    delivered: Vec<TelemetryEvent>,
}

impl DryRunReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events that went through a flush.
    pub fn delivered(&self) -> &[TelemetryEvent] {
        &self.delivered
    }
}

impl TelemetryReporter for DryRunReporter {
    async fn track(&mut self, event: TelemetryEvent) -> Result<()> {
        self.pending.push(event);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        for event in self.pending.drain(..) {
            info!("[dry-run] event {}: {:?}", event.name, event.properties);
            self.delivered.push(event);
        }
        Ok(())
    }
}
