//! Orchestrator telemetry
//!
//! The orchestrator reports every attempt to a [`TelemetryChain`]. Sinks
//! are fire-and-forget: a failing sink is logged and never affects the
//! request.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firewatch_core::DataSource;
use uuid::Uuid;

/// One observation emitted while resolving a request.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A tier is about to be attempted.
    AttemptStart { source: DataSource },
    /// A tier finished, successfully or not.
    AttemptEnd {
        source: DataSource,
        success: bool,
        elapsed: Duration,
    },
    /// Ordinal of the tier being attempted (0 EFFIS, 1 SEPA, 2 cache, 3 mock).
    FallbackDepth { depth: u8 },
    /// The request resolved from `source`. Emitted exactly once per request.
    Complete { source: DataSource },
}

/// A [`TelemetryEvent`] tagged with its request.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub request_id: Uuid,
    pub at: DateTime<Utc>,
    pub event: TelemetryEvent,
}

/// Sink failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("telemetry sink {sink} failed: {reason}")]
pub struct TelemetryError {
    pub sink: String,
    pub reason: String,
}

/// Receiver of telemetry records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record(&self, record: TelemetryRecord) -> Result<(), TelemetryError>;
}

/// Chain of telemetry sinks.
#[derive(Clone, Default)]
pub struct TelemetryChain {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl TelemetryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn emit(&self, record: TelemetryRecord) {
        for (idx, sink) in self.sinks.iter().enumerate() {
            if let Err(e) = sink.record(record.clone()).await {
                tracing::warn!(
                    sink_index = idx,
                    error = %e,
                    "Telemetry sink failed"
                );
            }
        }
    }
}

/// Forwards telemetry to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

#[async_trait]
impl TelemetrySink for TracingTelemetry {
    async fn record(&self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        let request_id = record.request_id;
        match record.event {
            TelemetryEvent::AttemptStart { source } => {
                tracing::debug!(request_id = %request_id, source = %source, "Attempt started");
            }
            TelemetryEvent::AttemptEnd {
                source,
                success,
                elapsed,
            } => {
                tracing::debug!(
                    request_id = %request_id,
                    source = %source,
                    success,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Attempt finished"
                );
            }
            TelemetryEvent::FallbackDepth { depth } => {
                tracing::debug!(request_id = %request_id, depth, "Fallback depth");
            }
            TelemetryEvent::Complete { source } => {
                tracing::info!(request_id = %request_id, source = %source, "Fire risk resolved");
            }
        }
        Ok(())
    }
}

/// Collects records in memory for inspection.
#[derive(Debug, Default)]
pub struct InMemoryTelemetry {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl InMemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.records().into_iter().map(|r| r.event).collect()
    }

    /// Fallback depths in emission order.
    pub fn depths(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TelemetryEvent::FallbackDepth { depth } => Some(depth),
                _ => None,
            })
            .collect()
    }

    /// Sources of every `AttemptStart`, in order.
    pub fn attempted(&self) -> Vec<DataSource> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TelemetryEvent::AttemptStart { source } => Some(source),
                _ => None,
            })
            .collect()
    }

    /// Sources of every `Complete`, in order.
    pub fn completions(&self) -> Vec<DataSource> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TelemetryEvent::Complete { source } => Some(source),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

#[async_trait]
impl TelemetrySink for InMemoryTelemetry {
    async fn record(&self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        let mut records = self.records.lock().map_err(|_| TelemetryError {
            sink: "in-memory".to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        records.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSink;

    #[async_trait]
    impl TelemetrySink for BrokenSink {
        async fn record(&self, _record: TelemetryRecord) -> Result<(), TelemetryError> {
            Err(TelemetryError {
                sink: "broken".to_string(),
                reason: "always fails".to_string(),
            })
        }
    }

    fn record(event: TelemetryEvent) -> TelemetryRecord {
        TelemetryRecord {
            request_id: Uuid::now_v7(),
            at: Utc::now(),
            event,
        }
    }

    #[tokio::test]
    async fn test_broken_sink_does_not_block_later_sinks() {
        let memory = Arc::new(InMemoryTelemetry::new());
        let mut chain = TelemetryChain::new();
        chain.add(Arc::new(BrokenSink));
        chain.add(memory.clone());
        chain.add(Arc::new(TracingTelemetry));
        assert_eq!(chain.len(), 3);

        chain
            .emit(record(TelemetryEvent::FallbackDepth { depth: 2 }))
            .await;
        chain
            .emit(record(TelemetryEvent::Complete {
                source: DataSource::Cache,
            }))
            .await;

        assert_eq!(memory.depths(), vec![2]);
        assert_eq!(memory.completions(), vec![DataSource::Cache]);

        memory.clear();
        assert!(memory.records().is_empty());
    }
}
