use std::fmt;
use std::sync::Arc;

use crate::cleaning::{CleaningReport, DatasetKind};
use crate::error::{ErrorKind, EtlError};
use crate::types::SourceKind;

use super::Stage;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (one dataset failed).
    Error,
    /// Critical error (the warehouse or a source's infrastructure failed).
    Critical,
}

/// Which dataset a callback concerns.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub kind: DatasetKind,
    pub source: SourceKind,
    /// Target warehouse table.
    pub table: &'static str,
}

/// Observer interface for pipeline progress.
///
/// Implementors can record metrics, logs, or trigger alerts. All methods have no-op
/// defaults.
pub trait PipelineObserver: Send + Sync {
    fn on_extracted(&self, _ctx: &PipelineContext, _rows: usize) {}

    fn on_cleaned(&self, _ctx: &PipelineContext, _report: &CleaningReport) {}

    fn on_persisted(&self, _ctx: &PipelineContext, _rows: usize) {}

    /// Called when a dataset fails at `stage`.
    fn on_failure(
        &self,
        _ctx: &PipelineContext,
        _stage: Stage,
        _severity: Severity,
        _error: &EtlError,
    ) {
    }

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &PipelineContext, stage: Stage, severity: Severity, error: &EtlError) {
        self.on_failure(ctx, stage, severity, error)
    }
}

/// Fans callbacks out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_extracted(&self, ctx: &PipelineContext, rows: usize) {
        for o in &self.observers {
            o.on_extracted(ctx, rows);
        }
    }

    fn on_cleaned(&self, ctx: &PipelineContext, report: &CleaningReport) {
        for o in &self.observers {
            o.on_cleaned(ctx, report);
        }
    }

    fn on_persisted(&self, ctx: &PipelineContext, rows: usize) {
        for o in &self.observers {
            o.on_persisted(ctx, rows);
        }
    }

    fn on_failure(
        &self,
        ctx: &PipelineContext,
        stage: Stage,
        severity: Severity,
        error: &EtlError,
    ) {
        for o in &self.observers {
            o.on_failure(ctx, stage, severity, error);
        }
    }

    fn on_alert(&self, ctx: &PipelineContext, stage: Stage, severity: Severity, error: &EtlError) {
        for o in &self.observers {
            o.on_alert(ctx, stage, severity, error);
        }
    }
}

/// Emits pipeline events as `tracing` events. Used when no observer is configured.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_extracted(&self, ctx: &PipelineContext, rows: usize) {
        tracing::info!(dataset = %ctx.kind, source = %ctx.source, rows, "extracted");
    }

    fn on_cleaned(&self, ctx: &PipelineContext, report: &CleaningReport) {
        for record in report.drops.records() {
            tracing::warn!(
                dataset = %ctx.kind,
                step = %record.step,
                rows = record.rows,
                "dropped rows"
            );
            for sample in &record.samples {
                tracing::debug!(dataset = %ctx.kind, step = %record.step, %sample, "drop sample");
            }
        }
    }

    fn on_persisted(&self, ctx: &PipelineContext, rows: usize) {
        tracing::info!(dataset = %ctx.kind, table = ctx.table, rows, "loaded");
    }

    fn on_failure(
        &self,
        ctx: &PipelineContext,
        stage: Stage,
        severity: Severity,
        error: &EtlError,
    ) {
        tracing::warn!(
            dataset = %ctx.kind,
            %stage,
            ?severity,
            error = %error,
            "dataset failed"
        );
    }

    fn on_alert(&self, ctx: &PipelineContext, stage: Stage, severity: Severity, error: &EtlError) {
        tracing::error!(
            dataset = %ctx.kind,
            table = ctx.table,
            %stage,
            ?severity,
            error = %error,
            "ALERT: dataset failed"
        );
    }
}

/// Severity of a dataset failure.
///
/// Warehouse failures and unreachable sources are infrastructure problems; bad payloads
/// and configuration mistakes affect a single dataset.
pub fn severity_for_error(error: &EtlError) -> Severity {
    match error.kind() {
        ErrorKind::SinkWrite => Severity::Critical,
        ErrorKind::SourceUnavailable => match error {
            EtlError::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        ErrorKind::SourceFormat | ErrorKind::Config => Severity::Error,
    }
}
