//! Orchestration: extract, clean and persist each dataset.
//!
//! A [`Pipeline`] runs a list of [`Job`]s in order. Each job is isolated: a failure at
//! any [`Stage`] ends that job only, and the [`FailurePolicy`] decides whether the
//! remaining jobs still run. The [`RunSummary`] reports every dataset's outcome.
//!
//! A [`PipelineObserver`] receives progress callbacks. Failures whose [`Severity`] meets
//! the alert threshold are also sent to [`PipelineObserver::on_alert`].

pub mod observer;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cleaning::DatasetKind;
use crate::config::PipelineConfig;
use crate::error::{ErrorKind, EtlError};
use crate::extraction::{Extractor, PaginatedEndpoint, SourceSpec};
use crate::sink::WarehouseSink;

pub use observer::{
    CompositeObserver, PipelineContext, PipelineObserver, Severity, TracingObserver,
    severity_for_error,
};

/// What to do with the remaining datasets after one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep going; the failure is reported in the summary.
    #[default]
    Continue,
    /// Skip every remaining dataset.
    Abort,
}

/// One dataset to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub kind: DatasetKind,
    pub source: SourceSpec,
}

/// The six warehouse datasets with the sources named in `config`, in load order.
pub fn standard_jobs(config: &PipelineConfig) -> Vec<Job> {
    DatasetKind::ALL
        .into_iter()
        .map(|kind| {
            let source = match kind {
                DatasetKind::Users => SourceSpec::Table {
                    table: config.users_table.clone(),
                },
                DatasetKind::CardDetails => SourceSpec::Pdf {
                    locator: config.card_details_pdf.clone(),
                },
                DatasetKind::StoreDetails => SourceSpec::PaginatedApi(PaginatedEndpoint {
                    count_url: config.stores_count_url.clone(),
                    record_url: config.store_record_url.clone(),
                    count_field: config.store_count_field.clone(),
                }),
                DatasetKind::Products => SourceSpec::Object {
                    uri: config.products_object.clone(),
                },
                DatasetKind::Orders => SourceSpec::Table {
                    table: config.orders_table.clone(),
                },
                DatasetKind::DateEvents => SourceSpec::JsonUrl {
                    url: config.date_events_url.clone(),
                },
            };
            Job { kind, source }
        })
        .collect()
}

/// Where in a job a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Clean,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Clean => "clean",
            Stage::Persist => "persist",
        })
    }
}

/// A failed job.
#[derive(Debug)]
pub struct JobFailure {
    pub stage: Stage,
    pub error: EtlError,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for JobFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Row counts of a loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub extracted: usize,
    pub dropped: usize,
    pub persisted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetStatus {
    Loaded(LoadStats),
    Failed {
        stage: Stage,
        kind: ErrorKind,
        reason: String,
    },
    /// Not attempted because an earlier dataset failed under [`FailurePolicy::Abort`].
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOutcome {
    pub kind: DatasetKind,
    pub table: &'static str,
    pub status: DatasetStatus,
}

/// Outcome of every job of a run, in job order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub outcomes: Vec<DatasetOutcome>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| !matches!(o.status, DatasetStatus::Loaded(_)))
    }

    pub fn outcome(&self, kind: DatasetKind) -> Option<&DatasetOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }

    pub fn loaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DatasetStatus::Loaded(_)))
            .count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<14} {:<18} {:>10} {:>8} {:>10}  status",
            "dataset", "table", "extracted", "dropped", "persisted"
        )?;
        for o in &self.outcomes {
            match &o.status {
                DatasetStatus::Loaded(s) => writeln!(
                    f,
                    "{:<14} {:<18} {:>10} {:>8} {:>10}  ok",
                    o.kind.name(),
                    o.table,
                    s.extracted,
                    s.dropped,
                    s.persisted
                )?,
                DatasetStatus::Failed { stage, reason, .. } => writeln!(
                    f,
                    "{:<14} {:<18} {:>10} {:>8} {:>10}  FAILED at {stage}: {reason}",
                    o.kind.name(),
                    o.table,
                    "-",
                    "-",
                    "-"
                )?,
                DatasetStatus::Skipped => writeln!(
                    f,
                    "{:<14} {:<18} {:>10} {:>8} {:>10}  skipped",
                    o.kind.name(),
                    o.table,
                    "-",
                    "-",
                    "-"
                )?,
            }
        }
        Ok(())
    }
}

/// Runs jobs against injected sources and a warehouse sink.
pub struct Pipeline<'a> {
    extractor: Extractor<'a>,
    sink: &'a mut dyn WarehouseSink,
    observer: Arc<dyn PipelineObserver>,
    policy: FailurePolicy,
    alert_at_or_above: Severity,
}

impl<'a> Pipeline<'a> {
    /// Pipeline with the tracing observer, [`FailurePolicy::Continue`] and alerts for
    /// critical failures.
    pub fn new(extractor: Extractor<'a>, sink: &'a mut dyn WarehouseSink) -> Self {
        Self {
            extractor,
            sink,
            observer: Arc::new(TracingObserver),
            policy: FailurePolicy::Continue,
            alert_at_or_above: Severity::Critical,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_alert_threshold(mut self, severity: Severity) -> Self {
        self.alert_at_or_above = severity;
        self
    }

    /// Run every job in order and summarize.
    pub fn run(&mut self, jobs: &[Job]) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut aborted = false;
        for job in jobs {
            let table = job.kind.table_name();
            if aborted {
                summary.outcomes.push(DatasetOutcome {
                    kind: job.kind,
                    table,
                    status: DatasetStatus::Skipped,
                });
                continue;
            }
            let status = match self.run_job(job) {
                Ok(stats) => DatasetStatus::Loaded(stats),
                Err(failure) => {
                    if self.policy == FailurePolicy::Abort {
                        tracing::error!(dataset = %job.kind, "aborting run after failed dataset");
                        aborted = true;
                    }
                    DatasetStatus::Failed {
                        stage: failure.stage,
                        kind: failure.error.kind(),
                        reason: failure.error.to_string(),
                    }
                }
            };
            summary.outcomes.push(DatasetOutcome {
                kind: job.kind,
                table,
                status,
            });
        }
        tracing::info!(
            datasets = summary.outcomes.len(),
            loaded = summary.loaded(),
            "run finished"
        );
        summary
    }

    /// Extract, clean and persist one dataset.
    pub fn run_job(&mut self, job: &Job) -> Result<LoadStats, JobFailure> {
        let span = tracing::info_span!("dataset", kind = %job.kind);
        let _enter = span.enter();

        let ctx = PipelineContext {
            kind: job.kind,
            source: job.source.kind(),
            table: job.kind.table_name(),
        };
        tracing::info!(source = %job.source, "starting");

        let raw = self
            .extractor
            .extract(&job.source)
            .map_err(|e| self.fail(&ctx, Stage::Extract, e))?;
        let extracted = raw.row_count();
        self.observer.on_extracted(&ctx, extracted);

        let cleaned = job.kind.clean(raw).map_err(|e| self.fail(&ctx, Stage::Clean, e))?;
        self.observer.on_cleaned(&ctx, &cleaned.report);
        let dropped = cleaned.report.rows_dropped();

        let persisted = self
            .sink
            .persist(cleaned.dataset, ctx.table)
            .map_err(|e| self.fail(&ctx, Stage::Persist, e))?;
        self.observer.on_persisted(&ctx, persisted);

        Ok(LoadStats {
            extracted,
            dropped,
            persisted,
        })
    }

    fn fail(&self, ctx: &PipelineContext, stage: Stage, error: EtlError) -> JobFailure {
        let severity = severity_for_error(&error);
        self.observer.on_failure(ctx, stage, severity, &error);
        if severity >= self.alert_at_or_above {
            self.observer.on_alert(ctx, stage, severity, &error);
        }
        JobFailure { stage, error }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use super::*;
    use crate::config::CredentialStore;
    use crate::error::EtlResult;
    use crate::extraction::http::{HttpClient, HttpResponse};
    use crate::extraction::rds::SqliteTableSource;
    use crate::extraction::storage::{ObjectLocator, ObjectStorage};
    use crate::types::DataSet;

    struct NotFoundHttp;

    impl HttpClient for NotFoundHttp {
        fn get(&self, _url: &str, _headers: &[(String, String)]) -> EtlResult<HttpResponse> {
            Ok(HttpResponse {
                status: 404,
                body: Vec::new(),
            })
        }
    }

    struct NoObjects;

    impl ObjectStorage for NoObjects {
        fn get_object(&self, locator: &ObjectLocator) -> EtlResult<Vec<u8>> {
            Err(EtlError::unavailable(locator.to_string(), "object not found"))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        tables: HashMap<String, DataSet>,
        reject: Option<&'static str>,
    }

    impl WarehouseSink for MemorySink {
        fn persist(&mut self, dataset: DataSet, table: &str) -> EtlResult<usize> {
            if self.reject == Some(table) {
                return Err(EtlError::sink(table, "read-only warehouse"));
            }
            let rows = dataset.row_count();
            self.tables.insert(table.to_string(), dataset);
            Ok(rows)
        }
    }

    #[derive(Default)]
    struct Alerts(Mutex<Vec<(DatasetKind, Stage)>>);

    impl PipelineObserver for Alerts {
        fn on_alert(
            &self,
            ctx: &PipelineContext,
            stage: Stage,
            _severity: Severity,
            _error: &EtlError,
        ) {
            self.0.lock().unwrap().push((ctx.kind, stage));
        }
    }

    fn legacy_orders() -> SqliteTableSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE orders_table (
                level_0 INTEGER, date_uuid TEXT, user_uuid TEXT, card_number INTEGER,
                store_code TEXT, product_code TEXT, product_quantity INTEGER
            );
            INSERT INTO orders_table VALUES
                (0, '9476f17e-5d6a-4117-874d-9cdb38ca1a5e', '93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8',
                 4971858637664481, 'BL-8387506C', 'R7-3126933H', 3),
                (1, 'not-a-uuid', '93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8',
                 4971858637664481, 'BL-8387506C', 'R7-3126933H', 1);",
        )
        .unwrap();
        SqliteTableSource::from_connection(conn)
    }

    fn jobs() -> Vec<Job> {
        vec![
            Job {
                kind: DatasetKind::DateEvents,
                source: SourceSpec::JsonUrl {
                    url: "https://example.invalid/date_details.json".into(),
                },
            },
            Job {
                kind: DatasetKind::Orders,
                source: SourceSpec::Table {
                    table: "orders_table".into(),
                },
            },
        ]
    }

    #[test]
    fn failed_dataset_does_not_stop_the_others() {
        let tables = legacy_orders();
        let creds = CredentialStore::default();
        let extractor = Extractor {
            tables: &tables,
            http: &NotFoundHttp,
            objects: &NoObjects,
            credentials: &creds,
        };
        let mut sink = MemorySink::default();
        let summary = Pipeline::new(extractor, &mut sink).run(&jobs());

        assert!(summary.has_failures());
        assert!(matches!(
            summary.outcome(DatasetKind::DateEvents).unwrap().status,
            DatasetStatus::Failed {
                stage: Stage::Extract,
                ..
            }
        ));
        assert_eq!(
            summary.outcome(DatasetKind::Orders).unwrap().status,
            DatasetStatus::Loaded(LoadStats {
                extracted: 2,
                dropped: 1,
                persisted: 1
            })
        );
        assert_eq!(sink.tables["orders_table"].row_count(), 1);
    }

    #[test]
    fn abort_policy_skips_remaining_datasets() {
        let tables = legacy_orders();
        let creds = CredentialStore::default();
        let extractor = Extractor {
            tables: &tables,
            http: &NotFoundHttp,
            objects: &NoObjects,
            credentials: &creds,
        };
        let mut sink = MemorySink::default();
        let summary = Pipeline::new(extractor, &mut sink)
            .with_policy(FailurePolicy::Abort)
            .run(&jobs());

        assert_eq!(
            summary.outcome(DatasetKind::Orders).unwrap().status,
            DatasetStatus::Skipped
        );
        assert!(sink.tables.is_empty());
        assert!(summary.to_string().contains("skipped"));
    }

    #[test]
    fn sink_failures_raise_alerts() {
        let tables = legacy_orders();
        let creds = CredentialStore::default();
        let extractor = Extractor {
            tables: &tables,
            http: &NotFoundHttp,
            objects: &NoObjects,
            credentials: &creds,
        };
        let mut sink = MemorySink {
            reject: Some("orders_table"),
            ..MemorySink::default()
        };
        let alerts = Arc::new(Alerts::default());
        let summary = Pipeline::new(extractor, &mut sink)
            .with_observer(alerts.clone())
            .run(&jobs());

        assert!(matches!(
            summary.outcome(DatasetKind::Orders).unwrap().status,
            DatasetStatus::Failed {
                stage: Stage::Persist,
                kind: ErrorKind::SinkWrite,
                ..
            }
        ));
        // The 404 on the JSON source is below the default alert threshold.
        assert_eq!(*alerts.0.lock().unwrap(), vec![(DatasetKind::Orders, Stage::Persist)]);
    }

    #[test]
    fn standard_jobs_cover_every_kind() {
        let jobs = standard_jobs(&PipelineConfig::default());
        let kinds: Vec<DatasetKind> = jobs.iter().map(|j| j.kind).collect();
        assert_eq!(kinds, DatasetKind::ALL.to_vec());
        assert_eq!(
            jobs[3].source,
            SourceSpec::Object {
                uri: "s3://data-handling-public/products.csv".into()
            }
        );
    }

    #[test]
    fn unconfigured_store_api_is_a_config_failure() {
        let tables = legacy_orders();
        let creds = CredentialStore::default();
        let extractor = Extractor {
            tables: &tables,
            http: &NotFoundHttp,
            objects: &NoObjects,
            credentials: &creds,
        };
        let mut sink = MemorySink::default();
        let store_job = standard_jobs(&PipelineConfig::default())
            .into_iter()
            .find(|j| j.kind == DatasetKind::StoreDetails)
            .unwrap();
        let failure = Pipeline::new(extractor, &mut sink).run_job(&store_job).unwrap_err();
        assert_eq!(failure.stage, Stage::Extract);
        assert_eq!(failure.error.kind(), ErrorKind::Config);
    }
}
