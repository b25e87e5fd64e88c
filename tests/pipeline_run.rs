mod common;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use retail_etl::cleaning::DatasetKind;
use retail_etl::config::{CredentialScope, CredentialStore, Credentials, PipelineConfig};
use retail_etl::error::{ErrorKind, EtlError};
use retail_etl::extraction::{Extractor, SqliteTableSource};
use retail_etl::pipeline::{
    DatasetStatus, FailurePolicy, LoadStats, Pipeline, PipelineContext, PipelineObserver,
    Severity, Stage, standard_jobs,
};
use retail_etl::sink::SqliteWarehouse;
use retail_etl::types::Value;

use common::{ScriptedHttp, fixture, memory_storage, seed_orders, seed_users};

const COUNT_URL: &str = "https://api.example.test/prod/number_stores";

fn store_record(
    code: &str,
    address: &str,
    store_type: &str,
    staff: &str,
    continent: &str,
) -> String {
    let located = address != "N/A";
    serde_json::json!({
        "index": 0,
        "address": address,
        "longitude": if located { "-3.5339" } else { "N/A" },
        "lat": null,
        "locality": if located { "Exeter" } else { "N/A" },
        "store_code": code,
        "staff_numbers": staff,
        "opening_date": "2010-06-12",
        "store_type": store_type,
        "latitude": if located { "50.7184" } else { "N/A" },
        "country_code": "GB",
        "continent": continent,
    })
    .to_string()
}

fn scripted_sources() -> ScriptedHttp {
    ScriptedHttp::default()
        .respond("https://files.example.test/card_details.pdf", 503, "unavailable")
        .respond(COUNT_URL, 200, r#"{"statusCode": 200, "number_stores": 3}"#)
        .respond(
            "https://api.example.test/prod/store_details/0",
            200,
            store_record("WEB-1388012W", "N/A", "Web Portal", "325", "Europe"),
        )
        .respond(
            "https://api.example.test/prod/store_details/1",
            200,
            store_record(
                "HI-9B97EE4E",
                "Flat 72W\nSally isle\nEast Deantown",
                "Local",
                "J78",
                "eeEurope",
            ),
        )
        .respond(
            "https://api.example.test/prod/store_details/2",
            200,
            store_record("NRQKZWJ9OZ", "NULL", "ZCXWWKF45G", "NULL", "QMAVR5H3LD"),
        )
        .respond(
            "https://files.example.test/date_details.json",
            200,
            fixture("date_details.json"),
        )
}

fn legacy_tables() -> SqliteTableSource {
    let conn = Connection::open_in_memory().unwrap();
    seed_users(&conn, 10, 1, 1);
    seed_orders(&conn);
    SqliteTableSource::from_connection(conn)
}

fn config() -> PipelineConfig {
    PipelineConfig::from_yaml_str(&fixture("pipeline.yaml")).unwrap()
}

fn credentials() -> CredentialStore {
    CredentialStore::default().with(
        CredentialScope::Api,
        Credentials::from_pairs([("header_name", "x-api-key"), ("header_value", "test")]),
    )
}

#[derive(Default)]
struct Alerts(Mutex<Vec<(DatasetKind, Stage, Severity)>>);

impl PipelineObserver for Alerts {
    fn on_alert(&self, ctx: &PipelineContext, stage: Stage, severity: Severity, _error: &EtlError) {
        self.0.lock().unwrap().push((ctx.kind, stage, severity));
    }
}

#[test]
fn unavailable_pdf_fails_only_card_details() {
    let tables = legacy_tables();
    let http = scripted_sources();
    let products = fixture("products.csv");
    let objects = memory_storage(&[("products.csv", products.as_str())]);
    let creds = credentials();
    let extractor = Extractor {
        tables: &tables,
        http: &http,
        objects: &objects,
        credentials: &creds,
    };
    let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
    let alerts = Arc::new(Alerts::default());

    let summary = Pipeline::new(extractor, &mut warehouse)
        .with_observer(alerts.clone())
        .with_alert_threshold(Severity::Error)
        .run(&standard_jobs(&config()));

    assert!(summary.has_failures());
    assert_eq!(summary.loaded(), 5);
    match &summary.outcome(DatasetKind::CardDetails).unwrap().status {
        DatasetStatus::Failed { stage, kind, reason } => {
            assert_eq!(*stage, Stage::Extract);
            assert_eq!(*kind, ErrorKind::SourceUnavailable);
            assert!(reason.contains("503"), "{reason}");
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(
        *alerts.0.lock().unwrap(),
        vec![(DatasetKind::CardDetails, Stage::Extract, Severity::Error)]
    );

    let expect = [
        (DatasetKind::Users, 12, 2, 10),
        (DatasetKind::StoreDetails, 3, 1, 2),
        (DatasetKind::Products, 7, 2, 5),
        (DatasetKind::Orders, 3, 1, 2),
        (DatasetKind::DateEvents, 5, 2, 3),
    ];
    for (kind, extracted, dropped, persisted) in expect {
        assert_eq!(
            summary.outcome(kind).unwrap().status,
            DatasetStatus::Loaded(LoadStats {
                extracted,
                dropped,
                persisted
            }),
            "{kind}"
        );
    }

    let rendered = summary.to_string();
    assert!(rendered.contains("dim_products"));
    assert!(rendered.contains("FAILED at extract"));
}

#[test]
fn store_records_are_fetched_in_index_order() {
    let tables = legacy_tables();
    let http = scripted_sources();
    let objects = memory_storage(&[]);
    let creds = credentials();
    let extractor = Extractor {
        tables: &tables,
        http: &http,
        objects: &objects,
        credentials: &creds,
    };
    let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
    let jobs: Vec<_> = standard_jobs(&config())
        .into_iter()
        .filter(|j| j.kind == DatasetKind::StoreDetails)
        .collect();
    let summary = Pipeline::new(extractor, &mut warehouse).run(&jobs);
    assert!(!summary.has_failures());

    assert_eq!(
        http.requested(),
        vec![
            COUNT_URL.to_string(),
            "https://api.example.test/prod/store_details/0".to_string(),
            "https://api.example.test/prod/store_details/1".to_string(),
            "https://api.example.test/prod/store_details/2".to_string(),
        ]
    );

    let stores = warehouse.fetch_table("dim_store_details").unwrap();
    assert_eq!(stores.row_count(), 2);
    assert_eq!(stores.get(0, "store_code"), Some(&Value::text("WEB-1388012W")));
    assert_eq!(stores.get(0, "address"), Some(&Value::Null));
    assert_eq!(stores.get(1, "continent"), Some(&Value::text("Europe")));
    assert_eq!(stores.get(1, "staff_numbers"), Some(&Value::Int64(78)));
}

#[test]
fn fail_fast_skips_everything_after_the_first_failure() {
    let tables = legacy_tables();
    let http = scripted_sources();
    let objects = memory_storage(&[]);
    let creds = credentials();
    let extractor = Extractor {
        tables: &tables,
        http: &http,
        objects: &objects,
        credentials: &creds,
    };
    let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
    let summary = Pipeline::new(extractor, &mut warehouse)
        .with_policy(FailurePolicy::Abort)
        .run(&standard_jobs(&config()));

    let statuses: Vec<_> = summary.outcomes.iter().map(|o| &o.status).collect();
    assert!(matches!(statuses[0], DatasetStatus::Loaded(_)));
    assert!(matches!(statuses[1], DatasetStatus::Failed { .. }));
    assert!(statuses[2..].iter().all(|s| **s == DatasetStatus::Skipped));
    assert!(warehouse.fetch_table("dim_products").is_err());
}

#[test]
fn missing_product_object_is_reported_per_dataset() {
    let tables = legacy_tables();
    let http = scripted_sources();
    let objects = memory_storage(&[]);
    let creds = credentials();
    let extractor = Extractor {
        tables: &tables,
        http: &http,
        objects: &objects,
        credentials: &creds,
    };
    let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
    let summary = Pipeline::new(extractor, &mut warehouse).run(&standard_jobs(&config()));

    match &summary.outcome(DatasetKind::Products).unwrap().status {
        DatasetStatus::Failed { reason, .. } => {
            assert!(reason.contains("object not found"), "{reason}")
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert!(matches!(
        summary.outcome(DatasetKind::DateEvents).unwrap().status,
        DatasetStatus::Loaded(_)
    ));
}

#[test]
fn credentials_file_is_split_by_scope() {
    use retail_etl::config::CredentialsProvider;

    let store = CredentialStore::load(common::fixture_path("db_creds.yaml")).unwrap();
    assert_eq!(
        store.credentials(CredentialScope::Warehouse).get("database"),
        Some("sales_data.db")
    );
    assert!(store.credentials(CredentialScope::ObjectStore).flag("anonymous"));
    assert_eq!(
        store.credentials(CredentialScope::Api).get("header_name"),
        Some("x-api-key")
    );
}
