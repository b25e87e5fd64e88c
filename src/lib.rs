//! `retail_etl` extracts retail sales data from heterogeneous sources, cleans each dataset
//! into a typed shape, and loads it into a star-schema warehouse.
//!
//! Six datasets make up the warehouse:
//!
//! | dataset | source | table |
//! |---|---|---|
//! | users | legacy relational table | `dim_users` |
//! | card details | PDF document | `dim_card_details` |
//! | store details | paginated REST API | `dim_store_details` |
//! | products | CSV object in S3 | `dim_products` |
//! | orders | legacy relational table | `orders_table` |
//! | date events | JSON document over HTTP | `dim_date_times` |
//!
//! Raw data is read into an untyped [`types::DataSet`] by [`extraction`], cleaned by the
//! dataset's cleaner in [`cleaning`] (built from the shared [`normalize`] steps), and
//! written by a [`sink::WarehouseSink`]. [`pipeline::Pipeline`] runs the three stages per
//! dataset and isolates failures.
//!
//! ## Cleaning a dataset
//!
//! ```rust
//! use retail_etl::cleaning::DatasetKind;
//! use retail_etl::types::{DataSet, Value};
//!
//! let raw = DataSet::from_columns(
//!     ["index", "timestamp", "month", "year", "day", "time_period", "date_uuid"],
//!     vec![
//!         vec![
//!             Value::Int64(0),
//!             Value::text("22:00:06"),
//!             Value::text("9"),
//!             Value::text("2012"),
//!             Value::text("19"),
//!             Value::text("Evening"),
//!             Value::text("3b7ca996-37f9-433f-b6d0-ce8391b615ad"),
//!         ],
//!         vec![
//!             Value::Int64(1),
//!             Value::text("NULL"),
//!             Value::text("NULL"),
//!             Value::text("NULL"),
//!             Value::text("NULL"),
//!             Value::text("NULL"),
//!             Value::text("NULL"),
//!         ],
//!     ],
//! );
//! let cleaned = DatasetKind::DateEvents.clean(raw).unwrap();
//! assert_eq!(cleaned.dataset.row_count(), 1);
//! assert_eq!(cleaned.report.rows_dropped(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`extraction`]: source readers and the [`extraction::Extractor`] dispatcher
//! - [`normalize`]: reusable field normalizers with drop accounting
//! - [`cleaning`]: per-dataset cleaners and warehouse table definitions
//! - [`sink`]: warehouse loading
//! - [`pipeline`]: orchestration, run summaries and observers
//! - [`config`]: pipeline configuration and credentials
//! - [`logging`]: `tracing` subscriber setup
//! - [`error`]: error types

pub mod cleaning;
pub mod config;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use error::{EtlError, EtlResult};
