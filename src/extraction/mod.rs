//! Readers for every raw source.
//!
//! Each reader returns an untyped [`crate::types::DataSet`] (fields are
//! [`crate::types::DataType::Any`]) tagged with the [`crate::types::SourceKind`] that
//! produced it. Typing happens later, in [`crate::cleaning`].
//!
//! - [`rds`]: tables of the legacy relational store
//! - [`pdf`]: a table spanning the pages of a PDF
//! - [`api`]: count-then-fetch paginated REST
//! - [`storage`]: CSV objects in object storage
//! - [`json`]: JSON documents
//!
//! Most callers go through [`Extractor::extract`] with a [`SourceSpec`].

pub mod api;
pub mod csv;
pub mod http;
pub mod json;
pub mod pdf;
pub mod rds;
pub mod source;
pub mod storage;

pub use api::{PaginatedApiReader, PaginatedEndpoint};
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use rds::{SqliteTableSource, TableSource, UnavailableTables};
pub use source::{Extractor, SourceSpec};
pub use storage::{ObjectLocator, ObjectStorage, S3Storage, StoreBackedStorage};
