//! Source dispatch.
//!
//! [`SourceSpec`] names where a dataset lives; [`Extractor`] owns the injected clients
//! and routes each source to the matching reader.

use std::fmt;

use crate::config::{CredentialScope, CredentialsProvider};
use crate::error::{EtlError, EtlResult};
use crate::types::{DataSet, SourceKind};

use super::api::{PaginatedApiReader, PaginatedEndpoint};
use super::http::HttpClient;
use super::json::read_json_from_url;
use super::pdf::read_pdf_from_locator;
use super::rds::TableSource;
use super::storage::{ObjectLocator, ObjectStorage, read_delimited_object};

/// Location of one raw dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A table of the legacy relational store.
    Table { table: String },
    /// A PDF document (URL or local path).
    Pdf { locator: String },
    /// A count-then-fetch REST API.
    PaginatedApi(PaginatedEndpoint),
    /// A CSV object (`s3://bucket/key`).
    Object { uri: String },
    /// A JSON document served over HTTP.
    JsonUrl { url: String },
}

impl SourceSpec {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSpec::Table { .. } => SourceKind::Relational,
            SourceSpec::Pdf { .. } => SourceKind::Pdf,
            SourceSpec::PaginatedApi(_) => SourceKind::RestApi,
            SourceSpec::Object { .. } => SourceKind::ObjectStore,
            SourceSpec::JsonUrl { .. } => SourceKind::Json,
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Table { table } => write!(f, "table {table}"),
            SourceSpec::Pdf { locator } => write!(f, "pdf {locator}"),
            SourceSpec::PaginatedApi(ep) => write!(f, "api {}", ep.count_url),
            SourceSpec::Object { uri } => write!(f, "object {uri}"),
            SourceSpec::JsonUrl { url } => write!(f, "json {url}"),
        }
    }
}

/// Clients and credentials the readers need.
pub struct Extractor<'a> {
    pub tables: &'a dyn TableSource,
    pub http: &'a dyn HttpClient,
    pub objects: &'a dyn ObjectStorage,
    pub credentials: &'a dyn CredentialsProvider,
}

impl Extractor<'_> {
    /// Read the raw dataset described by `source`.
    pub fn extract(&self, source: &SourceSpec) -> EtlResult<DataSet> {
        match source {
            SourceSpec::Table { table } => self.tables.read_table(table),
            SourceSpec::Pdf { locator } => read_pdf_from_locator(locator, self.http),
            SourceSpec::PaginatedApi(endpoint) => {
                if endpoint.count_url.is_empty() || endpoint.record_url.is_empty() {
                    return Err(EtlError::config("paginated api endpoints are not configured"));
                }
                let credentials = self.credentials.credentials(CredentialScope::Api);
                PaginatedApiReader::new(self.http, &credentials)?.read(endpoint)
            }
            SourceSpec::Object { uri } => {
                let locator = ObjectLocator::parse(uri)?;
                read_delimited_object(self.objects, &locator)
            }
            SourceSpec::JsonUrl { url } => read_json_from_url(url, self.http),
        }
    }
}
