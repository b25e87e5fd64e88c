//! Paginated REST extraction.
//!
//! A count endpoint reports how many records exist; each record is then fetched from
//! the record endpoint by its 0-based index. Any non-success response aborts the read.

use crate::config::Credentials;
use crate::error::{EtlError, EtlResult};
use crate::types::{DataSet, SourceKind};

use super::http::HttpClient;
use super::json::dataset_from_objects;

/// Count and record endpoints of a paginated API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedEndpoint {
    /// GET returns a JSON object holding the record count.
    pub count_url: String,
    /// Record URL. `{index}` is replaced by the record index; without the placeholder
    /// the index is appended.
    pub record_url: String,
    /// Field of the count response holding the record count.
    pub count_field: String,
}

impl PaginatedEndpoint {
    pub fn record_url_for(&self, index: usize) -> String {
        if self.record_url.contains("{index}") {
            self.record_url.replace("{index}", &index.to_string())
        } else {
            format!("{}{index}", self.record_url)
        }
    }
}

/// Request headers taken from the API credentials (`header_name` / `header_value`).
///
/// Empty when the credentials carry no header.
pub fn api_headers(credentials: &Credentials) -> EtlResult<Vec<(String, String)>> {
    match (credentials.get("header_name"), credentials.get("header_value")) {
        (Some(name), Some(value)) => Ok(vec![(name.to_string(), value.to_string())]),
        (None, None) => Ok(Vec::new()),
        _ => Err(EtlError::config(
            "api credentials need both header_name and header_value",
        )),
    }
}

/// Reads every record of a [`PaginatedEndpoint`].
pub struct PaginatedApiReader<'a> {
    http: &'a dyn HttpClient,
    headers: Vec<(String, String)>,
}

impl<'a> PaginatedApiReader<'a> {
    pub fn new(http: &'a dyn HttpClient, credentials: &Credentials) -> EtlResult<Self> {
        Ok(Self {
            http,
            headers: api_headers(credentials)?,
        })
    }

    /// Number of records reported by the count endpoint.
    pub fn fetch_count(&self, endpoint: &PaginatedEndpoint) -> EtlResult<usize> {
        let url = endpoint.count_url.as_str();
        let response = self.http.get(url, &self.headers)?;
        if !response.is_success() {
            return Err(EtlError::unavailable(
                url,
                format!("count request returned status {}", response.status),
            ));
        }
        let body: serde_json::Value = serde_json::from_slice(&response.body)?;
        body.get(&endpoint.count_field)
            .and_then(serde_json::Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| {
                EtlError::format(
                    url,
                    format!("response has no integer field '{}'", endpoint.count_field),
                )
            })
    }

    /// Fetch records `0..count` in order.
    ///
    /// A non-success status for any record fails the whole read with
    /// [`EtlError::RecordFetch`]; partial results are discarded.
    pub fn fetch_records(&self, endpoint: &PaginatedEndpoint, count: usize) -> EtlResult<DataSet> {
        let mut objects = Vec::new();
        for index in 0..count {
            let url = endpoint.record_url_for(index);
            let response = self.http.get(&url, &self.headers)?;
            if !response.is_success() {
                tracing::warn!(index, status = response.status, url = %url, "record fetch failed");
                return Err(EtlError::RecordFetch {
                    index,
                    url,
                    status: response.status,
                });
            }
            match serde_json::from_slice::<serde_json::Value>(&response.body)? {
                serde_json::Value::Object(map) => objects.push(map),
                _ => {
                    let reason = format!("record {index} is not a json object");
                    return Err(EtlError::format(url, reason));
                }
            }
        }
        Ok(dataset_from_objects(&objects).with_source(SourceKind::RestApi))
    }

    /// [`fetch_count`](Self::fetch_count) followed by [`fetch_records`](Self::fetch_records).
    pub fn read(&self, endpoint: &PaginatedEndpoint) -> EtlResult<DataSet> {
        let count = self.fetch_count(endpoint)?;
        tracing::info!(count, url = %endpoint.count_url, "fetching paginated records");
        self.fetch_records(endpoint, count)
    }
}
