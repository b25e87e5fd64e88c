//! HTTP GET capability used by the PDF, REST and JSON readers.

use crate::error::{EtlError, EtlResult};

/// Status and body of a completed GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP GET.
///
/// Transport failures are `Err`; non-success statuses are returned as responses so
/// callers can attach their own context.
pub trait HttpClient {
    fn get(&self, url: &str, headers: &[(String, String)]) -> EtlResult<HttpResponse>;
}

/// [`HttpClient`] backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> EtlResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("retail-etl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EtlError::config(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str, headers: &[(String, String)]) -> EtlResult<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().map_err(|e| EtlError::unavailable(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| EtlError::unavailable(url, e))?
            .to_vec();
        Ok(HttpResponse { status, body })
    }
}
