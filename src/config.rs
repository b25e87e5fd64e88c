//! Run configuration and source credentials.
//!
//! Both are YAML documents. [`PipelineConfig`] names the sources; every field has a
//! default so an empty file (or none at all) is valid. Credentials live in a separate
//! file grouped by [`CredentialScope`]:
//!
//! ```yaml
//! rds:
//!   database: legacy.db
//! api:
//!   header_name: x-api-key
//!   header_value: secret
//! object_store:
//!   anonymous: true
//!   region: eu-west-1
//! warehouse:
//!   database: sales_data.db
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};
use crate::pipeline::FailurePolicy;

/// Where each dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Legacy table holding user records.
    pub users_table: String,
    /// Legacy table holding order records.
    pub orders_table: String,
    /// URL or local path of the card details PDF.
    pub card_details_pdf: String,
    /// Store API endpoint returning the store count.
    pub stores_count_url: String,
    /// Store API record endpoint; the store index is appended (or substituted for `{index}`).
    pub store_record_url: String,
    /// Field of the count response holding the count.
    pub store_count_field: String,
    /// `s3://` URI of the products CSV.
    pub products_object: String,
    /// URL of the date events JSON document.
    pub date_events_url: String,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            users_table: "legacy_users".to_string(),
            orders_table: "orders_table".to_string(),
            card_details_pdf: "https://data-handling-public.s3.eu-west-1.amazonaws.com/card_details.pdf"
                .to_string(),
            stores_count_url: String::new(),
            store_record_url: String::new(),
            store_count_field: "number_stores".to_string(),
            products_object: "s3://data-handling-public/products.csv".to_string(),
            date_events_url: "https://data-handling-public.s3.eu-west-1.amazonaws.com/date_details.json"
                .to_string(),
            failure_policy: FailurePolicy::Continue,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(input: &str) -> EtlResult<Self> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EtlError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }
}

/// Opaque key/value credentials for one source or sink.
///
/// `Debug` output hides values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value of `key`, or [`EtlError::Config`] if absent.
    pub fn require(&self, key: &str) -> EtlResult<&str> {
        self.get(key)
            .ok_or_else(|| EtlError::config(format!("missing credential '{key}'")))
    }

    /// `true` when `key` is set to `true`, `yes` or `1`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "yes" | "1")
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "***")))
            .finish()
    }
}

/// Which system a set of credentials is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CredentialScope {
    /// Legacy relational store.
    Rds,
    /// Store REST API.
    Api,
    /// Object storage.
    ObjectStore,
    /// Destination warehouse.
    Warehouse,
}

impl CredentialScope {
    pub fn section(self) -> &'static str {
        match self {
            CredentialScope::Rds => "rds",
            CredentialScope::Api => "api",
            CredentialScope::ObjectStore => "object_store",
            CredentialScope::Warehouse => "warehouse",
        }
    }
}

/// Supplies credentials per scope.
pub trait CredentialsProvider {
    /// Credentials for `scope`; empty when none are configured.
    fn credentials(&self, scope: CredentialScope) -> Credentials;
}

/// In-memory credentials, usually loaded from a YAML file.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    scopes: BTreeMap<CredentialScope, Credentials>,
}

impl CredentialStore {
    pub fn with(mut self, scope: CredentialScope, credentials: Credentials) -> Self {
        self.scopes.insert(scope, credentials);
        self
    }

    /// Parse a YAML document of `section: {key: value}` maps. Scalar values of any type
    /// are kept as their text form; unknown sections are rejected.
    pub fn from_yaml_str(input: &str) -> EtlResult<Self> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: BTreeMap<String, BTreeMap<String, serde_yaml::Value>> =
            serde_yaml::from_str(input)?;
        let mut store = Self::default();
        for (section, entries) in raw {
            let scope = [
                CredentialScope::Rds,
                CredentialScope::Api,
                CredentialScope::ObjectStore,
                CredentialScope::Warehouse,
            ]
            .into_iter()
            .find(|s| s.section() == section)
            .ok_or_else(|| EtlError::config(format!("unknown credentials section '{section}'")))?;

            let mut pairs = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let text = match value {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    _ => {
                        return Err(EtlError::config(format!(
                            "credential '{section}.{key}' must be a scalar"
                        )));
                    }
                };
                pairs.push((key, text));
            }
            store.scopes.insert(scope, Credentials::from_pairs(pairs));
        }
        Ok(store)
    }

    pub fn load(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EtlError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }
}

impl CredentialsProvider for CredentialStore {
    fn credentials(&self, scope: CredentialScope) -> Credentials {
        self.scopes.get(&scope).cloned().unwrap_or_default()
    }
}
