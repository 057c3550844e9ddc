// Backend drivers for the web API and REST API dialects
// Author: Gabriel Demetrios Lafis

mod rest;
mod web;

pub use rest::*;
pub use web::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::{BackendVersion, EncodeError, TimeRange};
use crate::response::{Choice, Frame, RawResponse, ResponseError, TransportFailure};
use crate::spec::{substitute, update_query, Edition, Query, RequestSpec, SpecError, VariableResolver};
use crate::utils::{validate, ValidationError};

/// HTTP method of an outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// Request handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get<S: Into<String>>(url: S) -> Self {
        HttpRequest {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post<S: Into<String>, B: Into<String>>(url: S, body: B) -> Self {
        HttpRequest {
            url: url.into(),
            method: Method::Post,
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Carries requests to the monitoring site
pub trait Transport {
    /// Send a request and wait for its outcome
    fn request(&self, request: &HttpRequest) -> Result<RawResponse, TransportFailure>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(&self, request: &HttpRequest) -> Result<RawResponse, TransportFailure> {
        (**self).request(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn request(&self, request: &HttpRequest) -> Result<RawResponse, TransportFailure> {
        (**self).request(request)
    }
}

/// Dialect spoken with the monitoring site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Web,
    Rest,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Rest
    }
}

/// Connection settings shared by both drivers
#[derive(Debug, Clone, PartialEq)]
pub struct DatasourceSettings {
    /// Site URL, without a trailing slash
    pub url: String,
    pub username: Option<String>,
    pub edition: Edition,
    pub version: Option<BackendVersion>,
}

impl DatasourceSettings {
    pub fn new<S: AsRef<str>>(url: S, edition: Edition) -> Self {
        DatasourceSettings {
            url: url.as_ref().trim_end_matches('/').to_string(),
            username: None,
            edition,
            version: None,
        }
    }

    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_version(mut self, version: BackendVersion) -> Self {
        self.version = Some(version);
        self
    }
}

/// Operations every backend dialect offers
pub trait Backend {
    /// Run the graph queries of a panel, one frame per visible target
    fn query(
        &self,
        targets: &[Query],
        range: TimeRange,
        resolver: &dyn VariableResolver,
    ) -> Result<Vec<Frame>, QueryError>;

    /// Sites the user may see
    fn list_sites(&self, include_all: bool) -> Result<Vec<Choice>, QueryError>;

    /// Probe the connection, returning a success message
    fn test_datasource(&self) -> Result<String, QueryError>;
}

/// Create the driver for a backend dialect
pub fn create_backend<'a, T: Transport + 'a>(
    kind: BackendKind,
    settings: DatasourceSettings,
    transport: T,
) -> Box<dyn Backend + 'a> {
    match kind {
        BackendKind::Web => Box::new(WebApiBackend::new(settings, transport)),
        BackendKind::Rest => Box::new(RestApiBackend::new(settings, transport)),
    }
}

/// A query target ready to be encoded
pub(crate) struct PreparedTarget {
    pub ref_id: String,
    pub hide: bool,
    pub spec: RequestSpec,
}

/// Migrate, validate and substitute every target before anything is sent.
///
/// Validation sees the stored spec, so a variable counts as a value even when
/// it resolves to nothing.
pub(crate) fn prepare_targets(
    targets: &[Query],
    edition: Edition,
    resolver: &dyn VariableResolver,
) -> Result<Vec<PreparedTarget>, QueryError> {
    let mut prepared = Vec::with_capacity(targets.len());
    for target in targets {
        let mut query = target.clone();
        update_query(&mut query)?;

        let stored = query.request_spec.unwrap_or_default();
        validate(&stored, edition)?;

        prepared.push(PreparedTarget {
            ref_id: query.ref_id,
            hide: query.hide,
            spec: substitute(&stored, resolver),
        });
    }
    Ok(prepared)
}

/// Graph is unset or empty after substitution; such targets render as "no data"
pub(crate) fn has_no_graph(spec: &RequestSpec) -> bool {
    spec.graph.as_deref().map_or(true, str::is_empty)
}

/// Represents an error while talking to a backend
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Response(#[from] ResponseError),
    #[error("{0}")]
    UnsupportedVersion(String),
    #[error("This data source must authenticate against Checkmk using an automation user.")]
    NotAutomationUser,
}
