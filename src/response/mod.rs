// Response normalization for both backend dialects
// Author: Gabriel Demetrios Lafis

mod choices;
mod frame;
mod graph;

pub use choices::*;
pub use frame::*;
pub use graph::*;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Oldest backend release the legacy web API works with
pub const MINIMUM_BACKEND_VERSION: &str = "2.0";

/// Backend diagnostic for combined graphs matching too many objects
pub const SIZE_LIMIT_BACKEND_MESSAGE: &str =
    "Sorry, you cannot create combined graphs for more than 100 objects";

/// First line of the backend diagnostic for features missing from an edition
pub const UNSUPPORTED_EDITION_MESSAGE: &str =
    "Checkmk exception: Currently not supported with this Checkmk Edition";

/// Successful transport round trip
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub data: JsonValue,
}

impl RawResponse {
    pub fn ok(data: JsonValue) -> Self {
        RawResponse { status: 200, data }
    }
}

/// Rejection signalled by the transport
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportFailure {
    /// Request never completed: missing CORS header or TLS failure
    pub cancelled: bool,
    pub status: Option<u16>,
    pub message: String,
    /// Error body, when the server sent one
    pub data: Option<JsonValue>,
}

impl TransportFailure {
    pub fn cancelled() -> Self {
        TransportFailure {
            cancelled: true,
            ..TransportFailure::default()
        }
    }

    pub fn status(status: u16) -> Self {
        TransportFailure {
            status: Some(status),
            ..TransportFailure::default()
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

/// Outcome of a legacy web API call, decided once at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Ok(T),
    /// Well formed envelope with a non-zero result code
    ApplicationError {
        message: String,
        severity: Option<String>,
    },
    /// Payload that is not an envelope at all
    Malformed(String),
    TransportError(TransportFailure),
}

impl<T> Reply<T> {
    /// Map the reply onto the error taxonomy
    pub fn into_result(self) -> Result<T, ResponseError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::ApplicationError { message, .. } => Err(backend_error(message)),
            Reply::Malformed(payload) => Err(ResponseError::Malformed(payload)),
            Reply::TransportError(failure) => Err(transport_error(&failure)),
        }
    }
}

fn transport_error(failure: &TransportFailure) -> ResponseError {
    if failure.cancelled {
        return ResponseError::Cancelled;
    }
    match failure.status {
        Some(410) => ResponseError::LegacyApiUnavailable,
        _ => ResponseError::Unreadable,
    }
}

/// Remap well known backend diagnostics onto dedicated errors
fn backend_error(message: String) -> ResponseError {
    if message == SIZE_LIMIT_BACKEND_MESSAGE {
        return ResponseError::ResultSizeLimit;
    }
    if message.lines().next() == Some(UNSUPPORTED_EDITION_MESSAGE) {
        return ResponseError::UnsupportedFeature(UNSUPPORTED_EDITION_MESSAGE.to_string());
    }
    ResponseError::Backend(message)
}

fn text_of(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Classify a raw web API result by explicit discriminants: the transport
/// outcome, the payload type and `result_code`.
pub fn classify(raw: Result<RawResponse, TransportFailure>) -> Reply<JsonValue> {
    let response = match raw {
        Ok(response) => response,
        Err(failure) => return Reply::TransportError(failure),
    };

    let envelope = match response.data {
        JsonValue::String(payload) => return Reply::Malformed(payload),
        JsonValue::Object(envelope) => envelope,
        other => return Reply::Malformed(other.to_string()),
    };

    let result_code = envelope.get("result_code").and_then(JsonValue::as_i64);
    let result_code = match result_code {
        Some(code) => code,
        None => return Reply::Malformed(JsonValue::Object(envelope).to_string()),
    };

    if result_code == 0 {
        return Reply::Ok(envelope.get("result").cloned().unwrap_or(JsonValue::Null));
    }

    let severity = envelope
        .get("severity")
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let message = envelope
        .get("result")
        .filter(|result| !result.is_null())
        .map(text_of)
        .unwrap_or_else(|| JsonValue::Object(envelope.clone()).to_string());
    Reply::ApplicationError { message, severity }
}

/// Unwrap a web API result and decode its payload
pub fn web_api_result<T: DeserializeOwned>(raw: Result<RawResponse, TransportFailure>) -> Result<T, ResponseError> {
    let result = classify(raw).into_result()?;
    serde_json::from_value(result).map_err(|e| ResponseError::Shape(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    title: Option<String>,
    detail: Option<String>,
}

/// Unwrap a REST API result and decode its payload
pub fn rest_api_result<T: DeserializeOwned>(raw: Result<RawResponse, TransportFailure>) -> Result<T, ResponseError> {
    let response = match raw {
        Ok(response) => response,
        Err(failure) => return Err(rest_transport_error(&failure)),
    };

    if let JsonValue::String(payload) = response.data {
        return Err(ResponseError::Malformed(payload));
    }
    serde_json::from_value(response.data).map_err(|e| ResponseError::Shape(e.to_string()))
}

fn rest_transport_error(failure: &TransportFailure) -> ResponseError {
    if failure.cancelled {
        return ResponseError::Cancelled;
    }
    if failure.status == Some(404) {
        return ResponseError::GraphEndpointsUnavailable;
    }

    let body = failure
        .data
        .clone()
        .and_then(|data| serde_json::from_value::<RestErrorBody>(data).ok());
    match body {
        Some(RestErrorBody {
            title: Some(title),
            detail: Some(detail),
        }) => {
            if detail == SIZE_LIMIT_BACKEND_MESSAGE {
                ResponseError::ResultSizeLimit
            } else {
                ResponseError::Backend(format!("{} {}", title, detail))
            }
        }
        _ => ResponseError::Unreadable,
    }
}

/// Represents an error in the response module
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("API request was cancelled. This has either happened because no 'Access-Control-Allow-Origin' header is present, or because of a ssl protocol error. Make sure you are running at least Checkmk version {}.", MINIMUM_BACKEND_VERSION)]
    Cancelled,
    #[error("Web-API is not available. Choose correct Checkmk version in Data Source Settings, or enable Web-API in 'Global settings' if you use Checkmk 2.1.0.")]
    LegacyApiUnavailable,
    #[error("Could not read API response, make sure the URL you provided is correct.")]
    Unreadable,
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    Backend(String),
    #[error("Result size limit reached. Please add more filters to reduce the number of elements in the result.")]
    ResultSizeLimit,
    #[error("{0}")]
    UnsupportedFeature(String),
    #[error("{0}")]
    EditionMismatch(String),
    #[error("REST API graph endpoints are unavailable. Choose correct checkmk version in data source settings.")]
    GraphEndpointsUnavailable,
    #[error("Unexpected response shape: {0}")]
    Shape(String),
    #[error("Export error: {0}")]
    Export(String),
}

impl ResponseError {
    /// Whether the backend lacks a feature the query needs
    pub fn is_unsupported_feature(&self) -> bool {
        matches!(
            self,
            ResponseError::UnsupportedFeature(_) | ResponseError::LegacyApiUnavailable
        )
    }

    /// Errors caused by the transport rather than by the backend
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ResponseError::Cancelled | ResponseError::LegacyApiUnavailable | ResponseError::Unreadable
        )
    }
}
