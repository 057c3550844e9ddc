// Encoders turning request specifications into backend requests
// Author: Gabriel Demetrios Lafis

mod context;
mod graph;
mod livestatus;

pub use context::*;
pub use graph::*;
pub use livestatus::*;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use urlencoding::encode;

/// Backends below this version expect the indexed host label encoding
pub const LABEL_ENCODING_CUTOFF: BackendVersion = BackendVersion::new(2, 2, 0);

/// Version of the monitoring backend, compared on its numeric triple.
///
/// Release suffixes such as `p12` or `b1` are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl BackendVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        BackendVersion { major, minor, patch }
    }

    /// Whether host labels must use the indexed boolean tree encoding
    pub fn requires_indexed_labels(&self) -> bool {
        *self < LABEL_ENCODING_CUTOFF
    }
}

fn leading_number(part: &str, version: &str) -> Result<u32, EncodeError> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse()
        .map_err(|_| EncodeError::InvalidVersion(version.to_string()))
}

impl FromStr for BackendVersion {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('.');

        let major = match parts.next() {
            Some(part) => leading_number(part, s)?,
            None => return Err(EncodeError::InvalidVersion(s.to_string())),
        };
        let minor = match parts.next() {
            Some(part) => leading_number(part, s)?,
            None => return Err(EncodeError::InvalidVersion(s.to_string())),
        };
        let patch = match parts.next() {
            Some(part) => leading_number(part, s)?,
            None => 0,
        };

        Ok(BackendVersion::new(major, minor, patch))
    }
}

impl fmt::Display for BackendVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Queried time range in unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

impl TimeRange {
    pub fn new(from: i64, to: i64) -> Self {
        TimeRange { from, to }
    }

    pub fn from_datetimes(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        TimeRange {
            from: from.timestamp(),
            to: to.timestamp(),
        }
    }

    /// `[from, to]` as sent inside legacy request bodies
    pub fn as_pair(&self) -> [i64; 2] {
        [self.from, self.to]
    }

    /// RFC 3339 start and end, as the REST API expects them
    pub fn to_rfc3339(&self) -> Result<(String, String), EncodeError> {
        let start = Utc
            .timestamp_opt(self.from, 0)
            .single()
            .ok_or(EncodeError::InvalidTimeRange(self.from))?;
        let end = Utc
            .timestamp_opt(self.to, 0)
            .single()
            .ok_or(EncodeError::InvalidTimeRange(self.to))?;
        Ok((start.to_rfc3339(), end.to_rfc3339()))
    }
}

/// Append query parameters to a URL, keeping their order.
///
/// Values are not URL encoded; callers must not pass `&` or `=` inside them.
pub fn build_url_with_params<I, K, V>(url: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut result = url.to_string();
    for (i, (key, value)) in params.into_iter().enumerate() {
        result.push(if i == 0 { '?' } else { '&' });
        result.push_str(key.as_ref());
        result.push('=');
        result.push_str(value.as_ref());
    }
    result
}

/// Append query parameters to a URL, percent-encoding every key and value
pub fn build_encoded_url<I, K, V>(url: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    build_url_with_params(
        url,
        params
            .into_iter()
            .map(|(key, value)| (encode(key.as_ref()).into_owned(), encode(value.as_ref()).into_owned())),
    )
}

/// Form-encoded body of the legacy web API: `request=<json>`
pub fn build_request_body<T: Serialize + ?Sized>(data: &T) -> Result<String, EncodeError> {
    Ok(format!("request={}", serde_json::to_string(data)?))
}

/// Represents an error in the encode module
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unknown graph mode: {0}")]
    UnknownGraphMode(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid backend version: {0}")]
    InvalidVersion(String),
    #[error("Timestamp {0} is out of range")]
    InvalidTimeRange(i64),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
