// API request and response models
// Author: Gabriel Demetrios Lafis

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::backend::BackendKind;
use crate::encode::{FilterDomain, GraphRequest, RestGraphRequest};
use crate::spec::{Context, Params, RequestSpec};

/// Legacy context/params pair to migrate
#[derive(Debug, Clone, Deserialize)]
pub struct MigrateRequest {
    pub context: Context,
    pub params: Params,
}

/// Spec checked against the required fields of an edition
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub request_spec: RequestSpec,
    /// Edition tag such as `cee` or `raw`
    pub edition: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub required: Vec<String>,
}

/// Spec whose dashboard variables should be resolved
#[derive(Debug, Clone, Deserialize)]
pub struct SubstituteRequest {
    pub request_spec: RequestSpec,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodeContextRequest {
    pub request_spec: RequestSpec,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodeFilterRequest {
    pub request_spec: RequestSpec,
    pub domain: FilterDomain,
}

/// Graph request for a spec, time range in unix seconds
#[derive(Debug, Clone, Deserialize)]
pub struct EncodeGraphRequest {
    pub request_spec: RequestSpec,
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub backend: Option<BackendKind>,
    pub edition: Option<String>,
    pub version: Option<String>,
}

/// Encoded graph request in the chosen dialect
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum EncodedGraph {
    Web {
        request: GraphRequest,
        body: String,
    },
    Rest {
        endpoint: String,
        request: RestGraphRequest,
    },
}

/// Raw backend payload to reshape into a frame
#[derive(Debug, Clone, Deserialize)]
pub struct DecodeGraphRequest {
    #[serde(default)]
    pub backend: Option<BackendKind>,
    #[serde(rename = "refId")]
    pub ref_id: Option<String>,
    /// Web API envelope or REST response body
    pub payload: JsonValue,
}
