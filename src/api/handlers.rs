// API request handlers
// Author: Gabriel Demetrios Lafis

use actix_web::{web, HttpResponse, Responder};
use log::debug;

use crate::backend::BackendKind;
use crate::encode::{
    build_context, build_filter_expression, build_graph_spec, build_rest_graph_request, BackendVersion, TimeRange,
};
use crate::response::{classify, normalize_graph, normalize_rest_graph, RawResponse};
use crate::spec::{migrate, substitute, Edition, TemplateVariables};
use crate::utils::{required_fields, validate};
use super::{models::*, ApiError, ServiceState};

fn edition_or_default(tag: Option<&str>, state: &ServiceState) -> Edition {
    tag.map(Edition::from_tag).unwrap_or(state.edition)
}

fn version_or_default(version: Option<&str>, state: &ServiceState) -> Result<Option<BackendVersion>, ApiError> {
    match version {
        Some(v) => Ok(Some(v.parse()?)),
        None => Ok(state.version),
    }
}

/// Turn a legacy context/params pair into a request specification
pub async fn migrate_spec(payload: web::Json<MigrateRequest>) -> Result<impl Responder, ApiError> {
    let req = payload.into_inner();
    let spec = migrate(&req.context, &req.params)?;

    Ok(HttpResponse::Ok().json(spec))
}

/// Check a spec against the fields its edition requires
pub async fn validate_spec(
    state: web::Data<ServiceState>,
    payload: web::Json<ValidateRequest>,
) -> Result<impl Responder, ApiError> {
    let req = payload.into_inner();
    let edition = edition_or_default(req.edition.as_deref(), &state);

    validate(&req.request_spec, edition)?;

    Ok(HttpResponse::Ok().json(ValidateResponse {
        valid: true,
        required: required_fields(edition)
            .iter()
            .map(|f| f.key().to_string())
            .collect(),
    }))
}

/// Resolve dashboard variables inside a spec
pub async fn substitute_spec(payload: web::Json<SubstituteRequest>) -> Result<impl Responder, ApiError> {
    let req = payload.into_inner();
    let variables = TemplateVariables::from(req.variables);

    Ok(HttpResponse::Ok().json(substitute(&req.request_spec, &variables)))
}

/// Build the legacy context of a spec
pub async fn encode_context(
    state: web::Data<ServiceState>,
    payload: web::Json<EncodeContextRequest>,
) -> Result<impl Responder, ApiError> {
    let req = payload.into_inner();
    let version = version_or_default(req.version.as_deref(), &state)?;

    Ok(HttpResponse::Ok().json(build_context(&req.request_spec, version.as_ref())))
}

/// Build the live-query filter of a spec
pub async fn encode_filter(payload: web::Json<EncodeFilterRequest>) -> Result<impl Responder, ApiError> {
    let req = payload.into_inner();

    Ok(HttpResponse::Ok().json(build_filter_expression(&req.request_spec, req.domain)))
}

/// Build the graph request of a spec in the web or REST dialect
pub async fn encode_graph(
    state: web::Data<ServiceState>,
    payload: web::Json<EncodeGraphRequest>,
) -> Result<impl Responder, ApiError> {
    let req = payload.into_inner();
    if req.from > req.to {
        return Err(ApiError::BadRequest(format!(
            "Time range starts after it ends: {} > {}",
            req.from, req.to
        )));
    }

    let edition = edition_or_default(req.edition.as_deref(), &state);
    let version = version_or_default(req.version.as_deref(), &state)?;
    let range = TimeRange::new(req.from, req.to);

    let encoded = match req.backend.unwrap_or(BackendKind::Web) {
        BackendKind::Web => {
            let request = build_graph_spec(&req.request_spec, range, edition, version.as_ref())?;
            let body = request.to_body()?;
            EncodedGraph::Web { request, body }
        }
        BackendKind::Rest => {
            let request = build_rest_graph_request(&req.request_spec, range, edition, version.as_ref())?;
            EncodedGraph::Rest {
                endpoint: request.endpoint().to_string(),
                request,
            }
        }
    };
    debug!("Encoded graph request: {:?}", encoded);

    Ok(HttpResponse::Ok().json(encoded))
}

/// Reshape a backend graph response into a frame
pub async fn decode_graph(payload: web::Json<DecodeGraphRequest>) -> Result<impl Responder, ApiError> {
    let req = payload.into_inner();

    let mut frame = match req.backend.unwrap_or(BackendKind::Web) {
        BackendKind::Web => {
            let result = classify(Ok(RawResponse::ok(req.payload))).into_result()?;
            normalize_graph(result)?
        }
        BackendKind::Rest => normalize_rest_graph(req.payload)?,
    };
    if let Some(ref_id) = req.ref_id {
        frame = frame.with_ref_id(ref_id);
    }

    Ok(HttpResponse::Ok().json(frame))
}
