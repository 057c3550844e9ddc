// Legacy web API driver
// Author: Gabriel Demetrios Lafis

use log::{debug, warn};
use serde_json::json;

use crate::encode::{build_graph_spec, build_request_body, build_url_with_params, TimeRange};
use crate::response::{classify, normalize_graph, normalize_sites, Choice, Frame, ResponseError};
use crate::spec::{Edition, Query, RequestSpec, VariableResolver};
use super::{has_no_graph, prepare_targets, Backend, DatasourceSettings, HttpRequest, QueryError, Transport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Driver for the `webapi.py` RPC endpoint
pub struct WebApiBackend<T: Transport> {
    settings: DatasourceSettings,
    transport: T,
}

impl<T: Transport> WebApiBackend<T> {
    pub fn new(settings: DatasourceSettings, transport: T) -> Self {
        WebApiBackend { settings, transport }
    }

    pub fn settings(&self) -> &DatasourceSettings {
        &self.settings
    }

    fn action_url(&self, action: &str) -> String {
        build_url_with_params(
            &format!("{}/check_mk/webapi.py", self.settings.url),
            [("action", action)],
        )
    }

    /// Call a web API action and unwrap its envelope
    fn call(&self, request: HttpRequest) -> Result<serde_json::Value, ResponseError> {
        debug!("Web API request to {}", request.url);
        classify(self.transport.request(&request)).into_result()
    }

    fn graph_frame(&self, ref_id: &str, spec: &RequestSpec, range: TimeRange) -> Result<Frame, QueryError> {
        if has_no_graph(spec) {
            return Ok(Frame::empty().with_ref_id(ref_id));
        }

        let graph_request = build_graph_spec(spec, range, self.settings.edition, self.settings.version.as_ref())?;
        let request = HttpRequest::post(self.action_url("get_graph"), graph_request.to_body()?)
            .with_header("Content-Type", FORM_CONTENT_TYPE);

        let result = self.call(request)?;
        Ok(normalize_graph(result)?.with_ref_id(ref_id))
    }
}

impl<T: Transport> Backend for WebApiBackend<T> {
    fn query(
        &self,
        targets: &[Query],
        range: TimeRange,
        resolver: &dyn VariableResolver,
    ) -> Result<Vec<Frame>, QueryError> {
        let prepared = prepare_targets(targets, self.settings.edition, resolver)?;

        prepared
            .iter()
            .filter(|target| !target.hide)
            .map(|target| self.graph_frame(&target.ref_id, &target.spec, range))
            .collect()
    }

    fn list_sites(&self, include_all: bool) -> Result<Vec<Choice>, QueryError> {
        let result = self.call(HttpRequest::get(self.action_url("get_user_sites")))?;
        Ok(normalize_sites(result, include_all)?)
    }

    fn test_datasource(&self) -> Result<String, QueryError> {
        let body = build_request_body(&json!({
            "context": {"host": {"host": "ARANDOMNAME"}},
            "single_infos": ["host"],
            "datasource": "services",
        }))?;
        let request = HttpRequest::post(self.action_url("get_combined_graph_identifications"), body)
            .with_header("Content-Type", FORM_CONTENT_TYPE);

        match self.call(request) {
            Ok(_) => {}
            Err(ResponseError::UnsupportedFeature(_)) => match self.settings.edition {
                // Authentication worked, the site simply lacks combined graphs
                Edition::Community => warn!("Combined graphs unsupported, as expected for a community site"),
                Edition::Commercial => {
                    return Err(ResponseError::EditionMismatch(
                        "Mismatch between selected Checkmk edition and monitoring site edition".to_string(),
                    )
                    .into())
                }
            },
            Err(e) => return Err(e.into()),
        }

        Ok("Data source is working".to_string())
    }
}
