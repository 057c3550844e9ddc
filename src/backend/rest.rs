// REST API driver
// Author: Gabriel Demetrios Lafis

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::encode::{
    build_encoded_url, build_filter_expression, build_rest_graph_request, BackendVersion, EncodeError,
    FilterDomain, LiveStatusQuery, TimeRange,
};
use crate::response::{
    normalize_rest_graph, normalize_rest_hosts, normalize_rest_services, normalize_rest_sites, rest_api_result,
    Choice, Frame, ResponseError,
};
use crate::spec::{substitute, Edition, Query, RequestSpec, VariableResolver};
use super::{has_no_graph, prepare_targets, Backend, DatasourceSettings, HttpRequest, QueryError, Transport};

/// Path of the REST API below the site URL
pub const REST_API_PATH: &str = "/check_mk/api/1.0";

/// First release with the REST graph endpoints
pub const MINIMUM_REST_VERSION: BackendVersion = BackendVersion::new(2, 2, 0);

const OLDEST_SUPPORTED_VERSION: BackendVersion = BackendVersion::new(2, 1, 0);

#[derive(Debug, Deserialize)]
struct VersionInfo {
    versions: Versions,
    edition: String,
}

#[derive(Debug, Deserialize)]
struct Versions {
    checkmk: String,
}

/// Check the version and edition reported by a site against the settings
pub fn check_version(version: &str, edition: &str, configured: Edition) -> Result<(), QueryError> {
    let parsed: BackendVersion = version.parse()?;

    if parsed < OLDEST_SUPPORTED_VERSION {
        return Err(QueryError::UnsupportedVersion(
            "A Checkmk version below 2.1.0 is not supported for this plugin, but you can set the backend to the '< 2.2' version and use at your own risk.".to_string(),
        ));
    }
    if parsed < MINIMUM_REST_VERSION {
        return Err(QueryError::UnsupportedVersion(format!(
            "Checkmk version {} has been detected, but this plugin is configured to use version {} and above. Please set the backend option to '< 2.2'.",
            parsed, MINIMUM_REST_VERSION
        )));
    }
    if configured == Edition::Commercial && Edition::from_tag(edition) == Edition::Community {
        return Err(ResponseError::EditionMismatch(format!(
            "The data source specified a commercial Checkmk edition, but the {} edition was detected. Please choose the community edition in the data source settings.",
            edition
        ))
        .into());
    }

    Ok(())
}

/// Driver for the REST API
pub struct RestApiBackend<T: Transport> {
    settings: DatasourceSettings,
    transport: T,
}

impl<T: Transport> RestApiBackend<T> {
    pub fn new(settings: DatasourceSettings, transport: T) -> Self {
        RestApiBackend { settings, transport }
    }

    pub fn settings(&self) -> &DatasourceSettings {
        &self.settings
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.settings.url, REST_API_PATH, path)
    }

    fn call<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ResponseError> {
        let request = request.with_header("Content-Type", "application/json");
        debug!("REST API request to {}", request.url);
        rest_api_result(self.transport.request(&request))
    }

    fn collection_url(&self, path: &str, filter: &LiveStatusQuery, column: &str) -> Result<String, EncodeError> {
        let mut params = vec![("query".to_string(), serde_json::to_string(&filter.query)?)];
        params.extend(filter.sites.iter().map(|site| ("sites".to_string(), site.clone())));
        params.push(("columns".to_string(), column.to_string()));
        Ok(build_encoded_url(&self.api_url(path), params))
    }

    /// Hosts matching the filter fields of a spec
    pub fn list_hosts(&self, filter: &RequestSpec, resolver: &dyn VariableResolver) -> Result<Vec<Choice>, QueryError> {
        let expression = build_filter_expression(&substitute(filter, resolver), FilterDomain::Host);
        let url = self.collection_url("/domain-types/host/collections/all", &expression, "name")?;
        let body: JsonValue = self.call(HttpRequest::get(url))?;
        Ok(normalize_rest_hosts(body)?)
    }

    /// Service descriptions matching the filter fields of a spec
    pub fn list_services(
        &self,
        filter: &RequestSpec,
        resolver: &dyn VariableResolver,
    ) -> Result<Vec<Choice>, QueryError> {
        let expression = build_filter_expression(&substitute(filter, resolver), FilterDomain::Service);
        let url = self.collection_url("/domain-types/service/collections/all", &expression, "description")?;
        let body: JsonValue = self.call(HttpRequest::get(url))?;
        Ok(normalize_rest_services(body)?)
    }

    fn is_automation_user(&self, username: &str) -> Result<bool, QueryError> {
        let body: JsonValue = self.call(HttpRequest::get(self.api_url(&format!("/objects/user_config/{}", username))))?;
        let auth_type = body
            .pointer("/extensions/auth_option/auth_type")
            .and_then(JsonValue::as_str);
        Ok(auth_type == Some("automation"))
    }

    fn graph_frame(&self, ref_id: &str, spec: &RequestSpec, range: TimeRange) -> Result<Frame, QueryError> {
        if has_no_graph(spec) {
            return Ok(Frame::empty().with_ref_id(ref_id));
        }

        let graph_request =
            build_rest_graph_request(spec, range, self.settings.edition, self.settings.version.as_ref())?;
        let body = serde_json::to_string(&graph_request).map_err(EncodeError::from)?;
        let request = HttpRequest::post(self.api_url(graph_request.endpoint()), body);

        let response: JsonValue = self.call(request)?;
        Ok(normalize_rest_graph(response)?.with_ref_id(ref_id))
    }
}

impl<T: Transport> Backend for RestApiBackend<T> {
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
        let url = build_encoded_url(
            &self.api_url("/domain-types/site_connection/collections/all"),
            [("query", "{}")],
        );
        let body: JsonValue = self.call(HttpRequest::get(url))?;
        Ok(normalize_rest_sites(body, include_all)?)
    }

    fn test_datasource(&self) -> Result<String, QueryError> {
        let info: VersionInfo = self.call(HttpRequest::get(self.api_url("/version")))?;
        check_version(&info.versions.checkmk, &info.edition, self.settings.edition)?;

        // Autocompleters only work for automation users
        if let Some(username) = &self.settings.username {
            if !self.is_automation_user(username)? {
                return Err(QueryError::NotAutomationUser);
            }
        }

        info!("Reached Checkmk {} ({})", info.versions.checkmk, info.edition);
        Ok(format!(
            "Data source is working, reached version {} of checkmk",
            info.versions.checkmk
        ))
    }
}
