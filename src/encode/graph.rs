// Graph request builders for the web API and REST dialects
// Author: Gabriel Demetrios Lafis

use log::debug;
use serde::Serialize;

use crate::spec::{aggregation_to_presentation, Aggregation, Context, Edition, GraphType, Presentation, RequestSpec};
use super::{build_context, build_request_body, BackendVersion, EncodeError, TimeRange};

/// Prefix that marks a metric name inside the combined graph identification scheme
pub const METRIC_TEMPLATE_PREFIX: &str = "METRIC_";

/// Kind of graph specification understood by the web API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    Template,
    SingleTimeseries,
    Combined,
}

/// Addresses a predefined graph of a single host/service pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<String>,
}

/// Addresses a single metric of a single host/service pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleTimeseriesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub metric: String,
}

/// Aggregated graph over every object matching the context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedParams {
    pub context: Context,
    pub datasource: String,
    pub single_infos: Vec<String>,
    pub graph_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation: Option<Presentation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphParams {
    Template(TemplateParams),
    SingleTimeseries(SingleTimeseriesParams),
    Combined(CombinedParams),
}

/// `[kind, params]` pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSpecification(pub GraphKind, pub GraphParams);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRange {
    pub time_range: [i64; 2],
}

/// Body of a `get_graph` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRequest {
    pub specification: GraphSpecification,
    pub data_range: DataRange,
}

impl GraphRequest {
    /// Form encoded request body
    pub fn to_body(&self) -> Result<String, EncodeError> {
        build_request_body(self)
    }
}

fn required_graph(spec: &RequestSpec) -> Result<&str, EncodeError> {
    spec.graph.as_deref().ok_or(EncodeError::MissingField("graph"))
}

fn combined_specification(
    spec: &RequestSpec,
    graph_template: String,
    version: Option<&BackendVersion>,
) -> GraphSpecification {
    GraphSpecification(
        GraphKind::Combined,
        GraphParams::Combined(CombinedParams {
            context: build_context(spec, version),
            datasource: "services".to_string(),
            single_infos: vec!["host".to_string()],
            graph_template,
            presentation: spec.aggregation.map(aggregation_to_presentation),
        }),
    )
}

/// Build the graph specification for the given edition.
///
/// Community backends address one host/service pair directly, commercial
/// backends always get a combined graph over the whole context.
pub fn build_graph_specification(
    spec: &RequestSpec,
    edition: Edition,
    version: Option<&BackendVersion>,
) -> Result<GraphSpecification, EncodeError> {
    let graph_type = spec
        .graph_type
        .as_ref()
        .ok_or(EncodeError::MissingField("graph_type"))?;
    if let GraphType::Unknown(mode) = graph_type {
        return Err(EncodeError::UnknownGraphMode(mode.clone()));
    }
    let graph = required_graph(spec)?;

    let specification = match (graph_type, edition) {
        (GraphType::PredefinedGraph, Edition::Commercial) => {
            combined_specification(spec, graph.to_string(), version)
        }
        (GraphType::SingleMetric, Edition::Commercial) => {
            combined_specification(spec, format!("{}{}", METRIC_TEMPLATE_PREFIX, graph), version)
        }
        (GraphType::PredefinedGraph, Edition::Community) => {
            // Numeric graphs were stored by index before templates had names
            let (graph_index, graph_name) = match graph.parse::<u32>() {
                Ok(index) => (Some(index), None),
                Err(_) => (None, Some(graph.to_string())),
            };
            GraphSpecification(
                GraphKind::Template,
                GraphParams::Template(TemplateParams {
                    site: spec.site.clone(),
                    host_name: spec.host_name.clone(),
                    service_description: spec.service.clone(),
                    graph_index,
                    graph_name,
                }),
            )
        }
        (GraphType::SingleMetric, Edition::Community) => GraphSpecification(
            GraphKind::SingleTimeseries,
            GraphParams::SingleTimeseries(SingleTimeseriesParams {
                site: spec.site.clone(),
                host: spec.host_name.clone(),
                service: spec.service.clone(),
                metric: graph.to_string(),
            }),
        ),
        (GraphType::Unknown(mode), _) => return Err(EncodeError::UnknownGraphMode(mode.clone())),
    };

    debug!("Built {:?} graph specification for {}", specification.0, edition);
    Ok(specification)
}

/// Compose the `get_graph` request for a spec and time range
pub fn build_graph_spec(
    spec: &RequestSpec,
    time_range: TimeRange,
    edition: Edition,
    version: Option<&BackendVersion>,
) -> Result<GraphRequest, EncodeError> {
    Ok(GraphRequest {
        specification: build_graph_specification(spec, edition, version)?,
        data_range: DataRange {
            time_range: time_range.as_pair(),
        },
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestTimeRange {
    pub start: String,
    pub end: String,
}

/// Body of the REST metric `get` and `filter` actions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestGraphRequest {
    #[serde(rename = "type")]
    pub graph_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_id: Option<String>,
    pub time_range: RestTimeRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Context>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

impl RestGraphRequest {
    /// Path of the REST action this request is sent to
    pub fn endpoint(&self) -> &'static str {
        if self.filter.is_some() {
            "/domain-types/metric/actions/filter/invoke"
        } else {
            "/domain-types/metric/actions/get/invoke"
        }
    }
}

/// Build the REST graph request for the given edition
pub fn build_rest_graph_request(
    spec: &RequestSpec,
    time_range: TimeRange,
    edition: Edition,
    version: Option<&BackendVersion>,
) -> Result<RestGraphRequest, EncodeError> {
    let graph_type = match &spec.graph_type {
        Some(GraphType::Unknown(mode)) => return Err(EncodeError::UnknownGraphMode(mode.clone())),
        Some(graph_type) => graph_type,
        None => return Err(EncodeError::MissingField("graph_type")),
    };
    let graph = required_graph(spec)?.to_string();
    let (graph_id, metric_id) = match graph_type {
        GraphType::SingleMetric => (None, Some(graph)),
        _ => (Some(graph), None),
    };

    let (start, end) = time_range.to_rfc3339()?;
    let mut request = RestGraphRequest {
        graph_type: graph_type.as_str().to_string(),
        graph_id,
        metric_id,
        time_range: RestTimeRange { start, end },
        site: None,
        host_name: None,
        service_description: None,
        filter: None,
        aggregation: None,
    };

    match edition {
        Edition::Community => {
            request.host_name = Some(spec.host_name.clone().ok_or(EncodeError::MissingField("host_name"))?);
            request.service_description = Some(spec.service.clone().ok_or(EncodeError::MissingField("service"))?);
            // The empty "All Sites" choice must be omitted, not sent
            request.site = spec.site.clone().filter(|site| !site.is_empty());
        }
        Edition::Commercial => {
            request.filter = Some(build_context(spec, version));
            request.aggregation = spec.aggregation;
        }
    }

    Ok(request)
}
