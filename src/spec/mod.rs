// Request specification model
// Author: Gabriel Demetrios Lafis

mod legacy;
mod variables;

pub use legacy::*;
pub use variables::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of positional host tag slots in a request specification
pub const HOST_TAG_SLOTS: usize = 3;

/// Canonical, versioned query descriptor.
///
/// Every field is optional: absence means "not filtered on" or "not yet
/// chosen". Values are treated as immutable; the `with_*` methods consume the
/// spec and return an updated copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_type: Option<GraphType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,

    /// Empty string selects all sites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name_regex: Option<NegatableOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_in_group: Option<NegatableOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_tags: Option<[TagValue; HOST_TAG_SLOTS]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_regex: Option<NegatableOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_in_group: Option<NegatableOption>,

    /// Graph template name or metric name, depending on `graph_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
}

impl RequestSpec {
    /// Create a fresh spec with the defaults a new query editor starts from
    pub fn default_query() -> Self {
        RequestSpec {
            graph_type: Some(GraphType::PredefinedGraph),
            aggregation: Some(Aggregation::Off),
            ..RequestSpec::default()
        }
    }

    pub fn with_site<S: Into<String>>(self, site: S) -> Self {
        RequestSpec { site: Some(site.into()), ..self }
    }

    pub fn with_host_name<S: Into<String>>(self, host_name: S) -> Self {
        RequestSpec { host_name: Some(host_name.into()), ..self }
    }

    pub fn with_host_name_regex(self, option: NegatableOption) -> Self {
        RequestSpec { host_name_regex: Some(option), ..self }
    }

    pub fn with_host_in_group(self, option: NegatableOption) -> Self {
        RequestSpec { host_in_group: Some(option), ..self }
    }

    pub fn with_host_labels(self, labels: Vec<String>) -> Self {
        RequestSpec { host_labels: Some(labels), ..self }
    }

    /// Replace a single host tag slot, keeping the other slots in place
    pub fn with_host_tag(self, slot: usize, value: TagValue) -> Self {
        let mut tags = self.host_tags.clone().unwrap_or_default();
        if slot < HOST_TAG_SLOTS {
            tags[slot] = value;
        }
        RequestSpec { host_tags: Some(tags), ..self }
    }

    pub fn with_service<S: Into<String>>(self, service: S) -> Self {
        RequestSpec { service: Some(service.into()), ..self }
    }

    pub fn with_service_regex(self, option: NegatableOption) -> Self {
        RequestSpec { service_regex: Some(option), ..self }
    }

    pub fn with_service_in_group(self, option: NegatableOption) -> Self {
        RequestSpec { service_in_group: Some(option), ..self }
    }

    pub fn with_graph_type(self, graph_type: GraphType) -> Self {
        RequestSpec { graph_type: Some(graph_type), ..self }
    }

    pub fn with_graph<S: Into<String>>(self, graph: S) -> Self {
        RequestSpec { graph: Some(graph.into()), ..self }
    }

    pub fn with_aggregation(self, aggregation: Aggregation) -> Self {
        RequestSpec { aggregation: Some(aggregation), ..self }
    }
}

/// A filter value paired with an inclusion/exclusion flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegatableOption {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub negated: bool,
}

impl NegatableOption {
    pub fn new<S: Into<String>>(value: S, negated: bool) -> Self {
        NegatableOption {
            value: value.into(),
            negated,
        }
    }

    /// An empty value is equivalent to the option not being set at all
    pub fn is_unset(&self) -> bool {
        self.value.is_empty()
    }
}

/// Returns the option only if it is present and carries a value
pub fn active_option(option: &Option<NegatableOption>) -> Option<&NegatableOption> {
    option.as_ref().filter(|o| !o.is_unset())
}

/// Operator of a host tag condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagOperator {
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "isnot")]
    IsNot,
}

impl TagOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagOperator::Is => "is",
            TagOperator::IsNot => "isnot",
        }
    }
}

impl FromStr for TagOperator {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "is" => Ok(TagOperator::Is),
            "isnot" => Ok(TagOperator::IsNot),
            other => Err(SpecError::UnknownTagOperator(other.to_string())),
        }
    }
}

/// One positional host tag slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<TagOperator>,
}

impl TagValue {
    pub fn new<G: Into<String>, T: Into<String>>(group: G, operator: TagOperator, tag: T) -> Self {
        TagValue {
            group: Some(group.into()),
            tag: Some(tag.into()),
            operator: Some(operator),
        }
    }

    /// A slot with no sub-field set contributes nothing to any encoding
    pub fn is_inert(&self) -> bool {
        self.group.is_none() && self.tag.is_none() && self.operator.is_none()
    }
}

/// Selects how `RequestSpec::graph` is interpreted.
///
/// Values outside the two known variants are kept verbatim so that builders
/// can reject them loudly instead of silently defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GraphType {
    PredefinedGraph,
    SingleMetric,
    Unknown(String),
}

impl GraphType {
    pub fn as_str(&self) -> &str {
        match self {
            GraphType::PredefinedGraph => "predefined_graph",
            GraphType::SingleMetric => "single_metric",
            GraphType::Unknown(other) => other,
        }
    }
}

impl From<String> for GraphType {
    fn from(value: String) -> Self {
        match value.as_str() {
            // 'template' and 'metric' were persisted by the first RequestSpec schema
            "predefined_graph" | "template" => GraphType::PredefinedGraph,
            "single_metric" | "metric" => GraphType::SingleMetric,
            _ => GraphType::Unknown(value),
        }
    }
}

impl From<GraphType> for String {
    fn from(value: GraphType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How multiple matched series are combined into lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Aggregation {
    Off,
    Sum,
    Average,
    Minimum,
    Maximum,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Off => "off",
            Aggregation::Sum => "sum",
            Aggregation::Average => "average",
            Aggregation::Minimum => "minimum",
            Aggregation::Maximum => "maximum",
        }
    }
}

impl FromStr for Aggregation {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "lines" => Ok(Aggregation::Off),
            "sum" => Ok(Aggregation::Sum),
            "average" => Ok(Aggregation::Average),
            "minimum" | "min" => Ok(Aggregation::Minimum),
            "maximum" | "max" => Ok(Aggregation::Maximum),
            other => Err(SpecError::UnknownAggregation(other.to_string())),
        }
    }
}

impl TryFrom<String> for Aggregation {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Aggregation> for String {
    fn from(value: Aggregation) -> Self {
        value.as_str().to_string()
    }
}

/// Aggregation as the legacy API and the editor label set name it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    Lines,
    Sum,
    Average,
    Min,
    Max,
}

impl Presentation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presentation::Lines => "lines",
            Presentation::Sum => "sum",
            Presentation::Average => "average",
            Presentation::Min => "min",
            Presentation::Max => "max",
        }
    }
}

impl FromStr for Presentation {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lines" => Ok(Presentation::Lines),
            "sum" => Ok(Presentation::Sum),
            "average" => Ok(Presentation::Average),
            "min" => Ok(Presentation::Min),
            "max" => Ok(Presentation::Max),
            other => Err(SpecError::UnknownPresentation(other.to_string())),
        }
    }
}

impl From<Presentation> for Aggregation {
    fn from(presentation: Presentation) -> Self {
        presentation_to_aggregation(presentation)
    }
}

impl From<Aggregation> for Presentation {
    fn from(aggregation: Aggregation) -> Self {
        aggregation_to_presentation(aggregation)
    }
}

pub fn presentation_to_aggregation(presentation: Presentation) -> Aggregation {
    match presentation {
        Presentation::Lines => Aggregation::Off,
        Presentation::Sum => Aggregation::Sum,
        Presentation::Average => Aggregation::Average,
        Presentation::Min => Aggregation::Minimum,
        Presentation::Max => Aggregation::Maximum,
    }
}

pub fn aggregation_to_presentation(aggregation: Aggregation) -> Presentation {
    match aggregation {
        Aggregation::Off => Presentation::Lines,
        Aggregation::Sum => Presentation::Sum,
        Aggregation::Average => Presentation::Average,
        Aggregation::Minimum => Presentation::Min,
        Aggregation::Maximum => Presentation::Max,
    }
}

/// Capability tier of the monitoring backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Community,
    Commercial,
}

const COMMERCIAL_EDITION_TAGS: &[&str] = &[
    "cee", "cce", "cme", "cse", "pro", "ultimate", "ultimatemt", "cloud",
];

impl Edition {
    /// Map an edition tag as reported by the backend or stored in the
    /// data source settings to its edition family
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.to_lowercase();
        if COMMERCIAL_EDITION_TAGS.contains(&tag.as_str()) {
            Edition::Commercial
        } else {
            Edition::Community
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Edition::Community => "Community Edition",
            Edition::Commercial => "Commercial editions",
        }
    }
}

/// Cloud instances only talk to cloud backends
pub fn is_cloud_edition(tag: &str) -> bool {
    matches!(tag.to_lowercase().as_str(), "cse" | "cloud")
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Names the fields of a request specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecField {
    Aggregation,
    Graph,
    GraphType,
    HostInGroup,
    HostLabels,
    HostName,
    HostNameRegex,
    HostTags,
    Service,
    ServiceInGroup,
    ServiceRegex,
    Site,
}

impl SpecField {
    /// Serialized field name
    pub fn key(&self) -> &'static str {
        match self {
            SpecField::Aggregation => "aggregation",
            SpecField::Graph => "graph",
            SpecField::GraphType => "graph_type",
            SpecField::HostInGroup => "host_in_group",
            SpecField::HostLabels => "host_labels",
            SpecField::HostName => "host_name",
            SpecField::HostNameRegex => "host_name_regex",
            SpecField::HostTags => "host_tags",
            SpecField::Service => "service",
            SpecField::ServiceInGroup => "service_in_group",
            SpecField::ServiceRegex => "service_regex",
            SpecField::Site => "site",
        }
    }

    /// Human readable label, as shown next to the editor input
    pub fn label(&self, spec: &RequestSpec) -> &'static str {
        match self {
            SpecField::Aggregation => "Aggregation",
            SpecField::Graph => match spec.graph_type {
                Some(GraphType::PredefinedGraph) => "Predefined graph",
                _ => "Single metric",
            },
            SpecField::GraphType => "Graph type",
            SpecField::HostInGroup => "Host in group",
            SpecField::HostLabels => "Host labels",
            SpecField::HostName => "Hostname",
            SpecField::HostNameRegex => "Hostname regex",
            SpecField::HostTags => "Host tags",
            SpecField::Service => "Service",
            SpecField::ServiceInGroup => "Service in group",
            SpecField::ServiceRegex => "Service regex",
            SpecField::Site => "Site",
        }
    }
}

/// Represents an error in the spec module
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("graph mode '{0}' is not known")]
    GraphModeUnknown(String),
    #[error("presentation '{0}' is not known")]
    UnknownPresentation(String),
    #[error("aggregation '{0}' is not known")]
    UnknownAggregation(String),
    #[error("tag operator '{0}' is not known")]
    UnknownTagOperator(String),
    #[error("Invalid legacy host labels: {0}")]
    InvalidLegacyLabels(String),
    #[error("Invalid query document: {0}")]
    InvalidDocument(String),
}
