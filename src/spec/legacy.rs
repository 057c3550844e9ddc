// Legacy context/params shapes and their migration
// Author: Gabriel Demetrios Lafis

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{
    presentation_to_aggregation, GraphType, NegatableOption, Presentation, RequestSpec, SpecError,
    TagOperator, TagValue, HOST_TAG_SLOTS,
};

/// Defines a context entry holding a negatable value under backend specific keys
macro_rules! negatable_context {
    ($name:ident, $value_key:literal, $neg_key:literal) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(rename = $value_key, default, skip_serializing_if = "Option::is_none")]
            pub value: Option<String>,
            #[serde(rename = $neg_key, default, skip_serializing_if = "Option::is_none")]
            pub negated: Option<String>,
        }

        impl $name {
            pub fn from_option(option: &NegatableOption) -> Self {
                $name {
                    value: Some(option.value.clone()),
                    negated: if option.negated { Some("on".to_string()) } else { None },
                }
            }

            pub fn to_option(&self) -> NegatableOption {
                NegatableOption {
                    value: self.value.clone().unwrap_or_default(),
                    negated: self.negated.as_deref() == Some("on"),
                }
            }
        }
    };
}

negatable_context!(HostRegexContext, "host_regex", "neg_host_regex");
negatable_context!(ServiceRegexContext, "service_regex", "neg_service_regex");
negatable_context!(HostGroupContext, "opthost_group", "neg_opthost_group");
negatable_context!(ServiceGroupContext, "optservice_group", "neg_optservice_group");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// Host label filter, in one of the two wire encodings the backend understood
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostLabelsContext {
    /// `host_label` holds a JSON encoded array of `{"value": "key:value"}`
    Json { host_label: String },
    /// `host_labels_{n}_...` boolean tree, written for older backends only
    Indexed(BTreeMap<String, String>),
}

#[derive(Debug, Deserialize, Serialize)]
struct LegacyLabel {
    value: String,
}

impl HostLabelsContext {
    pub fn from_labels(labels: &[String]) -> Self {
        let entries: Vec<LegacyLabel> = labels
            .iter()
            .map(|label| LegacyLabel { value: label.clone() })
            .collect();
        // Serializing plain strings into a JSON array cannot fail
        let host_label = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
        HostLabelsContext::Json { host_label }
    }

    /// Boolean tree encoding: a single AND group holding one AND-ed entry per label
    pub fn indexed_from_labels(labels: &[String]) -> Self {
        let mut tree = BTreeMap::new();
        tree.insert("host_labels_count".to_string(), "1".to_string());
        tree.insert("host_labels_1_bool".to_string(), "and".to_string());
        tree.insert("host_labels_1_vs_count".to_string(), labels.len().to_string());

        for (i, label) in labels.iter().enumerate() {
            let n = i + 1;
            tree.insert(format!("host_labels_1_vs_{}_bool", n), "and".to_string());
            tree.insert(format!("host_labels_1_vs_{}_vs", n), label.clone());
        }

        HostLabelsContext::Indexed(tree)
    }

    /// Decode the label list. Only the JSON form is read back.
    pub fn labels(&self) -> Result<Option<Vec<String>>, SpecError> {
        match self {
            HostLabelsContext::Json { host_label } => {
                let entries: Vec<LegacyLabel> = serde_json::from_str(host_label)
                    .map_err(|e| SpecError::InvalidLegacyLabels(e.to_string()))?;
                Ok(Some(entries.into_iter().map(|l| l.value).collect()))
            }
            HostLabelsContext::Indexed(_) => {
                warn!("Ignoring indexed host label encoding in legacy context");
                Ok(None)
            }
        }
    }
}

/// One legacy host tag entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyTagSlot {
    pub group: Option<String>,
    pub operator: Option<String>,
    pub value: Option<String>,
}

/// Legacy host tag filter with three positional slots.
///
/// On the wire the slots are flattened to `host_tag_{i}_grp`, `_op` and `_val`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct HostTagsContext {
    pub slots: [LegacyTagSlot; HOST_TAG_SLOTS],
}

impl From<BTreeMap<String, String>> for HostTagsContext {
    fn from(mut map: BTreeMap<String, String>) -> Self {
        let mut slots: [LegacyTagSlot; HOST_TAG_SLOTS] = Default::default();
        for (i, slot) in slots.iter_mut().enumerate() {
            slot.group = map.remove(&format!("host_tag_{}_grp", i));
            slot.operator = map.remove(&format!("host_tag_{}_op", i));
            slot.value = map.remove(&format!("host_tag_{}_val", i));
        }
        HostTagsContext { slots }
    }
}

impl From<HostTagsContext> for BTreeMap<String, String> {
    fn from(tags: HostTagsContext) -> Self {
        let mut map = BTreeMap::new();
        for (i, slot) in tags.slots.into_iter().enumerate() {
            if let Some(group) = slot.group {
                map.insert(format!("host_tag_{}_grp", i), group);
            }
            if let Some(operator) = slot.operator {
                map.insert(format!("host_tag_{}_op", i), operator);
            }
            if let Some(value) = slot.value {
                map.insert(format!("host_tag_{}_val", i), value);
            }
        }
        map
    }
}

/// Backend style nested filter object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub siteopt: Option<SiteContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_labels: Option<HostLabelsContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostregex: Option<HostRegexContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serviceregex: Option<ServiceRegexContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opthostgroup: Option<HostGroupContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optservicegroup: Option<ServiceGroupContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_tags: Option<HostTagsContext>,
}

/// Legacy graph selection fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(rename = "graphMode", default)]
    pub graph_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selections: Option<JsonValue>,
}

fn graph_mode_to_graph_type(graph_mode: &str) -> Result<GraphType, SpecError> {
    match graph_mode {
        "template" => Ok(GraphType::PredefinedGraph),
        "metric" => Ok(GraphType::SingleMetric),
        other => Err(SpecError::GraphModeUnknown(other.to_string())),
    }
}

fn migrate_host_tags(tags: &HostTagsContext) -> Result<[TagValue; HOST_TAG_SLOTS], SpecError> {
    let mut result: [TagValue; HOST_TAG_SLOTS] = Default::default();
    for (i, slot) in tags.slots.iter().enumerate() {
        // Slots are positional: incomplete entries stay empty in place
        if let (Some(group), Some(operator), Some(tag)) = (&slot.group, &slot.operator, &slot.value) {
            result[i] = TagValue {
                group: Some(group.clone()),
                tag: Some(tag.clone()),
                operator: Some(operator.parse::<TagOperator>()?),
            };
        }
    }
    Ok(result)
}

/// Convert a legacy context/params pair into a request specification.
///
/// Pure and deterministic; deciding to drop the legacy fields is up to the caller.
pub fn migrate(context: &Context, params: &Params) -> Result<RequestSpec, SpecError> {
    let host_labels = match &context.host_labels {
        Some(labels) => labels.labels()?,
        None => None,
    };

    let host_tags = match &context.host_tags {
        Some(tags) => Some(migrate_host_tags(tags)?),
        None => None,
    };

    let aggregation = match &params.presentation {
        Some(presentation) => Some(presentation_to_aggregation(presentation.parse::<Presentation>()?)),
        None => None,
    };

    Ok(RequestSpec {
        graph_type: Some(graph_mode_to_graph_type(&params.graph_mode)?),
        aggregation,
        site: context.siteopt.as_ref().and_then(|s| s.site.clone()),
        host_name: context.host.as_ref().and_then(|h| h.host.clone()),
        host_name_regex: context.hostregex.as_ref().map(HostRegexContext::to_option),
        host_in_group: context.opthostgroup.as_ref().map(HostGroupContext::to_option),
        host_labels,
        host_tags,
        service: context.service.as_ref().and_then(|s| s.service.clone()),
        service_regex: context.serviceregex.as_ref().map(ServiceRegexContext::to_option),
        service_in_group: context.optservicegroup.as_ref().map(ServiceGroupContext::to_option),
        graph: params.graph_name.clone(),
    })
}

/// A stored panel query as persisted in a dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "refId", default)]
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hide: bool,
    #[serde(rename = "requestSpec", default, skip_serializing_if = "Option::is_none")]
    pub request_spec: Option<RequestSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Keys owned by the dashboard, carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl Query {
    pub fn new<S: Into<String>>(ref_id: S, request_spec: RequestSpec) -> Self {
        Query {
            ref_id: ref_id.into(),
            request_spec: Some(request_spec),
            ..Query::default()
        }
    }

    /// Legacy data is recognised by context and params being present together
    pub fn is_legacy(&self) -> bool {
        self.context.is_some() && self.params.is_some()
    }
}

/// Replace legacy context/params of a query by a request specification.
///
/// Either the whole migration succeeds and both legacy fields are dropped, or
/// the query is left untouched. Returns whether a migration happened.
pub fn update_query(query: &mut Query) -> Result<bool, SpecError> {
    let spec = match (&query.context, &query.params) {
        (Some(context), Some(params)) => migrate(context, params)?,
        _ => return Ok(false),
    };

    info!("Migrated legacy query '{}' to request specification", query.ref_id);
    query.request_spec = Some(spec);
    query.context = None;
    query.params = None;
    Ok(true)
}

/// Migrate every panel target of a dashboard document in place.
///
/// Returns the number of migrated targets.
pub fn migrate_dashboard(dashboard: &mut JsonValue) -> Result<usize, SpecError> {
    let mut migrated = 0;
    visit_panels(dashboard, &mut migrated)?;
    Ok(migrated)
}

fn visit_panels(node: &mut JsonValue, migrated: &mut usize) -> Result<(), SpecError> {
    let object = match node.as_object_mut() {
        Some(object) => object,
        None => return Ok(()),
    };

    if let Some(JsonValue::Array(targets)) = object.get_mut("targets") {
        for target in targets.iter_mut() {
            // Targets of other data sources are left alone
            if target.get("context").is_none() || target.get("params").is_none() {
                continue;
            }
            let mut query: Query = serde_json::from_value(target.clone())
                .map_err(|e| SpecError::InvalidDocument(e.to_string()))?;
            if update_query(&mut query)? {
                *target = serde_json::to_value(&query)
                    .map_err(|e| SpecError::InvalidDocument(e.to_string()))?;
                *migrated += 1;
            }
        }
    }

    // Rows nest their panels
    if let Some(JsonValue::Array(panels)) = object.get_mut("panels") {
        for panel in panels.iter_mut() {
            visit_panels(panel, migrated)?;
        }
    }

    debug!("Dashboard node visited, {} targets migrated so far", migrated);
    Ok(())
}
