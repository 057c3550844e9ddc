// Live-query filter expressions for the REST API
// Author: Gabriel Demetrios Lafis

use log::warn;
use serde::{Deserialize, Serialize};

use crate::spec::{active_option, NegatableOption, RequestSpec, TagOperator};

/// Table a filter expression is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDomain {
    Host,
    Service,
}

impl FilterDomain {
    /// Column prefix for fields inherited from the host
    fn host_prefix(&self) -> &'static str {
        match self {
            FilterDomain::Host => "hosts.",
            FilterDomain::Service => "services.host_",
        }
    }
}

/// A single `left op right` condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpr {
    pub left: String,
    pub op: String,
    pub right: String,
}

impl FilterExpr {
    fn new<L: Into<String>, O: Into<String>, R: Into<String>>(left: L, op: O, right: R) -> Self {
        FilterExpr {
            left: left.into(),
            op: op.into(),
            right: right.into(),
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub op: String,
    pub expr: Vec<FilterExpr>,
}

/// Filter body sent to the REST collection endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatusQuery {
    pub sites: Vec<String>,
    pub query: FilterQuery,
}

fn negatable_operator(operator: &str, option: &NegatableOption) -> String {
    if option.negated {
        format!("!{}", operator)
    } else {
        operator.to_string()
    }
}

fn quoted_pair(key: &str, value: &str) -> String {
    format!("'{}' '{}'", key, value)
}

/// Build the live-query filter for hosts or services.
///
/// Conditions are emitted in a fixed field order; service fields only take
/// part for the service domain.
pub fn build_filter_expression(spec: &RequestSpec, domain: FilterDomain) -> LiveStatusQuery {
    let prefix = domain.host_prefix();
    let mut expr = Vec::new();

    let sites = match &spec.site {
        Some(site) if !site.is_empty() => vec![site.clone()],
        _ => Vec::new(),
    };

    if let Some(host_name) = &spec.host_name {
        expr.push(FilterExpr::new(format!("{}name", prefix), "=", host_name.as_str()));
    }

    if let Some(regex) = active_option(&spec.host_name_regex) {
        expr.push(FilterExpr::new(
            format!("{}name", prefix),
            negatable_operator("~~", regex),
            regex.value.as_str(),
        ));
    }

    if let Some(group) = active_option(&spec.host_in_group) {
        expr.push(FilterExpr::new(
            format!("{}groups", prefix),
            negatable_operator(">=", group),
            group.value.as_str(),
        ));
    }

    if let Some(labels) = &spec.host_labels {
        for label in labels {
            let (key, value) = label.split_once(':').unwrap_or((label.as_str(), ""));
            expr.push(FilterExpr::new(format!("{}labels", prefix), "=", quoted_pair(key, value)));
        }
    }

    if let Some(tags) = &spec.host_tags {
        for tag in tags.iter() {
            // Half-filled slots are skipped; the operator does not pick '=' or '!='
            if let (Some(group), Some(operator), Some(value)) = (&tag.group, &tag.operator, &tag.tag) {
                if *operator == TagOperator::IsNot {
                    warn!("Host tag '{}' uses 'isnot', encoding it as '='", group);
                }
                expr.push(FilterExpr::new(format!("{}tags", prefix), "=", quoted_pair(group, value)));
            }
        }
    }

    if domain == FilterDomain::Service {
        if let Some(service) = &spec.service {
            expr.push(FilterExpr::new("services.description", "=", service.as_str()));
        }

        if let Some(regex) = active_option(&spec.service_regex) {
            expr.push(FilterExpr::new(
                "services.description",
                negatable_operator("~~", regex),
                regex.value.as_str(),
            ));
        }

        if let Some(group) = active_option(&spec.service_in_group) {
            expr.push(FilterExpr::new(
                "services.groups",
                negatable_operator(">=", group),
                group.value.as_str(),
            ));
        }
    }

    LiveStatusQuery {
        sites,
        query: FilterQuery {
            op: "and".to_string(),
            expr,
        },
    }
}
