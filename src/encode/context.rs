// Legacy compatible context builder
// Author: Gabriel Demetrios Lafis

use log::debug;

use crate::spec::{
    active_option, Context, HostContext, HostGroupContext, HostLabelsContext, HostRegexContext,
    HostTagsContext, LegacyTagSlot, RequestSpec, ServiceContext, ServiceGroupContext,
    ServiceRegexContext, SiteContext,
};
use super::BackendVersion;

fn build_host_tags(spec: &RequestSpec) -> Option<HostTagsContext> {
    let tags = spec.host_tags.as_ref()?;
    if tags.iter().all(|t| t.is_inert()) {
        return None;
    }

    let mut context = HostTagsContext::default();
    for (slot, tag) in context.slots.iter_mut().zip(tags.iter()) {
        *slot = LegacyTagSlot {
            group: tag.group.clone(),
            operator: tag.operator.map(|op| op.as_str().to_string()),
            value: tag.tag.clone(),
        };
    }
    Some(context)
}

fn build_host_labels(labels: &[String], version: Option<&BackendVersion>) -> HostLabelsContext {
    match version {
        Some(v) if v.requires_indexed_labels() => {
            debug!("Backend {} gets indexed host label encoding", v);
            HostLabelsContext::indexed_from_labels(labels)
        }
        _ => HostLabelsContext::from_labels(labels),
    }
}

/// Build the nested legacy filter object for a request spec.
///
/// Mirrors the migration rules in reverse. The host label encoding depends on
/// the backend version, when one is known.
pub fn build_context(spec: &RequestSpec, version: Option<&BackendVersion>) -> Context {
    let host_labels = spec
        .host_labels
        .as_ref()
        .filter(|labels| !labels.is_empty())
        .map(|labels| build_host_labels(labels, version));

    Context {
        siteopt: spec.site.as_ref().map(|site| SiteContext {
            site: Some(site.clone()),
        }),
        host: spec.host_name.as_ref().map(|host| HostContext {
            host: Some(host.clone()),
        }),
        service: spec.service.as_ref().map(|service| ServiceContext {
            service: Some(service.clone()),
        }),
        host_labels,
        hostregex: active_option(&spec.host_name_regex).map(HostRegexContext::from_option),
        serviceregex: active_option(&spec.service_regex).map(ServiceRegexContext::from_option),
        opthostgroup: active_option(&spec.host_in_group).map(HostGroupContext::from_option),
        optservicegroup: active_option(&spec.service_in_group).map(ServiceGroupContext::from_option),
        host_tags: build_host_tags(spec),
    }
}
