// Validation gate for request specifications
// Author: Gabriel Demetrios Lafis

use thiserror::Error;

use crate::spec::{active_option, Edition, NegatableOption, RequestSpec, SpecField};

const COMMUNITY_REQUIRED: [SpecField; 6] = [
    SpecField::Aggregation,
    SpecField::Graph,
    SpecField::GraphType,
    SpecField::HostName,
    SpecField::Service,
    SpecField::Site,
];

const COMMERCIAL_REQUIRED: [SpecField; 3] = [
    SpecField::Aggregation,
    SpecField::Graph,
    SpecField::GraphType,
];

/// Raised before any request is sent; lists every missing field at once
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Serialized names of the missing fields, sorted
    pub missing: Vec<String>,
    pub message: String,
}

/// Fields a spec must carry for the given edition, sorted by name.
///
/// Combined graphs may match many hosts, so commercial editions leave the
/// object fields optional.
pub fn required_fields(edition: Edition) -> Vec<SpecField> {
    let fields: &[SpecField] = match edition {
        Edition::Community => &COMMUNITY_REQUIRED,
        Edition::Commercial => &COMMERCIAL_REQUIRED,
    };
    let mut fields = fields.to_vec();
    fields.sort_by_key(|f| f.key());
    fields
}

fn text_missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn option_missing(option: &Option<NegatableOption>) -> bool {
    active_option(option).is_none()
}

fn is_missing(spec: &RequestSpec, field: SpecField, edition: Edition) -> bool {
    match field {
        SpecField::Aggregation => spec.aggregation.is_none(),
        SpecField::GraphType => spec.graph_type.is_none(),
        SpecField::Graph => text_missing(&spec.graph),
        SpecField::HostName => text_missing(&spec.host_name),
        SpecField::Service => text_missing(&spec.service),
        // The empty site selects every site on community backends
        SpecField::Site if edition == Edition::Community => spec.site.is_none(),
        SpecField::Site => text_missing(&spec.site),
        SpecField::HostNameRegex => option_missing(&spec.host_name_regex),
        SpecField::HostInGroup => option_missing(&spec.host_in_group),
        SpecField::ServiceRegex => option_missing(&spec.service_regex),
        SpecField::ServiceInGroup => option_missing(&spec.service_in_group),
        SpecField::HostLabels => spec.host_labels.as_ref().map_or(true, Vec::is_empty),
        SpecField::HostTags => spec
            .host_tags
            .as_ref()
            .map_or(true, |tags| tags.iter().all(|t| t.is_inert())),
    }
}

/// Required fields the spec leaves unset, sorted by name
pub fn missing_fields(spec: &RequestSpec, edition: Edition) -> Vec<SpecField> {
    required_fields(edition)
        .into_iter()
        .filter(|field| is_missing(spec, *field, edition))
        .collect()
}

/// Check that every field required by the edition carries a value
pub fn validate(spec: &RequestSpec, edition: Edition) -> Result<(), ValidationError> {
    let missing = missing_fields(spec, edition);
    if missing.is_empty() {
        return Ok(());
    }

    let labels: Vec<&str> = missing.iter().map(|f| f.label(spec)).collect();
    Err(ValidationError {
        missing: missing.iter().map(|f| f.key().to_string()).collect(),
        message: format!(
            "Please specify a value for the following fields: {}",
            labels.join(", ")
        ),
    })
}
