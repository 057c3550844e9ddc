// Site, host, service and autocompleter choice lists
// Author: Gabriel Demetrios Lafis

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ResponseError;

/// Label of the sentinel choice matching every site
pub const ALL_SITES_LABEL: &str = "All Sites";

/// A selectable `{label, value}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new<L: Into<String>, V: Into<String>>(label: L, value: V) -> Self {
        Choice {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The "All Sites" sentinel, whose empty value means no site filter
    pub fn all_sites() -> Self {
        Choice::new(ALL_SITES_LABEL, "")
    }
}

fn shape_error(e: serde_json::Error) -> ResponseError {
    ResponseError::Shape(e.to_string())
}

fn with_all_sites(mut choices: Vec<Choice>, include_all: bool) -> Vec<Choice> {
    if include_all {
        choices.insert(0, Choice::all_sites());
    }
    choices
}

/// Drop duplicates and order by label text
pub fn dedup_sorted(mut choices: Vec<Choice>) -> Vec<Choice> {
    choices.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.value.cmp(&b.value)));
    choices.dedup();
    choices
}

/// Sites from a `get_user_sites` result: `[[site_id, alias], ...]`
pub fn normalize_sites(result: JsonValue, include_all: bool) -> Result<Vec<Choice>, ResponseError> {
    let pairs: Vec<(String, String)> = serde_json::from_value(result).map_err(shape_error)?;
    let choices = pairs
        .into_iter()
        .map(|(site_id, alias)| Choice::new(alias, site_id))
        .collect();
    Ok(with_all_sites(choices, include_all))
}

/// Autocompleter result: `{choices: [[value, label], ...]}`, order kept
pub fn normalize_choices(result: JsonValue) -> Result<Vec<Choice>, ResponseError> {
    #[derive(Deserialize)]
    struct Choices {
        choices: Vec<(String, String)>,
    }

    let parsed: Choices = serde_json::from_value(result).map_err(shape_error)?;
    Ok(parsed
        .choices
        .into_iter()
        .map(|(value, label)| Choice::new(label, value))
        .collect())
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SiteConnection {
    extensions: SiteExtensions,
}

#[derive(Debug, Deserialize)]
struct SiteExtensions {
    basic_settings: BasicSettings,
}

#[derive(Debug, Deserialize)]
struct BasicSettings {
    alias: String,
    site_id: String,
}

#[derive(Debug, Deserialize)]
struct HostObject {
    id: String,
    extensions: HostExtensions,
}

#[derive(Debug, Deserialize)]
struct HostExtensions {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServiceObject {
    extensions: ServiceExtensions,
}

#[derive(Debug, Deserialize)]
struct ServiceExtensions {
    description: String,
}

/// Sites from the REST site connection collection
pub fn normalize_rest_sites(body: JsonValue, include_all: bool) -> Result<Vec<Choice>, ResponseError> {
    let collection: Collection<SiteConnection> = serde_json::from_value(body).map_err(shape_error)?;
    let choices = collection
        .value
        .into_iter()
        .map(|site| {
            let settings = site.extensions.basic_settings;
            Choice::new(settings.alias, settings.site_id)
        })
        .collect();
    Ok(with_all_sites(choices, include_all))
}

/// Hosts from the REST host collection, deduplicated and sorted
pub fn normalize_rest_hosts(body: JsonValue) -> Result<Vec<Choice>, ResponseError> {
    let collection: Collection<HostObject> = serde_json::from_value(body).map_err(shape_error)?;
    let choices = collection
        .value
        .into_iter()
        .map(|host| Choice::new(host.extensions.name, host.id))
        .collect();
    Ok(dedup_sorted(choices))
}

/// Services from the REST service collection, deduplicated and sorted.
/// The same description on several hosts collapses into one choice.
pub fn normalize_rest_services(body: JsonValue) -> Result<Vec<Choice>, ResponseError> {
    let collection: Collection<ServiceObject> = serde_json::from_value(body).map_err(shape_error)?;
    let choices = collection
        .value
        .into_iter()
        .map(|service| {
            let description = service.extensions.description;
            Choice::new(description.clone(), description)
        })
        .collect();
    Ok(dedup_sorted(choices))
}
