// Template variable substitution
// Author: Gabriel Demetrios Lafis

use std::collections::HashMap;

use super::{NegatableOption, RequestSpec, TagValue};

/// Resolves every variable placeholder embedded in a piece of text
pub trait VariableResolver {
    /// Return the text with all placeholders replaced. Called once per
    /// string leaf, the result is not resolved again.
    fn resolve(&self, text: &str) -> String;
}

impl<F> VariableResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve(&self, text: &str) -> String {
        self(text)
    }
}

/// Named variable values, replacing `$name` and `${name}` placeholders
#[derive(Debug, Clone, Default)]
pub struct TemplateVariables {
    values: HashMap<String, String>,
}

impl TemplateVariables {
    /// Create an empty variable set
    pub fn new() -> Self {
        TemplateVariables {
            values: HashMap::new(),
        }
    }

    /// Add a variable, builder style
    pub fn with<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.values.get(name)
    }
}

impl From<HashMap<String, String>> for TemplateVariables {
    fn from(values: HashMap<String, String>) -> Self {
        TemplateVariables { values }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl VariableResolver for TemplateVariables {
    fn resolve(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            result.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            // ${name}
            if let Some(braced) = after.strip_prefix('{') {
                if let Some(end) = braced.find('}') {
                    let name = &braced[..end];
                    match self.values.get(name) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(&rest[pos..pos + end + 3]),
                    }
                    rest = &braced[end + 1..];
                    continue;
                }
            }

            // $name
            let len = after
                .char_indices()
                .find(|(_, c)| !is_name_char(*c))
                .map(|(i, _)| i)
                .unwrap_or(after.len());
            let name = &after[..len];
            match self.values.get(name) {
                Some(value) if !name.is_empty() => result.push_str(value),
                _ => {
                    result.push('$');
                    result.push_str(name);
                }
            }
            rest = &after[len..];
        }

        result.push_str(rest);
        result
    }
}

fn resolve_option<R: VariableResolver + ?Sized>(value: &Option<String>, resolver: &R) -> Option<String> {
    value.as_ref().map(|v| resolver.resolve(v))
}

fn resolve_negatable<R: VariableResolver + ?Sized>(
    option: &Option<NegatableOption>,
    resolver: &R,
) -> Option<NegatableOption> {
    option.as_ref().map(|o| NegatableOption {
        value: resolver.resolve(&o.value),
        negated: o.negated,
    })
}

fn resolve_tag<R: VariableResolver + ?Sized>(tag: &TagValue, resolver: &R) -> TagValue {
    TagValue {
        group: resolve_option(&tag.group, resolver),
        tag: resolve_option(&tag.tag, resolver),
        operator: tag.operator,
    }
}

/// Replace variable placeholders in every string leaf of a request spec.
///
/// Enumerations, negation flags and tag operators are never touched.
pub fn substitute<R: VariableResolver + ?Sized>(spec: &RequestSpec, resolver: &R) -> RequestSpec {
    RequestSpec {
        graph_type: spec.graph_type.clone(),
        aggregation: spec.aggregation,
        site: resolve_option(&spec.site, resolver),
        host_name: resolve_option(&spec.host_name, resolver),
        host_name_regex: resolve_negatable(&spec.host_name_regex, resolver),
        host_in_group: resolve_negatable(&spec.host_in_group, resolver),
        host_labels: spec
            .host_labels
            .as_ref()
            .map(|labels| labels.iter().map(|l| resolver.resolve(l)).collect()),
        host_tags: spec.host_tags.as_ref().map(|tags| {
            [
                resolve_tag(&tags[0], resolver),
                resolve_tag(&tags[1], resolver),
                resolve_tag(&tags[2], resolver),
            ]
        }),
        service: resolve_option(&spec.service, resolver),
        service_regex: resolve_negatable(&spec.service_regex, resolver),
        service_in_group: resolve_negatable(&spec.service_in_group, resolver),
        graph: resolve_option(&spec.graph, resolver),
    }
}
