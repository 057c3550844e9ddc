// Legacy migration tests
// Author: Gabriel Demetrios Lafis

use std::fs;

use serde_json::json;

use checkmk_query_engine::{
    encode::build_context,
    spec::{
        migrate, migrate_dashboard, update_query, Aggregation, Context, GraphType, NegatableOption, Params, Query,
        RequestSpec, SpecError, TagOperator,
    },
};

fn legacy_context() -> Context {
    serde_json::from_value(json!({
        "siteopt": {"site": "heute"},
        "host": {"host": "web01"},
        "service": {"service": "CPU load"},
        "host_labels": {"host_label": "[{\"value\":\"os:linux\"},{\"value\":\"cmk/site:heute\"}]"},
        "hostregex": {"host_regex": "^web", "neg_host_regex": "on"},
        "serviceregex": {"service_regex": "CPU"},
        "opthostgroup": {"opthost_group": "linux", "neg_opthost_group": "on"},
        "optservicegroup": {"optservice_group": "cpu"},
        "host_tags": {
            "host_tag_0_grp": "criticality",
            "host_tag_0_op": "is",
            "host_tag_0_val": "prod",
            "host_tag_2_grp": "networking",
            "host_tag_2_op": "isnot",
            "host_tag_2_val": "wan",
        },
    }))
    .unwrap()
}

fn legacy_params() -> Params {
    serde_json::from_value(json!({
        "graphMode": "template",
        "graph_name": "cpu_utilization",
        "presentation": "sum",
    }))
    .unwrap()
}

#[test]
fn test_migrate_legacy_query() {
    let spec = migrate(&legacy_context(), &legacy_params()).unwrap();

    assert_eq!(spec.graph_type, Some(GraphType::PredefinedGraph));
    assert_eq!(spec.aggregation, Some(Aggregation::Sum));
    assert_eq!(spec.site.as_deref(), Some("heute"));
    assert_eq!(spec.host_name.as_deref(), Some("web01"));
    assert_eq!(spec.service.as_deref(), Some("CPU load"));
    assert_eq!(spec.graph.as_deref(), Some("cpu_utilization"));
    assert_eq!(spec.host_name_regex, Some(NegatableOption::new("^web", true)));
    assert_eq!(spec.service_regex, Some(NegatableOption::new("CPU", false)));
    assert_eq!(spec.host_in_group, Some(NegatableOption::new("linux", true)));
    assert_eq!(spec.service_in_group, Some(NegatableOption::new("cpu", false)));
    assert_eq!(
        spec.host_labels,
        Some(vec!["os:linux".to_string(), "cmk/site:heute".to_string()])
    );

    // Slot 1 stays empty, slot 2 keeps its position
    let tags = spec.host_tags.unwrap();
    assert_eq!(tags[0].tag.as_deref(), Some("prod"));
    assert!(tags[1].is_inert());
    assert_eq!(tags[2].group.as_deref(), Some("networking"));
    assert_eq!(tags[2].operator, Some(TagOperator::IsNot));
}

#[test]
fn test_migrate_round_trip() {
    let context = legacy_context();
    let spec = migrate(&context, &legacy_params()).unwrap();

    assert_eq!(build_context(&spec, None), context);
}

#[test]
fn test_migrate_is_deterministic() {
    let first = serde_json::to_string(&migrate(&legacy_context(), &legacy_params()).unwrap()).unwrap();
    let second = serde_json::to_string(&migrate(&legacy_context(), &legacy_params()).unwrap()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_migrate_metric_mode() {
    let params = Params {
        graph_mode: "metric".to_string(),
        graph_name: Some("load1".to_string()),
        presentation: Some("lines".to_string()),
        selections: None,
    };
    let spec = migrate(&Context::default(), &params).unwrap();

    assert_eq!(spec.graph_type, Some(GraphType::SingleMetric));
    assert_eq!(spec.aggregation, Some(Aggregation::Off));
    assert_eq!(spec.site, None);
    assert_eq!(spec.host_tags, None);
}

#[test]
fn test_migrate_rejects_unknown_values() {
    let params = Params {
        graph_mode: "combined".to_string(),
        ..Params::default()
    };
    assert!(matches!(
        migrate(&Context::default(), &params),
        Err(SpecError::GraphModeUnknown(mode)) if mode == "combined"
    ));

    let params = Params {
        graph_mode: "template".to_string(),
        presentation: Some("median".to_string()),
        ..Params::default()
    };
    assert!(matches!(
        migrate(&Context::default(), &params),
        Err(SpecError::UnknownPresentation(_))
    ));
}

#[test]
fn test_incomplete_tag_slot_is_skipped() {
    let context: Context = serde_json::from_value(json!({
        "host_tags": {"host_tag_1_grp": "criticality", "host_tag_1_val": "prod"},
    }))
    .unwrap();
    let params = Params {
        graph_mode: "template".to_string(),
        ..Params::default()
    };

    let tags = migrate(&context, &params).unwrap().host_tags.unwrap();
    assert!(tags.iter().all(|t| t.is_inert()));
}

#[test]
fn test_update_query_replaces_legacy_fields() {
    let mut query = Query {
        ref_id: "A".to_string(),
        context: Some(legacy_context()),
        params: Some(legacy_params()),
        ..Query::default()
    };

    assert!(query.is_legacy());
    assert!(update_query(&mut query).unwrap());
    assert!(query.context.is_none());
    assert!(query.params.is_none());
    assert_eq!(
        query.request_spec.as_ref().and_then(|s| s.graph.as_deref()),
        Some("cpu_utilization")
    );

    // A second pass has nothing left to do
    assert!(!update_query(&mut query).unwrap());
}

#[test]
fn test_update_query_needs_both_legacy_fields() {
    let mut query = Query {
        ref_id: "A".to_string(),
        context: Some(legacy_context()),
        ..Query::default()
    };

    assert!(!update_query(&mut query).unwrap());
    assert!(query.context.is_some());
    assert!(query.request_spec.is_none());
}

#[test]
fn test_failed_update_leaves_query_untouched() {
    let mut query = Query {
        ref_id: "A".to_string(),
        context: Some(legacy_context()),
        params: Some(Params {
            graph_mode: "bogus".to_string(),
            ..Params::default()
        }),
        ..Query::default()
    };
    let before = query.clone();

    assert!(update_query(&mut query).is_err());
    assert_eq!(query, before);
}

#[test]
fn test_migrate_dashboard_file() {
    let dashboard = json!({
        "title": "Servers",
        "panels": [
            {
                "title": "CPU",
                "targets": [
                    {
                        "refId": "A",
                        "datasource": {"type": "checkmk"},
                        "context": {"host": {"host": "web01"}},
                        "params": {"graphMode": "metric", "graph_name": "load1"},
                    },
                    {
                        "refId": "B",
                        "requestSpec": {"graph_type": "predefined_graph", "graph": "cpu"},
                    },
                ],
            },
            {
                "type": "row",
                "panels": [
                    {
                        "targets": [
                            {
                                "refId": "C",
                                "context": {},
                                "params": {"graphMode": "template", "graph_name": "mem"},
                            },
                        ],
                    },
                ],
            },
        ],
    });

    // Write and read back through a file like the migrate command does
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    fs::write(&path, serde_json::to_string(&dashboard).unwrap()).unwrap();

    let mut document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let migrated = migrate_dashboard(&mut document).unwrap();
    assert_eq!(migrated, 2);

    let first = &document["panels"][0]["targets"][0];
    assert!(first.get("context").is_none());
    assert!(first.get("params").is_none());
    assert_eq!(first["requestSpec"]["graph_type"], "single_metric");
    assert_eq!(first["requestSpec"]["host_name"], "web01");
    // Keys owned by the dashboard survive
    assert_eq!(first["datasource"]["type"], "checkmk");

    let untouched = &document["panels"][0]["targets"][1];
    assert_eq!(untouched["requestSpec"]["graph"], "cpu");

    let nested = &document["panels"][1]["panels"][0]["targets"][0];
    assert_eq!(nested["requestSpec"]["graph"], "mem");

    let spec: RequestSpec = serde_json::from_value(nested["requestSpec"].clone()).unwrap();
    assert_eq!(spec.graph_type, Some(GraphType::PredefinedGraph));
}
