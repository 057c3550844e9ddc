// Backend driver tests
// Author: Gabriel Demetrios Lafis

use mockall::mock;
use mockall::predicate::always;
use serde_json::json;

use checkmk_query_engine::{
    backend::{
        check_version, create_backend, Backend, BackendKind, DatasourceSettings, HttpRequest, Method, QueryError,
        RestApiBackend, Transport, WebApiBackend,
    },
    encode::{BackendVersion, TimeRange},
    response::{Choice, Frame, RawResponse, ResponseError, TransportFailure, Value},
    spec::{
        Aggregation, Context, Edition, GraphType, HostContext, NegatableOption, Params, Query, RequestSpec,
        TemplateVariables,
    },
};

mock! {
    pub Transport {}

    impl Transport for Transport {
        fn request(&self, request: &HttpRequest) -> Result<RawResponse, TransportFailure>;
    }
}

const SITE_URL: &str = "https://monitoring.example/heute";

fn settings(edition: Edition) -> DatasourceSettings {
    DatasourceSettings::new(format!("{}/", SITE_URL), edition)
}

fn no_variables() -> TemplateVariables {
    TemplateVariables::new()
}

fn web_graph_envelope() -> serde_json::Value {
    json!({
        "result_code": 0,
        "result": {
            "start_time": 1000,
            "end_time": 1120,
            "step": 60,
            "curves": [{"title": "load1", "rrddata": [0.5, 0.25]}],
        },
    })
}

fn commercial_target(ref_id: &str) -> Query {
    Query::new(
        ref_id,
        RequestSpec::default_query()
            .with_graph_type(GraphType::SingleMetric)
            .with_aggregation(Aggregation::Sum)
            .with_host_name("$host")
            .with_graph("load1"),
    )
}

#[test]
fn test_settings_trim_trailing_slash() {
    assert_eq!(settings(Edition::Community).url, SITE_URL);
}

#[test]
fn test_web_query_posts_graph_request() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| {
            request.method == Method::Post
                && request.url == format!("{}/check_mk/webapi.py?action=get_graph", SITE_URL)
                && request.header("content-type") == Some("application/x-www-form-urlencoded")
                && request.body.as_deref().map_or(false, |body| {
                    body.starts_with(r#"request={"specification":["combined","#)
                        && body.contains(r#""graph_template":"METRIC_load1""#)
                        && body.contains(r#""host":{"host":"web01"}"#)
                })
        })
        .times(1)
        .returning(|_| Ok(RawResponse::ok(web_graph_envelope())));

    let backend = WebApiBackend::new(settings(Edition::Commercial), transport);
    let variables = TemplateVariables::new().with("host", "web01");

    let frames = backend
        .query(&[commercial_target("A")], TimeRange::new(1000, 1120), &variables)
        .unwrap();

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ref_id.as_deref(), Some("A"));
    assert_eq!(frames[0].field_names(), vec!["Time", "load1"]);
    assert_eq!(frames[0].rows[1].get(0), Some(&Value::Time(1_060_000)));
}

#[test]
fn test_web_query_migrates_legacy_targets() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| {
            request.body.as_deref().map_or(false, |body| {
                body.contains(r#""context":{"host":{"host":"web01"}}"#)
                    && body.contains(r#""graph_template":"cpu""#)
                    && body.contains(r#""presentation":"lines""#)
            })
        })
        .times(1)
        .returning(|_| Ok(RawResponse::ok(web_graph_envelope())));

    let target = Query {
        ref_id: "B".to_string(),
        context: Some(Context {
            host: Some(HostContext {
                host: Some("web01".to_string()),
            }),
            ..Context::default()
        }),
        params: Some(Params {
            graph_mode: "template".to_string(),
            graph_name: Some("cpu".to_string()),
            presentation: Some("lines".to_string()),
            selections: None,
        }),
        ..Query::default()
    };

    let backend = WebApiBackend::new(settings(Edition::Commercial), transport);
    let frames = backend.query(&[target], TimeRange::new(0, 60), &no_variables()).unwrap();

    assert_eq!(frames[0].ref_id.as_deref(), Some("B"));
}

#[test]
fn test_empty_graph_fails_validation() {
    let mut transport = MockTransport::new();
    transport.expect_request().times(0);

    let target = Query::new(
        "C",
        RequestSpec::default_query().with_host_name("web01").with_graph(""),
    );
    let backend = WebApiBackend::new(settings(Edition::Commercial), transport);

    let error = backend.query(&[target], TimeRange::new(0, 60), &no_variables()).unwrap_err();
    assert!(matches!(error, QueryError::Validation(_)));
}

#[test]
fn test_validation_runs_before_any_request() {
    let mut transport = MockTransport::new();
    transport.expect_request().times(0);

    let incomplete = Query::new("B", RequestSpec::default_query().with_host_name("web01"));
    let backend = WebApiBackend::new(settings(Edition::Community), transport);

    let error = backend
        .query(&[incomplete], TimeRange::new(0, 60), &no_variables())
        .unwrap_err();

    match error {
        QueryError::Validation(error) => {
            assert_eq!(error.missing, vec!["graph", "service", "site"]);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_graph_resolving_to_nothing_renders_no_data() {
    let mut transport = MockTransport::new();
    transport.expect_request().times(0);

    let target = Query::new("C", RequestSpec::default_query().with_graph("$graph"));
    let variables = TemplateVariables::new().with("graph", "");
    let backend = RestApiBackend::new(settings(Edition::Commercial), transport);

    let frames = backend.query(&[target], TimeRange::new(0, 60), &variables).unwrap();

    assert_eq!(frames, vec![Frame::empty().with_ref_id("C")]);
}

#[test]
fn test_hidden_targets_are_skipped() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .times(1)
        .returning(|_| Ok(RawResponse::ok(web_graph_envelope())));

    let mut hidden = commercial_target("B");
    hidden.hide = true;

    let backend = WebApiBackend::new(settings(Edition::Commercial), transport);
    let frames = backend
        .query(&[commercial_target("A"), hidden], TimeRange::new(0, 60), &no_variables())
        .unwrap();

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].ref_id.as_deref(), Some("A"));
}

#[test]
fn test_web_query_surfaces_backend_errors() {
    let mut transport = MockTransport::new();
    transport.expect_request().returning(|_| {
        Ok(RawResponse::ok(json!({
            "result_code": 1,
            "result": "Sorry, you cannot create combined graphs for more than 100 objects",
        })))
    });

    let backend = WebApiBackend::new(settings(Edition::Commercial), transport);
    let error = backend
        .query(&[commercial_target("A")], TimeRange::new(0, 60), &no_variables())
        .unwrap_err();

    assert!(matches!(error, QueryError::Response(ResponseError::ResultSizeLimit)));
}

#[test]
fn test_web_list_sites() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| {
            request.method == Method::Get && request.url.ends_with("/check_mk/webapi.py?action=get_user_sites")
        })
        .returning(|_| Ok(RawResponse::ok(json!({"result_code": 0, "result": [["heute", "Heute"]]}))));

    let backend = WebApiBackend::new(settings(Edition::Community), transport);
    let sites = backend.list_sites(true).unwrap();

    assert_eq!(sites, vec![Choice::all_sites(), Choice::new("Heute", "heute")]);
}

fn unsupported_edition_transport() -> MockTransport {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| request.url.ends_with("action=get_combined_graph_identifications"))
        .returning(|_| {
            Ok(RawResponse::ok(json!({
                "result_code": 1,
                "result": "Checkmk exception: Currently not supported with this Checkmk Edition\nDetails",
            })))
        });
    transport
}

#[test]
fn test_web_datasource_probe_on_community_site() {
    let backend = WebApiBackend::new(settings(Edition::Community), unsupported_edition_transport());

    assert_eq!(backend.test_datasource().unwrap(), "Data source is working");
}

#[test]
fn test_web_datasource_probe_detects_edition_mismatch() {
    let backend = WebApiBackend::new(settings(Edition::Commercial), unsupported_edition_transport());

    let error = backend.test_datasource().unwrap_err();
    assert!(matches!(error, QueryError::Response(ResponseError::EditionMismatch(_))));
}

#[test]
fn test_web_datasource_probe_reports_transport_errors() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .with(always())
        .returning(|_| Err(TransportFailure::status(410)));

    let backend = WebApiBackend::new(settings(Edition::Community), transport);
    let error = backend.test_datasource().unwrap_err();

    assert!(matches!(error, QueryError::Response(ResponseError::LegacyApiUnavailable)));
}

fn rest_graph_body() -> serde_json::Value {
    json!({
        "time_range": {"start": "1970-01-01T00:00:00+00:00", "end": "1970-01-01T00:01:00+00:00"},
        "step": 60,
        "metrics": [{"title": "Load", "color": "#123456", "data_points": [1.0, 2.0]}],
    })
}

#[test]
fn test_rest_query_uses_filter_endpoint() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| {
            request.url == format!("{}/check_mk/api/1.0/domain-types/metric/actions/filter/invoke", SITE_URL)
                && request.header("Content-Type") == Some("application/json")
                && request.body.as_deref().map_or(false, |body| {
                    let value: serde_json::Value = serde_json::from_str(body).unwrap();
                    value["filter"] == json!({"host": {"host": "web01"}}) && value["aggregation"] == "sum"
                })
        })
        .times(1)
        .returning(|_| Ok(RawResponse::ok(rest_graph_body())));

    let backend = RestApiBackend::new(settings(Edition::Commercial), transport);
    let variables = TemplateVariables::new().with("host", "web01");
    let frames = backend
        .query(&[commercial_target("A")], TimeRange::new(0, 60), &variables)
        .unwrap();

    assert_eq!(frames[0].field_names(), vec!["Time", "Load"]);
    assert_eq!(frames[0].len(), 2);
}

#[test]
fn test_rest_query_without_graph_endpoints() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .returning(|_| Err(TransportFailure::status(404)));

    let backend = RestApiBackend::new(settings(Edition::Commercial), transport);
    let error = backend
        .query(&[commercial_target("A")], TimeRange::new(0, 60), &no_variables())
        .unwrap_err();

    assert!(matches!(error, QueryError::Response(ResponseError::GraphEndpointsUnavailable)));
}

/// Decoded query parameters of a request URL, in order
fn query_params(url: &str) -> Vec<(String, String)> {
    let (_, query) = url.split_once('?').unwrap_or((url, ""));
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (urlencoding::decode(key).unwrap().into_owned(), urlencoding::decode(value).unwrap().into_owned())
        })
        .collect()
}

fn query_param(url: &str, key: &str) -> Option<String> {
    query_params(url).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn filter_param(url: &str) -> serde_json::Value {
    serde_json::from_str(&query_param(url, "query").unwrap()).unwrap()
}

#[test]
fn test_rest_list_hosts_sends_filter() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| {
            request.url.starts_with(&format!("{}/check_mk/api/1.0/domain-types/host/collections/all?", SITE_URL))
                && filter_param(&request.url)
                    == json!({"op": "and", "expr": [{"left": "hosts.name", "op": "=", "right": "web01"}]})
                && query_param(&request.url, "sites").as_deref() == Some("heute")
                && query_param(&request.url, "columns").as_deref() == Some("name")
        })
        .returning(|_| {
            Ok(RawResponse::ok(json!({
                "value": [
                    {"id": "web01", "extensions": {"name": "web01"}},
                    {"id": "web01", "extensions": {"name": "web01"}},
                ],
            })))
        });

    let backend = RestApiBackend::new(settings(Edition::Commercial), transport);
    let filter = RequestSpec::default().with_site("$site").with_host_name("web01");
    let variables = TemplateVariables::new().with("site", "heute");

    let hosts = backend.list_hosts(&filter, &variables).unwrap();
    assert_eq!(hosts, vec![Choice::new("web01", "web01")]);
}

#[test]
fn test_rest_list_hosts_keeps_reserved_characters_in_filter() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| {
            let url = &request.url;
            !url.contains('#')
                && !url.contains(' ')
                && query_params(url).len() == 2
                && filter_param(url)
                    == json!({"op": "and", "expr": [
                        {"left": "hosts.name", "op": "~~", "right": "web&db#1"},
                        {"left": "hosts.labels", "op": "=", "right": "'os' 'linux x'"},
                    ]})
                && query_param(url, "columns").as_deref() == Some("name")
        })
        .returning(|_| Ok(RawResponse::ok(json!({"value": [{"id": "web&db#1", "extensions": {"name": "web&db#1"}}]}))));

    let backend = RestApiBackend::new(settings(Edition::Commercial), transport);
    let filter = RequestSpec::default()
        .with_host_name_regex(NegatableOption::new("web&db#1", false))
        .with_host_labels(vec!["os:linux x".to_string()]);

    let hosts = backend.list_hosts(&filter, &no_variables()).unwrap();
    assert_eq!(hosts.len(), 1);
}

#[test]
fn test_rest_list_services() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| {
            request.url.contains("/domain-types/service/collections/all?")
                && filter_param(&request.url)
                    == json!({"op": "and", "expr": [{"left": "services.host_name", "op": "=", "right": "web01"}]})
                && request.url.ends_with("&columns=description")
        })
        .returning(|_| {
            Ok(RawResponse::ok(json!({
                "value": [
                    {"extensions": {"description": "Memory"}},
                    {"extensions": {"description": "CPU load"}},
                ],
            })))
        });

    let backend = RestApiBackend::new(settings(Edition::Commercial), transport);
    let filter = RequestSpec::default().with_host_name("web01");

    let services = backend.list_services(&filter, &no_variables()).unwrap();
    assert_eq!(services[0].label, "CPU load");
    assert_eq!(services[1].label, "Memory");
}

#[test]
fn test_check_version() {
    assert!(check_version("2.2.0p1", "cee", Edition::Commercial).is_ok());
    assert!(check_version("2.3.0", "cre", Edition::Community).is_ok());

    assert!(matches!(
        check_version("2.0.0p20", "cee", Edition::Commercial),
        Err(QueryError::UnsupportedVersion(m)) if m.contains("below 2.1.0")
    ));
    assert!(matches!(
        check_version("2.1.0p12", "cee", Edition::Commercial),
        Err(QueryError::UnsupportedVersion(m)) if m.contains("2.1.0 has been detected")
    ));
    assert!(matches!(
        check_version("2.2.0", "raw", Edition::Commercial),
        Err(QueryError::Response(ResponseError::EditionMismatch(_)))
    ));
    assert!(matches!(check_version("nonsense", "cee", Edition::Commercial), Err(QueryError::Encode(_))));
}

#[test]
fn test_rest_datasource_probe() {
    let mut transport = MockTransport::new();
    transport.expect_request().times(2).returning(|request| {
        if request.url.ends_with("/version") {
            Ok(RawResponse::ok(json!({"versions": {"checkmk": "2.2.0p5"}, "edition": "cee"})))
        } else if request.url.ends_with("/objects/user_config/automation") {
            Ok(RawResponse::ok(json!({"extensions": {"auth_option": {"auth_type": "automation"}}})))
        } else {
            Err(TransportFailure::status(404))
        }
    });

    let backend = RestApiBackend::new(settings(Edition::Commercial).with_username("automation"), transport);

    assert_eq!(
        backend.test_datasource().unwrap(),
        "Data source is working, reached version 2.2.0p5 of checkmk"
    );
}

#[test]
fn test_rest_datasource_probe_requires_automation_user() {
    let mut transport = MockTransport::new();
    transport.expect_request().returning(|request| {
        if request.url.ends_with("/version") {
            Ok(RawResponse::ok(json!({"versions": {"checkmk": "2.2.0"}, "edition": "cee"})))
        } else {
            Ok(RawResponse::ok(json!({"extensions": {"auth_option": {"auth_type": "password"}}})))
        }
    });

    let backend = RestApiBackend::new(settings(Edition::Commercial).with_username("alice"), transport);

    assert!(matches!(backend.test_datasource(), Err(QueryError::NotAutomationUser)));
}

#[test]
fn test_create_backend_by_kind() {
    let mut transport = MockTransport::new();
    transport
        .expect_request()
        .withf(|request: &HttpRequest| request.url.contains("/domain-types/site_connection/collections/all?query=%7B%7D"))
        .returning(|_| {
            Ok(RawResponse::ok(json!({
                "value": [{"extensions": {"basic_settings": {"alias": "Heute", "site_id": "heute"}}}],
            })))
        });

    let settings = settings(Edition::Community).with_version(BackendVersion::new(2, 2, 0));
    let backend: Box<dyn Backend> = create_backend(BackendKind::Rest, settings, transport);

    assert_eq!(backend.list_sites(false).unwrap(), vec![Choice::new("Heute", "heute")]);
}
