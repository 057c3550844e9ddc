// Query translation example
// Author: Gabriel Demetrios Lafis

use checkmk_query_engine::{
    encode::{build_context, build_filter_expression, build_graph_spec, FilterDomain, TimeRange},
    response::{classify, normalize_graph, Frame, RawResponse, Value},
    spec::{migrate, substitute, Context, Edition, HostContext, Params, SiteContext, TemplateVariables},
    utils::validate,
};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A query stored by an old dashboard
    let context = Context {
        siteopt: Some(SiteContext {
            site: Some("$site".to_string()),
        }),
        host: Some(HostContext {
            host: Some("web01".to_string()),
        }),
        ..Context::default()
    };
    let params = Params {
        graph_mode: "template".to_string(),
        graph_name: Some("cpu_utilization".to_string()),
        presentation: Some("sum".to_string()),
        selections: None,
    };

    // Migrate it and resolve dashboard variables
    let spec = migrate(&context, &params)?;
    let variables = TemplateVariables::new().with("site", "heute");
    let spec = substitute(&spec, &variables);
    println!("Request spec:\n{}\n", serde_json::to_string_pretty(&spec)?);

    validate(&spec, Edition::Commercial)?;

    // Encode it for both backend dialects
    println!("Context:\n{}\n", serde_json::to_string_pretty(&build_context(&spec, None))?);
    println!(
        "Service filter:\n{}\n",
        serde_json::to_string_pretty(&build_filter_expression(&spec, FilterDomain::Service))?
    );
    let request = build_graph_spec(&spec, TimeRange::new(1000, 1120), Edition::Commercial, None)?;
    println!("Request body:\n{}\n", request.to_body()?);

    // Reshape a backend answer
    let answer = RawResponse::ok(json!({
        "result_code": 0,
        "result": {
            "start_time": 1000,
            "end_time": 1120,
            "step": 60,
            "curves": [
                {"title": "user", "rrddata": [1.5, 2.0, 2.5]},
                {"title": "system", "rrddata": [0.5, 0.25, null]},
            ],
        },
    }));
    let frame = normalize_graph(classify(Ok(answer)).into_result()?)?;

    println!("Frame:");
    print_frame(&frame);

    Ok(())
}

// Helper function to print a frame
fn print_frame(frame: &Frame) {
    // Print header
    println!("{}", frame.field_names().join(" | "));

    // Print separator
    println!("{}", vec!["----"; frame.fields.len()].join("-+-"));

    // Print rows
    for row in &frame.rows {
        let cells: Vec<String> = row
            .values
            .iter()
            .map(|value| match value {
                Value::Null => "NULL".to_string(),
                Value::Time(t) => t.to_string(),
                Value::Number(n) => format!("{:.2}", n),
                Value::String(s) => s.clone(),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}
