// Translation service example
// Author: Gabriel Demetrios Lafis

use std::env;
use std::io;

use checkmk_query_engine::{
    api::{Server, ServiceState},
    utils::{init_logging, Config},
};

const ENDPOINTS: &[&str] = &[
    "GET  /api/v1/health",
    "POST /api/v1/spec/migrate",
    "POST /api/v1/spec/validate",
    "POST /api/v1/spec/substitute",
    "POST /api/v1/encode/context",
    "POST /api/v1/encode/filter",
    "POST /api/v1/encode/graph",
    "POST /api/v1/decode/graph",
];

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Optional config file as the first argument
    let mut config = match env::args().nth(1) {
        Some(path) => Config::from_file(&path).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?,
        None => Config::default(),
    };
    config.server.enable_cors = true;
    config.server.workers.get_or_insert_with(num_cpus::get);

    if let Err(err) = init_logging(config.log_level_filter()) {
        eprintln!("Error initializing logger: {}", err);
    }

    let state = ServiceState::from_config(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    println!(
        "Translating for {} (backend version hint: {})",
        state.edition.label(),
        state.version.map_or_else(|| "none".to_string(), |v| v.to_string())
    );
    println!("Listening on http://{}:{}", config.server.host, config.server.port);
    for endpoint in ENDPOINTS {
        println!("  {}", endpoint);
    }

    Server::new(state, config.server).run().await
}
