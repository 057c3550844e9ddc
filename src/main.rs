// Checkmk Query Engine - Main executable
// Author: Gabriel Demetrios Lafis

use std::fs;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use log::{info, warn};

use checkmk_query_engine::{
    api::{Server, ServiceState},
    spec::migrate_dashboard,
    utils::{init_logging, Config},
};

fn cli() -> Command<'static> {
    Command::new("checkmk-query-engine")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gabriel Demetrios Lafis")
        .about("Request translation and response normalization for a Checkmk data source")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .takes_value(true),
        )
        .subcommand(
            Command::new("server")
                .about("Run the translation API server")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Sets the server host")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Sets the server port")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("migrate")
                .about("Migrate the legacy queries of a dashboard JSON file")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("Dashboard to migrate")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Where to write the result, stdout when omitted")
                        .takes_value(true),
                ),
        )
}

async fn run_server(config: &Config, matches: &ArgMatches) -> Result<()> {
    let mut server_config = config.server.clone();
    if let Some(host) = matches.value_of("host") {
        server_config.host = host.to_string();
    }
    if let Some(port) = matches.value_of("port") {
        server_config.port = port
            .parse()
            .with_context(|| format!("Invalid port '{}'", port))?;
    }

    let state = ServiceState::from_config(config).context("Invalid datasource configuration")?;
    info!(
        "Serving requests for {}, backend version {}",
        state.edition,
        state.version.map_or_else(|| "unknown".to_string(), |v| v.to_string())
    );

    Server::new(state, server_config).run().await?;
    Ok(())
}

fn run_migrate(matches: &ArgMatches) -> Result<()> {
    let input = matches
        .value_of("input")
        .context("Missing --input")?;
    let contents = fs::read_to_string(input).with_context(|| format!("Could not read {}", input))?;
    let mut dashboard: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", input))?;

    let migrated = migrate_dashboard(&mut dashboard)?;
    info!("Migrated {} queries in {}", migrated, input);

    let output = serde_json::to_string_pretty(&dashboard)?;
    match matches.value_of("output") {
        Some(path) => fs::write(path, output).with_context(|| format!("Could not write {}", path))?,
        None => println!("{}", output),
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    // Load configuration
    let config = match matches.value_of("config") {
        Some(path) => Config::from_file(path).with_context(|| format!("Error loading config file {}", path))?,
        None => Config::default(),
    };

    // Initialize logging
    if let Err(err) = init_logging(config.log_level_filter()) {
        eprintln!("Error initializing logger: {}", err);
    }

    match matches.subcommand() {
        Some(("server", sub)) => run_server(&config, sub).await,
        Some(("migrate", sub)) => run_migrate(sub),
        _ => {
            warn!("No subcommand specified");
            println!("No subcommand specified. Use --help for usage information.");
            Ok(())
        }
    }
}
