// API server implementation
// Author: Gabriel Demetrios Lafis

use std::io;
use std::net::SocketAddr;

use actix_cors::Cors;
use actix_web::middleware::Condition;
use actix_web::{web, App, HttpServer};
use log::info;

use crate::encode::BackendVersion;
use crate::spec::Edition;
use crate::utils::{Config, ServerConfig};
use super::routes;

/// Defaults applied when a request does not name an edition or version
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceState {
    pub edition: Edition,
    pub version: Option<BackendVersion>,
}

impl Default for ServiceState {
    fn default() -> Self {
        ServiceState {
            edition: Edition::Commercial,
            version: None,
        }
    }
}

impl ServiceState {
    pub fn from_config(config: &Config) -> Result<Self, crate::encode::EncodeError> {
        Ok(ServiceState {
            edition: config.edition(),
            version: config.backend_version()?,
        })
    }
}

/// Permissive CORS middleware, only active when enabled
pub fn cors_middleware(enable_cors: bool) -> Condition<Cors> {
    Condition::new(
        enable_cors,
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600),
    )
}

/// API server
pub struct Server {
    config: ServerConfig,
    state: ServiceState,
}

impl Server {
    /// Create a new API server
    pub fn new(state: ServiceState, config: ServerConfig) -> Self {
        Server { config, state }
    }

    /// Run the API server
    pub async fn run(&self) -> io::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let state = self.state;
        let enable_cors = self.config.enable_cors;
        let workers = self.config.workers.unwrap_or_else(num_cpus::get);

        info!("Starting server at http://{} with {} workers", addr, workers);

        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state))
                .wrap(cors_middleware(enable_cors))
                .configure(routes::configure)
        })
        .workers(workers)
        .bind(addr)?
        .run()
        .await
    }
}
