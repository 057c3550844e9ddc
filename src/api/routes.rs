// API routes configuration
// Author: Gabriel Demetrios Lafis

use actix_web::{web, HttpResponse, Responder};

use super::handlers;

/// Configure API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // Health check
            .route("/health", web::get().to(health_check))

            // Request specifications
            .service(
                web::scope("/spec")
                    .route("/migrate", web::post().to(handlers::migrate_spec))
                    .route("/validate", web::post().to(handlers::validate_spec))
                    .route("/substitute", web::post().to(handlers::substitute_spec))
            )

            // Backend request encoding
            .service(
                web::scope("/encode")
                    .route("/context", web::post().to(handlers::encode_context))
                    .route("/filter", web::post().to(handlers::encode_filter))
                    .route("/graph", web::post().to(handlers::encode_graph))
            )

            // Backend response decoding
            .service(
                web::scope("/decode")
                    .route("/graph", web::post().to(handlers::decode_graph))
            )
    );
}

/// Health check handler
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
