// HTTP service exposing the translation operations
// Author: Gabriel Demetrios Lafis

mod server;
mod routes;
mod handlers;
mod models;

pub use server::*;
pub use routes::*;
pub use handlers::*;
pub use models::*;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

use crate::encode::EncodeError;
use crate::response::ResponseError;
use crate::spec::SpecError;
use crate::utils::ValidationError;

/// Represents an error in the API module
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("{0}")]
    Response(#[from] ResponseError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Response(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
        }))
    }
}
