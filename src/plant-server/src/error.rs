//! HTTP rendering of [`plant_serve::Error`].
//!
//! Every route maps failures through [`status_for`]; JSON routes answer
//! `{"error": "..."}` and page routes answer an HTML error page.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use log::{error, warn};
use plant_serve::{Error, ErrorKind};
use serde_json::json;

use crate::views;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::AuthFailed => StatusCode::UNAUTHORIZED,
        ErrorKind::AssetMissing => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InferenceFailed | ErrorKind::StoreWriteFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log_failure(status: StatusCode, err: &Error) {
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
}

/// Error answered as JSON.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        log_failure(status, &self.0);

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Error answered as an HTML page.
#[derive(Debug)]
pub struct PageError(pub Error);

impl From<Error> for PageError {
    fn from(err: Error) -> Self {
        PageError(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        log_failure(status, &self.0);

        (status, Html(views::error_page(&self.0.to_string()))).into_response()
    }
}
