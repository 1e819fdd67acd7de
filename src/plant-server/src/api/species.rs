//! Species metadata routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use plant_serve::normalize_name;
use serde_json::{Map, Value};

use crate::{views, AppState};

/// GET /api/plantas
///
/// The whole species document as it was loaded.
pub async fn list_species(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.species.raw().clone())
}

/// GET /planta/:nombre_cientifico
pub async fn species_detail(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let name = normalize_name(&name);

    match state.species.get(&name) {
        Some(record) => Html(views::species_page(&name, &record)).into_response(),
        None => (StatusCode::NOT_FOUND, views::species_not_found(&name)).into_response(),
    }
}
