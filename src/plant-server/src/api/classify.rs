//! Photo classification routes

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Html,
    Json,
};
use plant_serve::{normalize_name, Error};
use serde::Serialize;

use super::{run_classifier, Upload};
use crate::error::{ApiError, PageError};
use crate::{views, AppState};

/// Number of predictions shown on the results page.
const TOP_PREDICTIONS: usize = 3;

/// Answer of the photo game: the best guess and whether it is the plant the
/// player was asked to find.
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    #[serde(rename = "planta_predicha")]
    pub predicted: String,

    /// Percentage, two decimals
    #[serde(rename = "confianza")]
    pub confidence: f64,

    #[serde(rename = "coincide")]
    pub matches: bool,
}

/// POST /api/analizar_foto
///
/// Multipart fields `imagen` (the photo) and `planta_esperada` (expected
/// scientific name).
pub async fn analyze_photo(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MatchResponse>, ApiError> {
    let upload = Upload::read(multipart).await?;

    let (Some(image), Some(expected)) = (upload.part("imagen"), upload.text("planta_esperada"))
    else {
        return Err(Error::BadInput("missing 'imagen' or 'planta_esperada'".to_owned()).into());
    };

    let ranking = run_classifier(&state, image.data.clone()).await?;
    let best = ranking
        .best()
        .ok_or_else(|| Error::InferenceFailed("empty ranking".to_owned()))?;

    let predicted = best.scientific_name();
    let matches = normalize_name(&predicted) == normalize_name(&expected);

    Ok(Json(MatchResponse {
        confidence: best.confidence_percent(),
        matches,
        predicted,
    }))
}

/// POST /predict
///
/// Multipart field `file`; renders the top predictions with their taxonomy.
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, PageError> {
    let upload = Upload::read(multipart).await?;

    let file = upload
        .part("file")
        .ok_or_else(|| Error::BadInput("no file was uploaded".to_owned()))?;
    if file.file_name.as_deref() == Some("") {
        return Err(Error::BadInput("the uploaded file has no name".to_owned()).into());
    }

    let ranking = run_classifier(&state, file.data.clone()).await?;

    Ok(Html(views::predictions_page(ranking.top(TOP_PREDICTIONS))))
}
