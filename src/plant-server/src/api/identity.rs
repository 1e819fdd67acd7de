//! Identity verification route

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use log::{debug, warn};
use plant_serve::{Error, Identity};
use serde::Deserialize;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub id_token: Option<String>,
}

/// POST /verificar_usuario
///
/// Checks the token and records the user. The answer depends only on the
/// token; a failed user write is logged and otherwise ignored.
pub async fn verify_user(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<Identity>, ApiError> {
    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| Error::AssetMissing("identity verification is not configured".to_owned()))?;

    let token = body
        .ok()
        .and_then(|Json(request)| request.id_token)
        .unwrap_or_default();

    let identity = verifier.verify(&token).await?;
    record_user(&state, &identity).await;

    Ok(Json(identity))
}

async fn record_user(state: &AppState, identity: &Identity) {
    let Some(users) = &state.users else {
        debug!("No user store configured, not recording {}", identity.uid);
        return;
    };

    if let Err(e) = users.upsert_user(identity).await {
        warn!("Could not record user {}: {}", identity.uid, e);
    }
}
