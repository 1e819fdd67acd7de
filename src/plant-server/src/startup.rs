//! Builds the application state from configuration.
//!
//! Missing pieces never abort startup: each one is logged and the routes
//! depending on it answer 503 instead.

use std::sync::Arc;

use log::{error, info, warn};
use plant_serve::{
    AssetFetcher, Classifier, FirebaseVerifier, GcsObjectStore, MetadataStore, PgUserStore,
};

use crate::config::Config;
use crate::AppState;

/// Download whatever artifacts are not on disk yet.
pub async fn fetch_assets(config: &Config) {
    let store = match GcsObjectStore::new(&config.storage_endpoint, config.storage_token.clone()) {
        Ok(store) => store,
        Err(e) => {
            error!("Object store unavailable, skipping downloads: {}", e);
            return;
        }
    };

    let fetcher = AssetFetcher::new(store, &config.bucket);
    let model = config.model_path();
    let labels = config.labels_path();
    let species = config.species_path();

    fetcher
        .ensure_all(&[
            (config.model_file.as_str(), model.as_path()),
            (config.labels_file.as_str(), labels.as_path()),
            (config.species_file.as_str(), species.as_path()),
        ])
        .await;
}

fn load_classifier(config: &Config) -> Option<Classifier> {
    match Classifier::load(
        &config.model_path(),
        &config.labels_path(),
        &config.input_op,
        &config.output_op,
        config.layout,
    ) {
        Ok(classifier) => Some(classifier),
        Err(e) => {
            warn!("Classifier unavailable, classification routes will answer 503: {}", e);
            None
        }
    }
}

async fn connect_users(config: &Config) -> Option<PgUserStore> {
    let (Some(host), Some(user)) = (&config.db_host, &config.db_user) else {
        info!("No database configured, users will not be recorded");
        return None;
    };

    let password = match config.db_password() {
        Ok(password) => password,
        Err(e) => {
            error!("Database password unavailable, users will not be recorded: {}", e);
            return None;
        }
    };

    let store = PgUserStore::connect_lazy(host, user, password.as_deref(), &config.db_name);
    if let Err(e) = store.ensure_schema().await {
        warn!("Could not prepare the user table, writes may fail: {}", e);
    }

    info!("Recording users in {}@{}/{}", user, host, config.db_name);
    Some(store)
}

pub async fn build_state(config: &Config) -> AppState {
    fetch_assets(config).await;

    let species = MetadataStore::load_or_empty(&config.bucket, &config.species_path());
    let mut state = AppState::new(species);

    if let Some(classifier) = load_classifier(config) {
        state = state.with_classifier(classifier);
    }

    match config.firebase() {
        Ok(Some(credentials)) => {
            info!("Verifying identity tokens for project {}", credentials.project_id);
            state = state.with_verifier(Arc::new(FirebaseVerifier::new(&credentials)));
        }
        Ok(None) => warn!("No Firebase credentials configured, identity verification disabled"),
        Err(e) => error!("Firebase credentials unusable, identity verification disabled: {}", e),
    }

    if let Some(users) = connect_users(config).await {
        state = state.with_users(Arc::new(users));
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use structopt::StructOpt;

    #[tokio::test]
    async fn missing_artifacts_leave_a_degraded_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_iter_safe(vec![
            "plant-server",
            "--asset-dir",
            dir.path().to_str().unwrap(),
            "--storage-endpoint",
            "http://127.0.0.1:9",
            "--firebase-config",
            r#"{"project_id": "jardin"}"#,
        ])
        .unwrap();

        let state = build_state(&config).await;

        assert!(state.classifier.is_none());
        assert!(state.species.is_empty());
        assert!(state.verifier.is_some());
        assert!(state.users.is_none());
    }

    #[tokio::test]
    async fn species_on_disk_are_loaded_without_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("plantas.json"),
            r#"{"Rosa canina": {"fotos": ["a.jpg"]}}"#,
        )
        .unwrap();
        let config = Config::from_iter_safe(vec![
            "plant-server",
            "--asset-dir",
            dir.path().to_str().unwrap(),
            "--storage-endpoint",
            "http://127.0.0.1:9",
            "--bucket",
            "demo",
        ])
        .unwrap();

        let state = build_state(&config).await;

        let record = state.species.get("rosa canina").unwrap();
        assert_eq!(record.photos, vec!["https://storage.googleapis.com/demo/a.jpg"]);
    }
}
