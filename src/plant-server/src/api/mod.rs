//! HTTP handlers

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use plant_serve::{Error, Ranking};

use crate::AppState;

pub mod classify;
pub mod health;
pub mod identity;
pub mod species;
pub mod ui;

/// One part of a multipart upload.
pub struct Part {
    pub file_name: Option<String>,
    pub data: Bytes,
}

/// Every part of a multipart body, by field name. Later parts with the same
/// name replace earlier ones.
#[derive(Default)]
pub struct Upload {
    parts: HashMap<String, Part>,
}

impl Upload {
    pub async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, Error> {
        let mut multipart = multipart.map_err(|e| Error::BadInput(e.to_string()))?;
        let mut upload = Upload::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::BadInput(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_owned);
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::BadInput(format!("field '{}': {}", name, e)))?;

            upload.parts.insert(name, Part { file_name, data });
        }

        Ok(upload)
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.get(name)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.part(name)
            .map(|p| String::from_utf8_lossy(&p.data).into_owned())
    }
}

/// Classify on the blocking pool; inference is CPU bound.
pub async fn run_classifier(state: &AppState, data: Bytes) -> Result<Ranking, Error> {
    let classifier = state.classifier()?;

    tokio::task::spawn_blocking(move || classifier.classify_bytes(&data))
        .await
        .map_err(|e| Error::InferenceFailed(format!("classification task failed: {}", e)))?
}
