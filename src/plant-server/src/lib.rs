//! plant-server library: HTTP routes around the plant classifier.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use log::info;
use plant_serve::{Classifier, Error, IdentityVerifier, MetadataStore, UserStore};
use tower_http::services::ServeDir;

pub mod api;
pub mod config;
pub mod error;
pub mod startup;
pub mod views;

/// Everything the handlers share. Built once at startup; nothing in it
/// changes afterwards.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the model or label table could not be loaded
    pub classifier: Option<Arc<Classifier>>,
    pub species: Arc<MetadataStore>,
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
    /// `None` when no database is configured
    pub users: Option<Arc<dyn UserStore>>,
}

impl AppState {
    pub fn new(species: MetadataStore) -> Self {
        AppState {
            classifier: None,
            species: Arc::new(species),
            verifier: None,
            users: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_users(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn classifier(&self) -> Result<Arc<Classifier>, Error> {
        self.classifier
            .clone()
            .ok_or_else(|| Error::AssetMissing("the classifier is not loaded".to_owned()))
    }
}

pub struct RouterConfig {
    pub max_upload_bytes: usize,
    /// Served under `/static` when set
    pub static_dir: Option<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            max_upload_bytes: 10 * 1024 * 1024,
            static_dir: None,
        }
    }
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

pub fn build_router(state: AppState, config: &RouterConfig) -> Router {
    let router = Router::new()
        .route("/", get(api::ui::serve_index))
        .route("/navegacion", get(api::ui::serve_navigation))
        .route("/pagina_juego", get(api::ui::serve_game))
        .route("/health", get(api::health::health))
        .route("/api/plantas", get(api::species::list_species))
        .route("/api/analizar_foto", post(api::classify::analyze_photo))
        .route("/predict", post(api::classify::predict))
        .route("/planta/:nombre_cientifico", get(api::species::species_detail))
        .route("/verificar_usuario", post(api::identity::verify_user))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(middleware::from_fn(log_requests))
        .with_state(state);

    match &config.static_dir {
        Some(dir) => router.nest_service("/static", ServeDir::new(dir)),
        None => router,
    }
}
