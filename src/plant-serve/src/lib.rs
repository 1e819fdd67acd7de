//! Plant identification building blocks: artifact fetching, the image
//! classifier, species metadata and user identity.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

pub mod assets;
pub mod classifier;
pub mod error;
pub mod identity;
pub mod labels;
pub mod metadata;
pub mod users;

pub use assets::{AssetFetcher, GcsObjectStore, ObjectStore};
pub use classifier::{Classifier, Model, Ranking, ScoredLabel, TensorLayout, TfModel};
pub use error::{Error, ErrorKind, Result};
pub use identity::{FirebaseVerifier, Identity, IdentityVerifier};
pub use labels::{Label, Taxon};
pub use metadata::{expand_photo_url, normalize_name, species_path, MetadataStore, SpeciesRecord};
pub use users::{PgUserStore, UserStore};

/// Wall-clock timer for one named stage of request handling.
pub struct Timer {
    name: String,
    tstamp: Option<DateTime<Utc>>,
    duration: Option<Duration>,
}

impl Timer {
    /// Create a timer and start it right away
    pub fn start(name: &str) -> Self {
        debug!("{}: starting", name);

        Timer {
            name: name.to_owned(),
            tstamp: Some(Utc::now()),
            duration: None,
        }
    }

    /// Stop the timer and return the elapsed milliseconds.
    ///
    /// Stopping twice keeps the first measurement.
    pub fn stop(&mut self) -> i64 {
        if let Some(tstamp) = self.tstamp.take() {
            let d = Utc::now() - tstamp;
            self.duration = Some(d);
            info!("{} took {} msec", self.name, d.num_milliseconds());
        }

        self.elapsed_ms()
    }

    /// Milliseconds measured by the last `stop`, zero while running
    pub fn elapsed_ms(&self) -> i64 {
        self.duration.map(|d| d.num_milliseconds()).unwrap_or(0)
    }
}
