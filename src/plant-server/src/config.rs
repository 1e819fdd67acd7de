//! Command line and environment configuration.

use std::path::{Path, PathBuf};

use plant_serve::identity::FirebaseCredentials;
use plant_serve::{Error, Result, TensorLayout};
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "plant-server",
    about = "HTTP service identifying plant species from photos"
)]
pub struct Config {
    #[structopt(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[structopt(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Bucket holding the model artifacts and the species photos
    #[structopt(long, env = "BUCKET_NAME", default_value = "buketrecuperadojbq")]
    pub bucket: String,

    #[structopt(long, env = "STORAGE_ENDPOINT", default_value = "https://storage.googleapis.com")]
    pub storage_endpoint: String,

    /// OAuth access token for private buckets
    #[structopt(long, env = "STORAGE_TOKEN", hide_env_values = true)]
    pub storage_token: Option<String>,

    /// Local directory the artifacts are downloaded into
    #[structopt(long, env = "ASSET_DIR", default_value = ".", parse(from_os_str))]
    pub asset_dir: PathBuf,

    /// Frozen TensorFlow graph of the classifier
    #[structopt(long, env = "MODEL_FILE", default_value = "modelo_resnet50.pb")]
    pub model_file: String,

    /// Label table, one label per line
    #[structopt(long, env = "CLASSES_FILE", default_value = "clases.txt")]
    pub labels_file: String,

    /// Species metadata document
    #[structopt(long, env = "JSON_FILE", default_value = "plantas.json")]
    pub species_file: String,

    #[structopt(long, env = "MODEL_INPUT_OP", default_value = "input")]
    pub input_op: String,

    #[structopt(long, env = "MODEL_OUTPUT_OP", default_value = "output")]
    pub output_op: String,

    /// Input tensor layout: nchw or nhwc
    #[structopt(long, env = "MODEL_LAYOUT", default_value = "nchw")]
    pub layout: TensorLayout,

    #[structopt(long, env = "STATIC_DIR", default_value = "static", parse(from_os_str))]
    pub static_dir: PathBuf,

    #[structopt(long, env = "MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: usize,

    #[structopt(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    #[structopt(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[structopt(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// File holding the database password, read when no password is given
    #[structopt(long, env = "DB_PASSWORD_FILE", parse(from_os_str))]
    pub db_password_file: Option<PathBuf>,

    #[structopt(long, env = "DB_NAME", default_value = "jardincnn")]
    pub db_name: String,

    /// Service account key as a JSON document
    #[structopt(long, env = "FIREBASE_CONFIG", hide_env_values = true)]
    pub firebase_config: Option<String>,

    /// Service account key file, read when no JSON document is given
    #[structopt(long, env = "FIREBASE_CREDENTIALS", parse(from_os_str))]
    pub firebase_credentials: Option<PathBuf>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.asset_dir.join(name)
    }

    pub fn model_path(&self) -> PathBuf {
        self.asset_path(&self.model_file)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.asset_path(&self.labels_file)
    }

    pub fn species_path(&self) -> PathBuf {
        self.asset_path(&self.species_file)
    }

    pub fn db_password(&self) -> Result<Option<String>> {
        if let Some(password) = &self.db_password {
            return Ok(Some(password.clone()));
        }

        self.db_password_file
            .as_deref()
            .map(read_secret)
            .transpose()
    }

    /// `None` when neither the JSON document nor the key file is configured
    pub fn firebase(&self) -> Result<Option<FirebaseCredentials>> {
        match (&self.firebase_config, &self.firebase_credentials) {
            (Some(json), _) => FirebaseCredentials::from_json(json).map(Some),
            (None, Some(path)) => FirebaseCredentials::from_file(path).map(Some),
            (None, None) => Ok(None),
        }
    }
}

fn read_secret(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim_end().to_owned())
        .map_err(|e| Error::AssetMissing(format!("{}: {}", path.display(), e)))
}
