//! Identity tokens issued by Firebase Authentication.

use std::path::Path;

use futures::future::BoxFuture;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Display name used when the token carries none.
pub const UNKNOWN_USER_NAME: &str = "Usuario desconocido";

/// Public signing keys of Firebase ID tokens.
pub const SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub name: String,
}

pub trait IdentityVerifier: Send + Sync {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Identity>>;
}

/// The claims of an ID token this service cares about.
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Identity {
    pub fn from_claims(claims: Claims) -> Result<Self> {
        if claims.sub.is_empty() {
            return Err(Error::AuthFailed("token has an empty subject".to_owned()));
        }

        let email = claims
            .email
            .ok_or_else(|| Error::AuthFailed("token carries no email".to_owned()))?;

        Ok(Identity {
            uid: claims.sub,
            email,
            name: claims
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_USER_NAME.to_owned()),
        })
    }
}

/// The part of a service account key file needed to check tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseCredentials {
    pub project_id: String,
}

impl FirebaseCredentials {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::AssetMissing(format!("firebase credentials: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::AssetMissing(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

/// Checks ID tokens against the project's public signing keys.
pub struct FirebaseVerifier {
    client: reqwest::Client,
    project_id: String,
    keys_url: String,
}

impl FirebaseVerifier {
    pub fn new(credentials: &FirebaseCredentials) -> Self {
        FirebaseVerifier {
            client: reqwest::Client::new(),
            project_id: credentials.project_id.clone(),
            keys_url: SECURE_TOKEN_JWKS_URL.to_owned(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn signing_keys(&self) -> Result<JwkSet> {
        let auth = |e: reqwest::Error| Error::AuthFailed(format!("signing keys unavailable: {}", e));

        self.client
            .get(&self.keys_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(auth)?
            .json::<JwkSet>()
            .await
            .map_err(auth)
    }
}

impl IdentityVerifier for FirebaseVerifier {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Identity>> {
        Box::pin(async move {
            let invalid = |e: jsonwebtoken::errors::Error| Error::AuthFailed(e.to_string());

            if token.trim().is_empty() {
                return Err(Error::AuthFailed("no identity token".to_owned()));
            }

            let header = jsonwebtoken::decode_header(token).map_err(invalid)?;
            let kid = header
                .kid
                .ok_or_else(|| Error::AuthFailed("token header has no key id".to_owned()))?;

            let keys = self.signing_keys().await?;
            let jwk = keys
                .find(&kid)
                .ok_or_else(|| Error::AuthFailed(format!("unknown signing key '{}'", kid)))?;
            let key = DecodingKey::from_jwk(jwk).map_err(invalid)?;

            let mut validation = Validation::new(Algorithm::RS256);
            validation.set_audience(&[&self.project_id]);
            validation.set_issuer(&[self.issuer()]);

            let data = jsonwebtoken::decode::<Claims>(token, &key, &validation).map_err(invalid)?;
            debug!("Verified identity token for {}", data.claims.sub);

            Identity::from_claims(data.claims)
        })
    }
}
