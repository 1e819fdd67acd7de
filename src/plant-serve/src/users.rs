//! User records in Postgres.

use std::time::Duration;

use futures::future::BoxFuture;
use log::info;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::error::Result;
use crate::identity::Identity;

pub trait UserStore: Send + Sync {
    /// Insert the user unless a record with the same uid exists.
    fn upsert_user<'a>(&'a self, user: &'a Identity) -> BoxFuture<'a, Result<()>>;
}

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS usuarios (
    id TEXT PRIMARY KEY,
    nombre TEXT NOT NULL,
    email TEXT NOT NULL
)";

const INSERT_USER: &str =
    "INSERT INTO usuarios (id, nombre, email) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Connections are opened on first use, so an unreachable database does
    /// not stop the service from starting.
    pub fn connect_lazy(host: &str, user: &str, password: Option<&str>, database: &str) -> Self {
        let mut options = PgConnectOptions::new()
            .host(host)
            .username(user)
            .database(database);
        if let Some(password) = password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        PgUserStore { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_USERS).execute(&self.pool).await?;
        Ok(())
    }
}

impl UserStore for PgUserStore {
    fn upsert_user<'a>(&'a self, user: &'a Identity) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let result = sqlx::query(INSERT_USER)
                .bind(&user.uid)
                .bind(&user.name)
                .bind(&user.email)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() > 0 {
                info!("Registered user {} ({})", user.name, user.uid);
            }

            Ok(())
        })
    }
}
