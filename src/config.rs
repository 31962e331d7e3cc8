use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct PgSettings {
    pub host: String,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub storage: StorageKind,
    pub postgres: Option<PgSettings>,
    pub jwt_secret: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub allowed_origins: Vec<String>,
    pub fixtures: Option<PathBuf>,
}

impl Settings {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match var("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT is not a port number: {}", p))?,
            None => 8080,
        };

        let storage = match var("STORAGE").as_deref().unwrap_or("postgres") {
            "postgres" => StorageKind::Postgres,
            "memory" => StorageKind::Memory,
            other => bail!("STORAGE must be \"postgres\" or \"memory\", got {:?}", other),
        };

        let postgres = if storage == StorageKind::Postgres {
            Some(PgSettings {
                host: var("PG_HOST").context("PG_HOST not set")?,
                user: var("PG_USER").context("PG_USER not set")?,
                password: var("PG_PASS"),
                dbname: var("PG_DB").context("PG_DB not set")?,
            })
        } else {
            None
        };

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Settings {
            port,
            storage,
            postgres,
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET not set")?,
            media_root: var("MEDIA_ROOT").unwrap_or_else(|| "media".into()).into(),
            media_url: var("MEDIA_URL").unwrap_or_else(|| "/media/".into()),
            allowed_origins,
            fixtures: var("FIXTURES").map(PathBuf::from),
        })
    }

    /// Loggable description of the signing secret. None of its characters
    /// are included.
    pub fn jwt_secret_summary(&self) -> String {
        format!("{} chars", self.jwt_secret.chars().count())
    }
}

pub fn get_pg_pool(pg: &PgSettings) -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(pg.host.clone());
    cfg.user = Some(pg.user.clone());
    cfg.password = pg.password.clone();
    cfg.dbname = Some(pg.dbname.clone());
    cfg.pool = Some(PoolConfig {
        max_size: 16,
        ..PoolConfig::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .context("failed to create postgres pool")
}
