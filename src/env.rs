use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub const DEFAULT_CATALOG_PATH: &str = "data/DB.json";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://handbook.db";
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_IMPORT_LIMIT_MIB: u64 = 16;
/// Work factors bcrypt accepts.
pub const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

pub fn load_environment() -> Result<()> {
    let is_production =
        dotenvy::var("APP_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)
        .with_context(|| format!("failed to read environment file {path}"))?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_path: PathBuf,
    pub database_url: String,
    pub catalog_load_timeout: Duration,
    pub search_debounce: Duration,
    pub bcrypt_cost: u32,
    pub import_limit_mib: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            catalog_load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            import_limit_mib: DEFAULT_IMPORT_LIMIT_MIB,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let catalog_path = std::env::var("CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);
        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let catalog_load_timeout = Duration::from_secs(parse_var(
            "CATALOG_LOAD_TIMEOUT_SECS",
            DEFAULT_LOAD_TIMEOUT_SECS,
        )?);
        let search_debounce = Duration::from_millis(parse_var(
            "SEARCH_DEBOUNCE_MS",
            DEFAULT_SEARCH_DEBOUNCE_MS,
        )?);
        let bcrypt_cost = parse_var("BCRYPT_COST", defaults.bcrypt_cost)?;
        if !BCRYPT_COST_RANGE.contains(&bcrypt_cost) {
            anyhow::bail!(
                "BCRYPT_COST must be between {} and {}, got {}",
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end(),
                bcrypt_cost
            );
        }
        let import_limit_mib = parse_var("IMPORT_LIMIT_MIB", DEFAULT_IMPORT_LIMIT_MIB)?;

        Ok(Self {
            catalog_path,
            database_url,
            catalog_load_timeout,
            search_debounce,
            bcrypt_cost,
            import_limit_mib,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
