//! Configuration module
//!
//! `ReportingConfig` collects everything the reporting process needs:
//! database, storage, upload limits and the timeout sweep schedule.

use std::env;
use std::time::Duration;

use crate::storage_types::StorageBackend;
use crate::validation::{FileIntegrityChecker, XLSX_CONTENT_TYPE};

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_REPORT_SIZE_MB: usize = 100;
const VALIDATION_TIMEOUT_HOURS: i64 = 24;
const TIMEOUT_SWEEP_INTERVAL_SECS: u64 = 300;
const TIMEOUT_SWEEP_BATCH_SIZE: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct ReportingConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub max_report_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    /// Maximum time a report may stay in `Transmitted`/`Ongoing`.
    pub validation_timeout_hours: i64,
    /// Interval between timeout sweeps. 0 disables the sweeper.
    pub timeout_sweep_interval_secs: u64,
    pub timeout_sweep_batch_size: i64,
    /// Entities allowed to submit, as `(entity_id, name)`.
    pub entities: Vec<(i64, String)>,
    pub environment: String,
    pub log_format: LogFormat,
}

impl ReportingConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::Local,
        };

        let max_report_size_mb = lookup("MAX_REPORT_SIZE_MB")
            .unwrap_or_else(|| MAX_REPORT_SIZE_MB.to_string())
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("MAX_REPORT_SIZE_MB must be a valid number"))?;

        let allowed_content_types = lookup("REPORT_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|| XLSX_CONTENT_TYPE.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let log_format = match lookup("LOG_FORMAT").map(|f| f.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let entities = parse_entity_list(&lookup("UKNF_ENTITIES").unwrap_or_default())?;

        let config = ReportingConfig {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: lookup("LOCAL_STORAGE_PATH"),
            max_report_size_bytes: max_report_size_mb * 1024 * 1024,
            allowed_content_types,
            validation_timeout_hours: lookup("VALIDATION_TIMEOUT_HOURS")
                .unwrap_or_else(|| VALIDATION_TIMEOUT_HOURS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("VALIDATION_TIMEOUT_HOURS must be a valid number"))?,
            timeout_sweep_interval_secs: lookup("TIMEOUT_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|| TIMEOUT_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("TIMEOUT_SWEEP_INTERVAL_SECS must be a valid number")
                })?,
            timeout_sweep_batch_size: lookup("TIMEOUT_SWEEP_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(TIMEOUT_SWEEP_BATCH_SIZE),
            entities,
            environment,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        if self.max_report_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_REPORT_SIZE_MB must be greater than 0"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "REPORT_ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        if self.validation_timeout_hours <= 0 {
            return Err(anyhow::anyhow!(
                "VALIDATION_TIMEOUT_HOURS must be greater than 0"
            ));
        }

        if self.timeout_sweep_batch_size <= 0 {
            return Err(anyhow::anyhow!(
                "TIMEOUT_SWEEP_BATCH_SIZE must be greater than 0"
            ));
        }

        if self.is_production() && self.storage_backend == StorageBackend::Memory {
            return Err(anyhow::anyhow!(
                "STORAGE_BACKEND=memory is not allowed in production"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn validation_timeout(&self) -> chrono::Duration {
        chrono::Duration::hours(self.validation_timeout_hours)
    }

    pub fn timeout_sweep_interval(&self) -> Option<Duration> {
        (self.timeout_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.timeout_sweep_interval_secs))
    }

    pub fn file_integrity_checker(&self) -> FileIntegrityChecker {
        FileIntegrityChecker::new(
            self.max_report_size_bytes,
            self.allowed_content_types.clone(),
        )
    }
}

/// Parses `id:name` pairs separated by commas, e.g. `1001:Bank A,1002:Bank B`.
pub fn parse_entity_list(entries: &str) -> Result<Vec<(i64, String)>, anyhow::Error> {
    entries
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (id, name) = pair
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("Invalid entity entry: {}", pair))?;
            let entity_id = id
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid entity id: {}", id))?;
            Ok((entity_id, name.trim().to_string()))
        })
        .collect()
}
