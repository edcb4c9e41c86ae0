/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::paginator::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::store_adapter::DEFAULT_RETRY_BACKOFF;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const MAX_RETRY_BACKOFF_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub data_dir: Option<String>,
    /// Defaults to `<data_dir>/vidhub.db`.
    pub db_path: Option<String>,
    pub default_page_size: Option<u64>,
    pub store_retry_backoff_ms: Option<u64>,
}

impl CoreConfig {
    pub fn data_dir(&self) -> Result<PathBuf> {
        match self.data_dir.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => default_data_dir(),
        }
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match self.db_path.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(self.data_dir()?.join("vidhub.db")),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.default_page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn retry_backoff(&self) -> Duration {
        self.store_retry_backoff_ms
            .map(|ms| Duration::from_millis(ms.min(MAX_RETRY_BACKOFF_MS)))
            .unwrap_or(DEFAULT_RETRY_BACKOFF)
    }
}

pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(v) = std::env::var("VIDHUB_DATA_DIR") {
        if !v.trim().is_empty() {
            return Ok(PathBuf::from(v));
        }
    }
    let proj = ProjectDirs::from("net", "vidhub", "Vidhub")
        .context("unable to determine platform data dir")?;
    Ok(proj.data_local_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("net", "vidhub", "Vidhub")
        .context("unable to determine platform config dir")?;
    Ok(proj.config_dir().join("config.json"))
}

/// `--config <path>` wins, then `$VIDHUB_CONFIG`, then the platform default.
pub fn parse_config_path(args: impl IntoIterator<Item = String>) -> Result<PathBuf> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return Ok(PathBuf::from(path));
            }
            return Err(anyhow::anyhow!("--config requires a path"));
        }
    }
    if let Ok(path) = std::env::var("VIDHUB_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    default_config_path()
}

pub fn load_config(text: &str) -> Result<CoreConfig> {
    serde_json::from_str(text).context("decode CoreConfig")
}

/// A missing file is not an error: every setting has a default.
pub fn load_config_file(path: &Path) -> Result<CoreConfig> {
    if !path.exists() {
        info!("config {} not found, using defaults", path.display());
        return Ok(CoreConfig::default());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    load_config(&text).with_context(|| format!("load config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_flag_takes_precedence() {
        let p = parse_config_path(args(&["video_feed", "--config", "/tmp/x.json"])).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/x.json"));
        assert!(parse_config_path(args(&["--config"])).is_err());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = load_config(r#"{"db_path": "/var/lib/vidhub/app.db", "default_page_size": 500}"#).unwrap();
        assert_eq!(cfg.db_path().unwrap(), PathBuf::from("/var/lib/vidhub/app.db"));
        assert_eq!(cfg.page_size(), MAX_PAGE_SIZE);
        assert_eq!(cfg.retry_backoff(), DEFAULT_RETRY_BACKOFF);

        let cfg = load_config("{}").unwrap();
        assert_eq!(cfg.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn db_path_defaults_under_data_dir() {
        let cfg = CoreConfig {
            data_dir: Some("/srv/vidhub".into()),
            ..CoreConfig::default()
        };
        assert_eq!(cfg.db_path().unwrap(), PathBuf::from("/srv/vidhub/vidhub.db"));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_file(&dir.path().join("absent.json")).unwrap();
        assert!(cfg.db_path.is_none());

        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"store_retry_backoff_ms": 60000}"#).unwrap();
        let cfg = load_config_file(&path).unwrap();
        assert_eq!(cfg.retry_backoff(), Duration::from_millis(MAX_RETRY_BACKOFF_MS));
    }
}
