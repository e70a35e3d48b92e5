use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories_next::ProjectDirs;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub address: IpAddr,
    pub port: u16,
    /// Allow requests to override the current time. Never enable in production.
    pub test_mode: bool,
    pub database: Database,
    pub store: Store,
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:3000".into(),
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            test_mode: false,
            database: Database::default(),
            store: Store::default(),
            limits: Limits::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

impl Default for Database {
    fn default() -> Self {
        Database {
            url: "sqlite://fadebin.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Store {
    pub kind: StoreKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sql,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_upload_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_upload_size: 1024 * 1024,
        }
    }
}

impl Config {
    /// Load the config file and apply environment overrides.
    ///
    /// An explicitly given path must exist. Without one, the platform config
    /// directory is searched and built-in defaults are used if nothing is there.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => {
                    info!("no config file found, using defaults");
                    Config::default()
                }
            },
        };

        if let Ok(base_url) = std::env::var("BASE_URL") {
            config.base_url = base_url;
        }
        if std::env::var("TEST_MODE").as_deref() == Ok("1") {
            config.test_mode = true;
        }

        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text).context("failed to deserialize config")
    }
}

fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fadebin").map(|dirs| dirs.config_dir().join("config.toml"))
}
