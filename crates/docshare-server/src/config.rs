use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// SQLite file name inside the data directory.
pub const DB_FILE: &str = "docshare.db";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MODE: &str = "release";

/// Runtime settings, read from the environment (and `.env`) at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub mode: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            data_dir: var("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()).into(),
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
            mode: var("APP_MODE").unwrap_or_else(|| DEFAULT_MODE.into()),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
