use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Raw environment variable that overrides the database file path.
pub const DATABASE_PATH_ENV: &str = "SQLITE_DB";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    /// URL prefix the upload directory is served under; also the prefix of every stored `image_url`.
    pub upload_url_prefix: String,
    pub listen_addr: String,
    pub loglevel: String,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("database.db"),
            upload_dir: PathBuf::from("public/upload"),
            upload_url_prefix: "/upload".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            loglevel: "info".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `POSTBOARD_*` variables, then `SQLITE_DB`.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("POSTBOARD_"))
            .merge(
                Env::raw()
                    .only(&[DATABASE_PATH_ENV])
                    .map(|_| "database_path".into()),
            )
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}
