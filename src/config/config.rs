use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: Path::new("models").join("phone_battery_model.json"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    title: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: "Phone Battery Estimator".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    server: ServerConfig,
    model: ModelConfig,
    page: PageConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error reading config: {0}")]
    Confy(#[from] confy::ConfyError),
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Config> {
        let cfg = Config::load_or_create(path);
        match cfg {
            Err(ConfigError::Confy(message, ..)) => {
                error!("Failed to load configuration: {}", message);
            }
            Err(ConfigError::Io(message, ..)) => {
                error!("Failed to load configuration: {}", message);
            }
            Ok(cfg) => return Some(cfg),
        }
        None
    }

    fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        if path.exists() {
            let cfg: Self = confy::load_path(path)?;
            Ok(cfg)
        } else {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let cfg = Config::default();
            confy::store_path(path, &cfg)?;
            info!("Wrote default configuration to {}", path.display());
            Ok(cfg)
        }
    }

    pub fn get_listen_address(&self) -> String {
        self.server.listen_address.clone()
    }

    pub fn get_model_path(&self) -> PathBuf {
        self.model.path.clone()
    }

    pub fn get_page_title(&self) -> String {
        self.page.title.clone()
    }
}
