use crate::services::model_handle::ModelHandle;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unable to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Model artifact {} is corrupt: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Model artifact is incompatible: {0}")]
    Incompatible(String),
}

/// Loads the model artifact on first use and serves the cached handle afterwards.
pub struct ModelLoader {
    path: PathBuf,
    handle: OnceCell<Arc<ModelHandle>>,
}

impl ModelLoader {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            handle: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Arc<ModelHandle>, LoadError> {
        self.handle
            .get_or_try_init(|| {
                let handle = ModelHandle::from_path(&self.path)?;
                let info = handle.info();
                info!(
                    "Loaded model from {} ({} trees over {} features)",
                    self.path.display(),
                    info.n_trees,
                    info.n_features
                );
                Ok(Arc::new(handle))
            })
            .cloned()
    }
}
