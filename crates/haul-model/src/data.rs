use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::schema::TransportData;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

/// Supplies the sets and parameters of one problem instance by identifier
pub trait DataSource {
    fn load(&self, scenario: &str) -> Result<TransportData, DataError>;
}

/// Reads scenarios from JSON files; the scenario id is a path
#[derive(Debug, Clone, Default)]
pub struct JsonDataSource {
    /// Base directory for relative scenario paths
    base_dir: Option<PathBuf>,
}

impl JsonDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a data source resolving relative paths against `base_dir`
    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    fn resolve(&self, scenario: &str) -> PathBuf {
        let path = Path::new(scenario);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DataSource for JsonDataSource {
    fn load(&self, scenario: &str) -> Result<TransportData, DataError> {
        let path = self.resolve(scenario);
        debug!(path = %path.display(), "reading scenario data");

        let source = std::fs::read_to_string(&path).map_err(|e| DataError::Io {
            path: path.clone(),
            source: e,
        })?;

        serde_json::from_str(&source).map_err(|e| DataError::Json { path, source: e })
    }
}

/// In-memory scenarios keyed by id
impl DataSource for BTreeMap<String, TransportData> {
    fn load(&self, scenario: &str) -> Result<TransportData, DataError> {
        self.get(scenario)
            .cloned()
            .ok_or_else(|| DataError::UnknownScenario(scenario.to_string()))
    }
}
