use std::path::PathBuf;

use crate::application::AppError;
use crate::storage::StoreKind;

/// Environment variable consulted when `--data` is not given.
pub const DATA_ENV_VAR: &str = "SAVINGS365_DATA";

/// Data file used when neither the flag nor the environment names one.
pub const DEFAULT_DATA_FILE: &str = "savings_data.json";

/// Where the ledger lives and which backend reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_path: PathBuf,
    pub store_kind: StoreKind,
}

impl Config {
    /// Resolve the data location. An explicit backend name wins; otherwise
    /// the file extension decides, falling back to JSON.
    pub fn resolve(data_path: Option<PathBuf>, backend: Option<&str>) -> Result<Self, AppError> {
        let data_path = data_path
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        let store_kind = match backend {
            Some(name) => name.parse::<StoreKind>().map_err(AppError::Config)?,
            None => StoreKind::from_path(&data_path).unwrap_or(StoreKind::Json),
        };

        Ok(Self {
            data_path,
            store_kind,
        })
    }
}
