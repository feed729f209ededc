//! Configuration file loading.

use std::{fs, path::Path};

use aunbridge_core::BridgeConfig;
use tracing::debug;

use crate::error::ServerError;

/// Read, parse and validate the JSON configuration at `path`.
pub fn load(path: &Path) -> Result<BridgeConfig, ServerError> {
    let text = fs::read_to_string(path)
        .map_err(|source| ServerError::ReadConfig { path: path.to_path_buf(), source })?;
    let config: BridgeConfig = serde_json::from_str(&text)
        .map_err(|source| ServerError::ParseConfig { path: path.to_path_buf(), source })?;
    config.validate()?;

    debug!(
        path = %path.display(),
        network = config.our_network(),
        local_stations = config.local_stations.len(),
        remote_stations = config.remote_stations.len(),
        trunks = config.trunks.len(),
        "configuration loaded"
    );
    Ok(config)
}
