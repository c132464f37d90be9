// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use diagnostics::*;
use upcall::ServerConfig;

/// Environment variable naming the config file when `--config` is absent
pub const CONFIG_ENV: &str = "SPECSERVER_CONFIG";

/// The config file to use: the override if given, else `SPECSERVER_CONFIG`, else none.
#[must_use]
pub fn config_path_with_override(override_path: Option<PathBuf>) -> Option<PathBuf> {
    override_path.or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from))
}

/// Load the server config, falling back to defaults when no file is named.
pub fn load_config(override_path: Option<PathBuf>) -> Result<ServerConfig> {
    match config_path_with_override(override_path) {
        Some(path) => {
            let display = path.display().to_string();
            debug!("loading config from {path}", path: display.as_str());
            ServerConfig::load(&path)
                .map_err(|e| anyhow!("cannot load config {}: {}", display, e))
        }
        None => Ok(ServerConfig::default()),
    }
}
