// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;

use crate::common::load_config;

pub fn config_command(config_path: Option<PathBuf>) -> Result<()> {
    let output = config_command_as_string(config_path)?;
    std::io::stdout().write_all(output.as_bytes())?;
    Ok(())
}

/// The effective config, defaults filled in, as YAML.
pub fn config_command_as_string(config_path: Option<PathBuf>) -> Result<String> {
    let config = load_config(config_path)?;
    Ok(config.to_yaml()?)
}
