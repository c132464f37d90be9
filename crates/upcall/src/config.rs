// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// How a rollback treats a `current` opnum that disagrees with the log tail
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackCheck {
    /// Warn and roll back anyway.
    #[default]
    Lenient,
    /// Refuse the rollback with `Error::TailMismatch`.
    Strict,
}

/// Whether LIST waits for in-flight writes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadIsolation {
    /// Listings bypass the write lock.
    #[default]
    Shared,
    /// Listings take the write lock and are ordered with writes.
    Exclusive,
}

fn default_listing_limit() -> usize {
    tinyns::DEFAULT_LISTING_LIMIT
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub rollback_check: RollbackCheck,
    pub read_isolation: ReadIsolation,
    #[serde(default = "default_listing_limit")]
    pub listing_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rollback_check: RollbackCheck::default(),
            read_isolation: ReadIsolation::default(),
            listing_limit: default_listing_limit(),
        }
    }
}

impl ServerConfig {
    /// Read a YAML config file. An empty file means all defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
