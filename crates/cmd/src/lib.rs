// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod commands;
pub mod common;

pub use commands::config::{config_command, config_command_as_string};
pub use commands::serve::{ServeSummary, serve_command, serve_with_io};
