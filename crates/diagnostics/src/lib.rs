// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging setup shared by the upcall server crates
//!
//! Usage:
//! - Set SPECSERVER_LOG=off (default) - no logs
//! - Set SPECSERVER_LOG=info - upcall summaries, commits and rollbacks
//! - Set SPECSERVER_LOG=debug - every upcall and undo record

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable consulted by [`init_diagnostics`]
pub const LOG_ENV: &str = "SPECSERVER_LOG";

static INIT: Once = Once::new();

/// Outcome of reading the log level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSetting {
    Off,
    Min(emit::Level),
    /// Unrecognized value; logging falls back to info.
    Unknown,
}

/// Interpret a SPECSERVER_LOG value.
#[must_use]
pub fn parse_level(value: &str) -> LevelSetting {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => LevelSetting::Off,
        "debug" => LevelSetting::Min(emit::Level::Debug),
        "info" => LevelSetting::Min(emit::Level::Info),
        "warn" => LevelSetting::Min(emit::Level::Warn),
        "error" => LevelSetting::Min(emit::Level::Error),
        _ => LevelSetting::Unknown,
    }
}

/// Initialize diagnostics based on the SPECSERVER_LOG environment variable
///
/// This should be called once at startup. Subsequent calls are ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let value = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());

        let setting = parse_level(&value);
        let min = match setting {
            LevelSetting::Off => return,
            LevelSetting::Min(level) => level,
            LevelSetting::Unknown => emit::Level::Info,
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(min))
            .init();

        if setting == LevelSetting::Unknown {
            emit::warn!(
                "unknown {env} value {value}, using info",
                env: LOG_ENV,
                value: value.as_str()
            );
        }

        // The runtime lives for the rest of the process.
        std::mem::forget(rt);
    });
}

/// Log basic operations (commits, rollbacks, server lifecycle)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (individual upcalls, undo records)
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable conditions (rejected requests, opnum disagreements)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures (namespace errors, failed undo)
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Re-export the init function for convenience
pub use init_diagnostics as init;
