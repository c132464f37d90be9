// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Write lock over the undo log
//!
//! One exclusive lock serializes every namespace mutation with its log
//! append, and commit/rollback with both. Holding a [`WriteGuard`] is the
//! only way to reach the log mutably, so the order of records in the log is
//! the order in which mutations were applied.

use std::ops::{Deref, DerefMut};
use tokio::sync::{Mutex, MutexGuard};

use crate::undo_log::UndoLog;

#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    log: Mutex<UndoLog>,
}

/// Exclusive access to the undo log for the duration of one upcall
#[derive(Debug)]
pub struct WriteGuard<'a> {
    log: MutexGuard<'a, UndoLog>,
}

impl ConcurrencyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the write lock.
    pub async fn write(&self) -> WriteGuard<'_> {
        WriteGuard {
            log: self.log.lock().await,
        }
    }

    /// Take the write lock only if nobody holds it.
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        self.log.try_lock().ok().map(|log| WriteGuard { log })
    }
}

impl Deref for WriteGuard<'_> {
    type Target = UndoLog;

    fn deref(&self) -> &Self::Target {
        &self.log
    }
}

impl DerefMut for WriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.log
    }
}
