// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Applies one write: capture the pre-image, mutate, log the reversal

use diagnostics::*;
use std::sync::Arc;
use tinyns::Namespace;

use crate::error::{Error, Result};
use crate::guard::WriteGuard;
use crate::protocol::WriteOp;
use crate::record::{OpNum, Reversal, UndoRecord};

pub struct Executor {
    ns: Arc<dyn Namespace>,
}

impl Executor {
    pub fn new(ns: Arc<dyn Namespace>) -> Self {
        Self { ns }
    }

    /// Apply `op` as operation `opnum` and return the namespace's answer.
    ///
    /// Taking the `WriteGuard` means the caller holds the write lock for the
    /// whole call. The record being built is local to this call and reaches
    /// the log only after the mutation succeeded; on any error the log is
    /// untouched.
    pub async fn apply_write(
        &self,
        log: &mut WriteGuard<'_>,
        opnum: OpNum,
        op: &WriteOp,
    ) -> Result<bool> {
        if let Some(last) = log.high_water() {
            if opnum <= last {
                return Err(Error::StaleOpnum { opnum, last });
            }
        }

        let (applied, reversal) = match op {
            WriteOp::MakeDirectory {
                path,
                permission,
                create_parents,
            } => {
                let missing = self.ns.missing_segments(path).await?;
                let applied = self.ns.mkdirs(path, *permission, *create_parents).await?;
                let created = if applied { missing } else { Vec::new() };
                (applied, Reversal::RemoveCreated { created })
            }
            WriteOp::Remove { path, recursive } => {
                let snapshot = self.ns.snapshot(path).await?;
                let applied = self.ns.delete(path, *recursive).await?;
                let subtree = snapshot.filter(|_| applied);
                (applied, Reversal::RestoreDeleted { subtree })
            }
        };

        let record = UndoRecord::new(opnum, op.path(), reversal);
        log_debug!(
            "logged operation {opnum} ({kind}) applied={applied}",
            opnum: opnum.get(),
            kind: record.kind().as_str(),
            applied: applied
        );
        log.append(record);
        Ok(applied)
    }
}
