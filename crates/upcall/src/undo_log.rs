// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The undo log: reversible mutations ordered by operation number
//!
//! Records enter at the tail as writes are applied. Commit discards a
//! prefix, making those mutations permanent. Rollback reverses a suffix,
//! newest first, and discards each record once it has been undone.
//!
//! The log is only ever reached through the write lock (see `guard`), which
//! keeps its order identical to the order mutations hit the namespace.
//!
//! The log also remembers the highest operation number it has accepted or
//! committed, so a write cannot slip in below history that has already been
//! made permanent.

use diagnostics::*;
use std::collections::VecDeque;
use tinyns::Namespace;

use crate::error::{Error, Result};
use crate::record::{OpNum, UndoRecord};

#[derive(Debug, Default)]
pub struct UndoLog {
    records: VecDeque<UndoRecord>,
    /// Highest opnum made permanent by commit.
    committed: Option<OpNum>,
    /// Highest opnum that is logged or committed.
    high_water: Option<OpNum>,
}

impl UndoLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn head_opnum(&self) -> Option<OpNum> {
        self.records.front().map(|r| r.opnum)
    }

    #[must_use]
    pub fn tail_opnum(&self) -> Option<OpNum> {
        self.records.back().map(|r| r.opnum)
    }

    /// Highest operation number a new write must exceed.
    #[must_use]
    pub fn high_water(&self) -> Option<OpNum> {
        self.high_water
    }

    /// Operation numbers from head to tail.
    #[must_use]
    pub fn opnums(&self) -> Vec<OpNum> {
        self.records.iter().map(|r| r.opnum).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &UndoRecord> {
        self.records.iter()
    }

    /// Add a record at the tail.
    ///
    /// # Panics
    ///
    /// Panics if `record.opnum` does not exceed the current tail. Callers
    /// validate operation numbers before mutating the namespace, so reaching
    /// this means the log and the namespace have diverged.
    pub fn append(&mut self, record: UndoRecord) {
        if let Some(tail) = self.tail_opnum() {
            assert!(
                record.opnum > tail,
                "FATAL: undo record {} appended after {}; the undo log must stay strictly ordered",
                record.opnum,
                tail
            );
        }
        self.high_water = self.high_water.max(Some(record.opnum));
        self.records.push_back(record);
    }

    /// Discard every record with `opnum <= upto`. Returns how many went.
    pub fn commit(&mut self, upto: OpNum) -> usize {
        let mut discarded = 0;
        while self.records.front().is_some_and(|r| r.opnum <= upto) {
            _ = self.records.pop_front();
            discarded += 1;
        }
        self.committed = self.committed.max(Some(upto));
        self.high_water = self.high_water.max(Some(upto));
        discarded
    }

    /// Undo, newest first, every record with `opnum >= target`. Returns how
    /// many were undone.
    ///
    /// A record is discarded only after its reversal succeeded. If one
    /// fails, it stays at the tail together with everything older, and the
    /// error names its operation.
    ///
    /// Afterwards the high-water mark drops to just below `target`, but
    /// never below a committed opnum or a record still in the log.
    pub async fn rollback(&mut self, target: OpNum, ns: &dyn Namespace) -> Result<usize> {
        let result = self.undo_from(target, ns).await;
        let floor = self.committed.max(self.tail_opnum());
        let below_target = OpNum::new(target.get().saturating_sub(1));
        self.high_water = floor.max(self.high_water.map(|hw| hw.min(below_target)));
        result
    }

    async fn undo_from(&mut self, target: OpNum, ns: &dyn Namespace) -> Result<usize> {
        let mut undone = 0;
        while let Some(record) = self.records.back() {
            if record.opnum < target {
                break;
            }
            record.undo(ns).await.map_err(|source| Error::Undo {
                opnum: record.opnum,
                source,
            })?;
            log_debug!(
                "undid operation {opnum} ({kind})",
                opnum: record.opnum.get(),
                kind: record.kind().as_str()
            );
            _ = self.records.pop_back();
            undone += 1;
        }
        Ok(undone)
    }
}
