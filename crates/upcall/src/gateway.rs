// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Upcall gateway: the boundary the checker calls into
//!
//! Replica upcalls never fail across this boundary. Whatever goes wrong is
//! logged and rendered as an exception reply. Commit and rollback report
//! the number of records they discarded.

use diagnostics::*;
use std::sync::Arc;
use tinyns::Namespace;

use crate::config::{ReadIsolation, RollbackCheck, ServerConfig};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::guard::ConcurrencyGuard;
use crate::protocol::{Reply, Request};
use crate::record::OpNum;

pub struct Gateway {
    ns: Arc<dyn Namespace>,
    guard: ConcurrencyGuard,
    executor: Executor,
    config: ServerConfig,
}

impl Gateway {
    pub fn new(ns: Arc<dyn Namespace>) -> Self {
        Self::with_config(ns, ServerConfig::default())
    }

    pub fn with_config(ns: Arc<dyn Namespace>, config: ServerConfig) -> Self {
        Self {
            executor: Executor::new(ns.clone()),
            guard: ConcurrencyGuard::new(),
            ns,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Decode `raw`, run it, and encode the reply.
    pub async fn handle_replica_op(&self, opnum: OpNum, raw: &[u8]) -> Vec<u8> {
        let reply = match self.dispatch(opnum, raw).await {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    Error::Namespace(_) => {
                        log_warn!(
                            "operation {opnum} failed in the namespace: {error}",
                            opnum: opnum.get(),
                            error: err.to_string()
                        );
                    }
                    _ => {
                        log_error!(
                            "operation {opnum} rejected: {error}",
                            opnum: opnum.get(),
                            error: err.to_string()
                        );
                    }
                }
                Reply::Exception(err.to_string())
            }
        };
        reply.encode()
    }

    async fn dispatch(&self, opnum: OpNum, raw: &[u8]) -> Result<Reply> {
        let request = Request::parse(raw)?;
        log_debug!(
            "replica upcall {opnum} ({kind})",
            opnum: opnum.get(),
            kind: request.kind().as_str()
        );

        match request {
            Request::List {
                path,
                start_after,
                need_location,
            } => {
                let mut listing = match self.config.read_isolation {
                    ReadIsolation::Shared => {
                        self.ns.get_listing(&path, &start_after, need_location).await?
                    }
                    ReadIsolation::Exclusive => {
                        let _held = self.guard.write().await;
                        self.ns.get_listing(&path, &start_after, need_location).await?
                    }
                };
                listing.void_timestamps();
                Ok(Reply::DirectoryListing(serde_json::to_vec(&listing)?))
            }
            Request::Write(op) => {
                let mut log = self.guard.write().await;
                let applied = self.executor.apply_write(&mut log, opnum, &op).await?;
                Ok(Reply::Success(applied))
            }
        }
    }

    /// Make every operation up to and including `opnum` permanent.
    pub async fn handle_commit(&self, opnum: OpNum) -> usize {
        let mut log = self.guard.write().await;
        let committed = log.commit(opnum);
        log_info!(
            "commit through {opnum}: {committed} records discarded, {pending} pending",
            opnum: opnum.get(),
            committed: committed,
            pending: log.len()
        );
        committed
    }

    /// Undo every operation from the newest back to `target` inclusive.
    ///
    /// `current` is what the caller believes the newest operation to be.
    /// How a disagreement with the log is treated depends on
    /// `ServerConfig::rollback_check`.
    pub async fn handle_rollback(&self, current: OpNum, target: OpNum) -> Result<usize> {
        let mut log = self.guard.write().await;

        if let Some(actual) = log.tail_opnum() {
            if actual != current {
                match self.config.rollback_check {
                    RollbackCheck::Strict => {
                        log_error!(
                            "rollback refused: asserted current {current} but log ends at {actual}",
                            current: current.get(),
                            actual: actual.get()
                        );
                        return Err(Error::TailMismatch {
                            asserted: current,
                            actual,
                        });
                    }
                    RollbackCheck::Lenient => {
                        log_warn!(
                            "rollback asserted current {current} but log ends at {actual}",
                            current: current.get(),
                            actual: actual.get()
                        );
                    }
                }
            }
        }

        let result = log.rollback(target, self.ns.as_ref()).await;
        match &result {
            Ok(undone) => {
                log_info!(
                    "rollback to {target}: {undone} records undone, {pending} pending",
                    target: target.get(),
                    undone: *undone,
                    pending: log.len()
                );
            }
            Err(err) => {
                log_error!(
                    "rollback to {target} stopped: {error}",
                    target: target.get(),
                    error: err.to_string()
                );
            }
        }
        result
    }

    /// Operation numbers still held in the undo log, head to tail.
    pub async fn pending(&self) -> Vec<OpNum> {
        self.guard.write().await.opnums()
    }
}
