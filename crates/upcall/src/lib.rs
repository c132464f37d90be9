// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Upcall dispatch with an undo log.
//!
//! Writes requested by the checker are applied to a [`tinyns::Namespace`]
//! together with a record of how to reverse them. The checker later commits
//! a prefix of those records or rolls back a suffix.

mod config;
mod error;
mod executor;
mod gateway;
mod guard;
mod protocol;
mod record;
mod transport;
mod undo_log;

pub use config::{ReadIsolation, RollbackCheck, ServerConfig};
pub use error::{Error, Result};
pub use executor::Executor;
pub use gateway::Gateway;
pub use guard::{ConcurrencyGuard, WriteGuard};
pub use protocol::{Reply, Request, WriteOp};
pub use record::{OpKind, OpNum, Reversal, UndoRecord};
pub use transport::{Ack, Frame, LineTransport, MAX_FRAME_LEN, Upcalls};
pub use undo_log::UndoLog;
