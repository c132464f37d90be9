// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::record::OpNum;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot parse request: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown op: {0}")]
    UnknownOperation(String),

    #[error("{0}")]
    Namespace(#[from] tinyns::Error),

    #[error("operation {opnum} does not follow operation {last}")]
    StaleOpnum { opnum: OpNum, last: OpNum },

    #[error("rollback asserted current operation {asserted} but the undo log ends at {actual}")]
    TailMismatch { asserted: OpNum, actual: OpNum },

    #[error("undo of operation {opnum} failed: {source}")]
    Undo {
        opnum: OpNum,
        #[source]
        source: tinyns::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml_ng::Error),
}
