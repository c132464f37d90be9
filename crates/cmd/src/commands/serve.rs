// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use diagnostics::*;
use tinyns::MemoryNamespace;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use upcall::{Gateway, LineTransport, OpNum, ServerConfig};

use crate::common::load_config;

/// What a finished session leaves behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSummary {
    pub frames: u64,
    /// Operations neither committed nor rolled back when the session ended.
    pub pending: Vec<OpNum>,
}

/// Serve upcalls on stdin/stdout until EOF or a shutdown frame.
pub async fn serve_command(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    let summary = serve_with_io(config, reader, writer).await?;
    if !summary.pending.is_empty() {
        let pending: Vec<String> = summary.pending.iter().map(ToString::to_string).collect();
        warn!(
            "session ended with {count} uncommitted operations: {opnums}",
            count: summary.pending.len(),
            opnums: pending.join(",").as_str()
        );
    }
    Ok(())
}

/// Run one session against a fresh in-memory namespace.
pub async fn serve_with_io<R, W>(config: ServerConfig, reader: R, writer: W) -> Result<ServeSummary>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let ns = MemoryNamespace::with_listing_limit(config.listing_limit);
    let gateway = Gateway::with_config(Arc::new(ns), config);

    info!("serving upcalls");
    let mut transport = LineTransport::new(reader, writer);
    let frames = transport.serve(&gateway).await?;
    let pending = gateway.pending().await;

    info!(
        "session finished after {frames} frames, {pending} operations pending",
        frames: frames,
        pending: pending.len()
    );
    Ok(ServeSummary { frames, pending })
}
