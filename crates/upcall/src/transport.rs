// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Transport-neutral upcall entry points and a line-delimited JSON server

use async_trait::async_trait;
use diagnostics::*;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::gateway::Gateway;
use crate::record::OpNum;

/// The three entry points the checker invokes
#[async_trait]
pub trait Upcalls: Send + Sync {
    async fn replica_upcall(&self, opnum: i64, request: &[u8]) -> Vec<u8>;

    async fn commit_upcall(&self, opnum: i64) -> Result<()>;

    async fn rollback_upcall(&self, current: i64, target: i64) -> Result<()>;
}

#[async_trait]
impl Upcalls for Gateway {
    async fn replica_upcall(&self, opnum: i64, request: &[u8]) -> Vec<u8> {
        self.handle_replica_op(OpNum::new(opnum), request).await
    }

    async fn commit_upcall(&self, opnum: i64) -> Result<()> {
        _ = self.handle_commit(OpNum::new(opnum)).await;
        Ok(())
    }

    async fn rollback_upcall(&self, current: i64, target: i64) -> Result<()> {
        _ = self
            .handle_rollback(OpNum::new(current), OpNum::new(target))
            .await?;
        Ok(())
    }
}

/// One line on the wire from the checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "upcall", rename_all = "snake_case")]
pub enum Frame {
    Replica {
        opnum: i64,
        request: serde_json::Value,
    },
    Commit {
        opnum: i64,
    },
    Rollback {
        current: i64,
        target: i64,
    },
    Shutdown,
}

/// Response line for every frame except replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Ack {
    Ok,
    Error { message: String },
}

impl Ack {
    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Ack::Ok,
            Err(e) => Ack::Error {
                message: e.to_string(),
            },
        }
    }
}

/// Longest frame accepted by default, newline included
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// One line as read off the wire
enum Line {
    Frame(Vec<u8>),
    /// A line longer than the limit, already skipped; carries its length.
    Oversize(usize),
}

/// Serves upcalls over newline-delimited JSON
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    max_frame_len: usize,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    #[must_use]
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Handle frames until EOF or a shutdown frame. Returns how many frames
    /// were handled. Only I/O failures end the loop early.
    pub async fn serve(&mut self, upcalls: &dyn Upcalls) -> Result<u64> {
        let mut handled = 0;

        loop {
            let bytes = match self.read_line().await? {
                None => {
                    debug!("transport reached end of input");
                    break;
                }
                Some(Line::Oversize(len)) => {
                    handled += 1;
                    warn!("dropped frame of {len} bytes", len: len);
                    self.send(&Ack::Error {
                        message: format!(
                            "frame of {len} bytes exceeds limit of {} bytes",
                            self.max_frame_len
                        ),
                    })
                    .await?;
                    continue;
                }
                Some(Line::Frame(bytes)) => bytes,
            };
            let text = bytes.trim_ascii();
            if text.is_empty() {
                continue;
            }
            handled += 1;

            let frame = match serde_json::from_slice::<Frame>(text) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("undecodable frame: {error}", error: e.to_string());
                    self.send(&Ack::Error {
                        message: format!("cannot decode frame: {e}"),
                    })
                    .await?;
                    continue;
                }
            };

            match frame {
                Frame::Replica { opnum, request } => {
                    let raw = serde_json::to_vec(&request)?;
                    let reply = upcalls.replica_upcall(opnum, &raw).await;
                    self.send_line(&reply).await?;
                }
                Frame::Commit { opnum } => {
                    let ack = Ack::from_result(upcalls.commit_upcall(opnum).await);
                    self.send(&ack).await?;
                }
                Frame::Rollback { current, target } => {
                    let ack = Ack::from_result(upcalls.rollback_upcall(current, target).await);
                    self.send(&ack).await?;
                }
                Frame::Shutdown => {
                    self.send(&Ack::Ok).await?;
                    info!("transport shutting down after {handled} frames", handled: handled);
                    break;
                }
            }
        }
        Ok(handled)
    }

    /// Read one line, at most `max_frame_len` bytes of it into memory.
    async fn read_line(&mut self) -> Result<Option<Line>> {
        let mut buf = Vec::new();
        let limit = self.max_frame_len as u64 + 1;
        if (&mut self.reader).take(limit).read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        if buf.len() <= self.max_frame_len {
            return Ok(Some(Line::Frame(buf)));
        }
        let mut len = buf.len();
        if buf.last() != Some(&b'\n') {
            len += self.skip_line().await?;
        }
        Ok(Some(Line::Oversize(len)))
    }

    /// Discard input through the next newline. Returns the bytes skipped.
    async fn skip_line(&mut self) -> Result<usize> {
        let mut skipped = 0;
        loop {
            let (used, done) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(skipped);
                }
                match available.iter().position(|b| *b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(used);
            skipped += used;
            if done {
                return Ok(skipped);
            }
        }
    }

    async fn send(&mut self, ack: &Ack) -> Result<()> {
        let bytes = serde_json::to_vec(ack)?;
        self.send_line(&bytes).await
    }

    async fn send_line(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
