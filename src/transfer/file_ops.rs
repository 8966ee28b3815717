//! Module `file_ops`
//!
//! The chunked copy loop between an open file and the data connection.
//! One chunk moves per poll; the transfer value carries everything that
//! must survive between polls.

use log::{info, warn};

use crate::constants::TRANSFER_CHUNK_SIZE;
use crate::error::TransferError;
use crate::server::transport::Connection;
use crate::storage::FileHandle;
use crate::transfer::data_channel::DataChannel;
use crate::transfer::modes::Direction;
use crate::transfer::results::{ChunkOutcome, TransferSummary};
use crate::utils::clock::elapsed_since;

/// An in-flight RETR or STOR. Dropping it closes the file.
#[derive(Debug)]
pub struct Transfer<F> {
    direction: Direction,
    file: F,
    bytes: u64,
    started_at: u32,
}

impl<F: FileHandle> Transfer<F> {
    pub fn new(direction: Direction, file: F, now: u32) -> Self {
        Self {
            direction,
            file,
            bytes: 0,
            started_at: now,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Copies at most one chunk in the transfer's direction.
    pub fn copy_chunk<C: Connection>(
        &mut self,
        data: Option<&mut C>,
    ) -> Result<ChunkOutcome, TransferError> {
        let mut buf = [0u8; TRANSFER_CHUNK_SIZE];
        match self.direction {
            Direction::Retrieve => {
                let n = self.file.read(&mut buf).map_err(TransferError::File)?;
                if n == 0 {
                    return Ok(ChunkOutcome::Complete);
                }
                let data = data.ok_or(TransferError::ConnectionDropped)?;
                data.write_all(&buf[..n]).map_err(TransferError::Network)?;
                self.bytes += n as u64;
                Ok(ChunkOutcome::Moved(n))
            }
            Direction::Store => {
                let Some(data) = data else {
                    return Ok(ChunkOutcome::Complete);
                };
                let n = data.read(&mut buf).map_err(TransferError::Network)?;
                if n > 0 {
                    self.file.write_all(&buf[..n]).map_err(TransferError::File)?;
                    self.bytes += n as u64;
                    Ok(ChunkOutcome::Moved(n))
                } else if data.is_connected() {
                    Ok(ChunkOutcome::Idle)
                } else {
                    Ok(ChunkOutcome::Complete)
                }
            }
        }
    }

    pub fn summary(&self, now: u32) -> TransferSummary {
        TransferSummary {
            bytes: self.bytes,
            elapsed_ms: elapsed_since(self.started_at, now),
        }
    }
}

/// Closes the file and the data connection and reports success on the
/// control connection.
pub fn finish<F: FileHandle, C: Connection>(
    transfer: Transfer<F>,
    data: &mut DataChannel<C>,
    control: &mut C,
    now: u32,
) {
    let summary = transfer.summary(now);
    drop(transfer);
    data.close();

    info!(
        "Transfer complete: {} bytes in {} ms",
        summary.bytes, summary.elapsed_ms
    );
    match summary.kbytes_per_sec() {
        Some(rate) => {
            crate::reply!(control, "226-File successfully transferred");
            crate::reply!(control, "226 {} ms, {} kbytes/s", summary.elapsed_ms, rate);
        }
        None => crate::reply!(control, "226 File successfully transferred"),
    }
}

/// Abandons the transfer, if any: closes the file and the data connection
/// and sends the abort reply. Returns whether a transfer was running.
pub fn abort<F: FileHandle, C: Connection>(
    transfer: &mut Option<Transfer<F>>,
    data: &mut DataChannel<C>,
    control: Option<&mut C>,
) -> bool {
    let Some(running) = transfer.take() else {
        return false;
    };
    warn!(
        "Transfer aborted after {} bytes ({:?})",
        running.bytes(),
        running.direction()
    );
    drop(running);
    data.close();
    if let Some(control) = control {
        crate::reply!(control, "426 Transfer aborted");
    }
    true
}
