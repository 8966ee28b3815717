//! Transfer result types
//!
//! Values produced by the data channel and the copy loop, with the reply
//! text they render to.

use std::fmt;
use std::net::Ipv4Addr;

/// Endpoint advertised by a PASV reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveModeResult {
    pub address: Ipv4Addr,
    pub port: u16,
}

impl fmt::Display for PassiveModeResult {
    /// `a,b,c,d,p1,p2` with the port split into its two bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.address.octets();
        let [hi, lo] = self.port.to_be_bytes();
        write!(f, "{},{},{},{},{},{}", a, b, c, d, hi, lo)
    }
}

/// What one pass of the copy loop achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Bytes were copied.
    Moved(usize),
    /// Nothing arrived this time; the peer may be pacing.
    Idle,
    /// End of file, or the uploading peer closed the connection.
    Complete,
}

/// Byte and time accounting of a finished transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    pub bytes: u64,
    pub elapsed_ms: u32,
}

impl TransferSummary {
    /// Throughput in kilobytes per second, when both counters are positive.
    pub fn kbytes_per_sec(&self) -> Option<u64> {
        (self.bytes > 0 && self.elapsed_ms > 0).then(|| self.bytes / u64::from(self.elapsed_ms))
    }
}
