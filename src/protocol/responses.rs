//! FTP reply writing
//!
//! Replies are formatted straight onto the connection through a small
//! fixed buffer, so no reply ever needs a heap allocation. Use the
//! [`reply!`](crate::reply) macro for single lines; it appends CRLF and
//! logs the line at debug level.

use log::{debug, warn};
use std::fmt::{self, Write};
use std::io;

use crate::server::transport::Connection;
use crate::utils::BoundedString;

const WRITE_BUFFER: usize = 256;

/// Buffered `fmt::Write` sink over a connection. Call [`finish`] to push out
/// the tail of the buffer.
///
/// [`finish`]: ConnectionWriter::finish
pub struct ConnectionWriter<'a, C: Connection> {
    conn: &'a mut C,
    buf: BoundedString<WRITE_BUFFER>,
    error: Option<io::Error>,
}

impl<'a, C: Connection> ConnectionWriter<'a, C> {
    pub fn new(conn: &'a mut C) -> Self {
        Self {
            conn,
            buf: BoundedString::new(),
            error: None,
        }
    }

    fn flush(&mut self) -> fmt::Result {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.conn.write_all(self.buf.as_bytes());
        self.buf.clear();
        self.record(result)
    }

    fn record(&mut self, result: io::Result<()>) -> fmt::Result {
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.error.get_or_insert(e);
                Err(fmt::Error)
            }
        }
    }

    /// Sends whatever is still buffered and reports the first write error.
    pub fn finish(mut self) -> io::Result<()> {
        let _ = self.flush();
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<C: Connection> Write for ConnectionWriter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.error.is_some() {
            return Err(fmt::Error);
        }
        if self.buf.push_str(s).is_ok() {
            return Ok(());
        }
        self.flush()?;
        if self.buf.push_str(s).is_ok() {
            return Ok(());
        }
        let result = self.conn.write_all(s.as_bytes());
        self.record(result)
    }
}

/// Writes one reply line followed by CRLF.
pub fn send<C: Connection>(conn: &mut C, line: fmt::Arguments<'_>) {
    debug!("<- {}", line);
    let mut out = ConnectionWriter::new(conn);
    let _ = out.write_fmt(line).and_then(|_| out.write_str("\r\n"));
    if let Err(e) = out.finish() {
        warn!("Failed to send reply: {}", e);
    }
}

/// Sends a formatted reply line on a control connection.
#[macro_export]
macro_rules! reply {
    ($conn:expr, $($arg:tt)*) => {
        $crate::protocol::responses::send($conn, format_args!($($arg)*))
    };
}

/// Three-line greeting sent on every accepted control connection.
pub fn send_banner<C: Connection>(conn: &mut C) {
    crate::reply!(conn, "220--- Welcome to pollftpd ---");
    crate::reply!(conn, "220---  single session FTP  ---");
    crate::reply!(conn, "220 --   Version {}   --", env!("CARGO_PKG_VERSION"));
}

/// Extension list advertised by FEAT.
pub fn send_features<C: Connection>(conn: &mut C) {
    crate::reply!(conn, "211-Extensions supported:");
    for feature in ["MDTM", "MLSD", "SIZE", "SITE FREE"] {
        crate::reply!(conn, " {}", feature);
    }
    crate::reply!(conn, "211 End.");
}
