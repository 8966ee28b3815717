//! Network collaborator interface
//!
//! The poll loop never touches sockets directly. It sees one listening
//! endpoint for control connections, one passive data endpoint, and the
//! connections they hand out.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};

/// A connected byte stream. Every call must return without blocking on the
/// peer, except `write_all`, which may wait for send buffer space.
pub trait Connection {
    /// False once the peer has closed its side or the stream failed.
    fn is_connected(&mut self) -> bool;

    /// Bytes that can be read right now without blocking.
    fn available(&mut self) -> usize;

    /// Reads what is pending, returning `Ok(0)` when nothing is.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn close(&mut self);

    /// Local IPv4 address this connection arrived on, if known.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

/// Listening endpoints and outbound connects.
pub trait Transport {
    type Conn: Connection;

    /// Takes one pending control connection, if any.
    fn accept_control(&mut self) -> io::Result<Option<Self::Conn>>;

    /// Makes sure the passive data endpoint is listening and returns its port.
    fn open_passive(&mut self) -> io::Result<u16>;

    /// Takes one pending connection on the passive endpoint, if any.
    fn accept_data(&mut self) -> io::Result<Option<Self::Conn>>;

    /// Opens an active-mode data connection to `peer`.
    fn connect(&mut self, peer: SocketAddrV4) -> io::Result<Self::Conn>;

    /// Address advertised in the PASV reply.
    fn local_address(&self) -> Ipv4Addr;
}
