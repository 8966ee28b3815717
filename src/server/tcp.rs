//! std::net transport
//!
//! Non-blocking sockets behind the `Transport` and `Connection` traits.
//! Reads and accepts never wait. Writes switch the socket to blocking mode, bounded by a
//! write timeout, so a full send buffer cannot drop reply or file bytes.

use log::{debug, info};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{
    Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream,
};
use std::time::Duration;

use crate::error::ServerError;
use crate::server::transport::{Connection, Transport};

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const PEEK_WINDOW: usize = 512;

/// Socket settings of the std transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSettings {
    pub bind_address: Ipv4Addr,
    pub control_port: u16,
    /// Passive data port; 0 lets the OS pick one.
    pub pasv_port: u16,
    /// Address advertised by PASV instead of the control connection's.
    pub pasv_address: Option<Ipv4Addr>,
    /// Bound on an active-mode connect.
    pub data_connect_timeout: Duration,
}

/// One accepted or dialled TCP stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    connected: bool,
}

impl TcpConnection {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            connected: true,
        })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Connection for TcpConnection {
    fn is_connected(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        let mut probe = [0u8; 1];
        match self.stream.peek(&mut probe) {
            Ok(0) => self.connected = false,
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => {
                debug!("Connection probe failed: {}", e);
                self.connected = false;
            }
        }
        self.connected
    }

    fn available(&mut self) -> usize {
        let mut window = [0u8; PEEK_WINDOW];
        self.stream.peek(&mut window).unwrap_or(0)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf) {
            Ok(0) => {
                self.connected = false;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => {
                self.connected = false;
                Err(e)
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.set_nonblocking(false)?;
        self.stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        let result = self.stream.write_all(data);
        self.stream.set_nonblocking(true)?;
        if result.is_err() {
            self.connected = false;
        }
        result
    }

    fn close(&mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("Shutdown of closed connection: {}", e);
        }
        self.connected = false;
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        match self.stream.local_addr() {
            Ok(SocketAddr::V4(addr)) => Some(*addr.ip()),
            _ => None,
        }
    }
}

/// Control listener plus the lazily bound passive listener.
#[derive(Debug)]
pub struct TcpTransport {
    settings: TcpSettings,
    control: TcpListener,
    passive: Option<TcpListener>,
    last_local_ip: Option<Ipv4Addr>,
}

impl TcpTransport {
    /// Binds the control listener.
    pub fn bind(settings: TcpSettings) -> Result<Self, ServerError> {
        let addr = SocketAddr::V4(SocketAddrV4::new(
            settings.bind_address,
            settings.control_port,
        ));
        let control = TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        control.set_nonblocking(true)?;
        info!("Control listener bound to {}", control.local_addr()?);
        Ok(Self {
            settings,
            control,
            passive: None,
            last_local_ip: None,
        })
    }

    /// Address the control listener actually bound, useful with port 0.
    pub fn control_addr(&self) -> io::Result<SocketAddr> {
        self.control.local_addr()
    }
}

impl Transport for TcpTransport {
    type Conn = TcpConnection;

    fn accept_control(&mut self) -> io::Result<Option<TcpConnection>> {
        match self.control.accept() {
            Ok((stream, peer)) => {
                debug!("Control connection from {}", peer);
                let conn = TcpConnection::new(stream)?;
                if let Some(ip) = conn.local_ip() {
                    self.last_local_ip = Some(ip);
                }
                Ok(Some(conn))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn open_passive(&mut self) -> io::Result<u16> {
        if let Some(listener) = &self.passive {
            return Ok(listener.local_addr()?.port());
        }
        let addr = SocketAddrV4::new(self.settings.bind_address, self.settings.pasv_port);
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        info!("Passive listener bound to port {}", port);
        self.passive = Some(listener);
        Ok(port)
    }

    /// Takes a connection already queued on the passive listener. Never
    /// waits: a client that has not dialled yet gets `Ok(None)`.
    fn accept_data(&mut self) -> io::Result<Option<TcpConnection>> {
        let Some(listener) = &self.passive else {
            return Ok(None);
        };
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("Passive data connection from {}", peer);
                TcpConnection::new(stream).map(Some)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                debug!("No passive data connection pending");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn connect(&mut self, peer: SocketAddrV4) -> io::Result<TcpConnection> {
        let stream =
            TcpStream::connect_timeout(&SocketAddr::V4(peer), self.settings.data_connect_timeout)?;
        debug!("Active data connection to {}", peer);
        TcpConnection::new(stream)
    }

    fn local_address(&self) -> Ipv4Addr {
        self.settings
            .pasv_address
            .or(self.last_local_ip)
            .unwrap_or(if self.settings.bind_address.is_unspecified() {
                Ipv4Addr::LOCALHOST
            } else {
                self.settings.bind_address
            })
    }
}
