//! Module `data_channel`
//!
//! Owns the data connection of the session: the mode negotiated by PORT or
//! PASV, the peer to dial in active mode, and the live connection once one
//! has been established.

use log::{debug, info, warn};
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::TransferError;
use crate::server::transport::{Connection, Transport};
use crate::transfer::modes::TransferMode;

/// Data connection descriptor.
#[derive(Debug)]
pub struct DataChannel<C> {
    mode: TransferMode,
    peer: Option<SocketAddrV4>,
    passive_port: u16,
    conn: Option<C>,
}

impl<C> Default for DataChannel<C> {
    fn default() -> Self {
        Self {
            mode: TransferMode::Active,
            peer: None,
            passive_port: 0,
            conn: None,
        }
    }
}

impl<C: Connection> DataChannel<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port the data connection uses: the passive endpoint, or the peer's
    /// port in active mode.
    pub fn port(&self) -> u16 {
        match self.mode {
            TransferMode::Passive => self.passive_port,
            TransferMode::Active => self.peer.map_or(0, |peer| peer.port()),
        }
    }

    /// Switches to passive mode on `port`, dropping any open connection.
    pub fn set_passive(&mut self, port: u16) {
        self.close();
        self.mode = TransferMode::Passive;
        self.passive_port = port;
        debug!("Data channel set to passive on port {}", port);
    }

    /// Switches to active mode towards `peer`, dropping any open connection.
    pub fn set_active(&mut self, peer: SocketAddrV4) {
        self.close();
        self.mode = TransferMode::Active;
        self.peer = Some(peer);
        debug!("Data channel set to active towards {}", peer);
    }

    /// Makes sure a live data connection exists and returns it.
    ///
    /// Passive mode takes a pending connection from the passive endpoint;
    /// active mode dials the peer recorded by PORT.
    pub fn connect<T>(&mut self, transport: &mut T) -> Result<&mut C, TransferError>
    where
        T: Transport<Conn = C>,
    {
        if self.conn.as_mut().is_some_and(|conn| !conn.is_connected()) {
            self.close();
        }

        if self.conn.is_none() {
            let conn = match self.mode {
                TransferMode::Passive => transport
                    .accept_data()
                    .map_err(TransferError::Network)?
                    .ok_or(TransferError::NotEstablished)?,
                TransferMode::Active => {
                    let peer = self.peer.ok_or(TransferError::NoActivePeer)?;
                    transport.connect(peer).map_err(TransferError::Network)?
                }
            };
            info!("Data connection established ({:?} mode)", self.mode);
            self.conn = Some(conn);
        }

        self.conn.as_mut().ok_or(TransferError::NotEstablished)
    }

    pub fn connection(&mut self) -> Option<&mut C> {
        self.conn.as_mut()
    }

    /// Closes the live connection but keeps the negotiated mode.
    pub fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close();
            debug!("Data connection closed");
        }
    }

    /// Closes the connection and forgets the negotiated mode.
    pub fn reset(&mut self) {
        self.close();
        *self = Self::default();
    }
}

/// Parses a PORT argument `h1,h2,h3,h4,p1,p2`.
///
/// Exactly six fields are required, each a decimal number from 0 to 255.
pub fn parse_port_argument(arg: &str) -> Result<SocketAddrV4, TransferError> {
    let invalid = || TransferError::InvalidPortCommand(arg.to_string());

    let mut fields = [0u8; 6];
    let mut parts = arg.split(',');
    for field in fields.iter_mut() {
        let part = parts.next().ok_or_else(invalid)?;
        *field = part.trim().parse().map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
        warn!("PORT argument has too many fields: {}", arg);
        return Err(invalid());
    }

    let [a, b, c, d, hi, lo] = fields;
    Ok(SocketAddrV4::new(
        Ipv4Addr::new(a, b, c, d),
        u16::from_be_bytes([hi, lo]),
    ))
}
