//! FTP transfer modes
//!
//! Who opens the data connection, and which way the bytes flow.

/// Data connection setup negotiated by PORT or PASV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferMode {
    /// The server connects out to the address given by PORT.
    #[default]
    Active,
    /// The client connects to the endpoint advertised by PASV.
    Passive,
}

/// Direction of a file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// RETR: file to data connection.
    Retrieve,
    /// STOR: data connection to file.
    Store,
}
