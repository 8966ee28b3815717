//! In-memory doubles for driving `FtpServer::poll` from tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;

use pollftpd::error::StorageError;
use pollftpd::server::{Connection, FtpServer, ServerOptions, Transport};
use pollftpd::storage::{DateTime, DirEntry, FileHandle, FileSystem, PackedDateTime};
use pollftpd::utils::Clock;

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Pipe {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    peer_closed: bool,
    closed: bool,
    fail_writes: bool,
}

/// Server side of an in-memory connection.
pub struct MockConn {
    pipe: Rc<RefCell<Pipe>>,
}

impl Connection for MockConn {
    fn is_connected(&mut self) -> bool {
        let pipe = self.pipe.borrow();
        !pipe.closed && !(pipe.peer_closed && pipe.inbound.is_empty())
    }

    fn available(&mut self) -> usize {
        self.pipe.borrow().inbound.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.borrow_mut();
        let n = buf.len().min(pipe.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut pipe = self.pipe.borrow_mut();
        if pipe.closed || pipe.fail_writes || pipe.peer_closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        pipe.outbound.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.pipe.borrow_mut().closed = true;
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        Some(Ipv4Addr::new(192, 168, 4, 1))
    }
}

/// Client side of an in-memory connection.
#[derive(Clone)]
pub struct Peer {
    pipe: Rc<RefCell<Pipe>>,
}

impl Peer {
    pub fn send(&self, bytes: &[u8]) {
        self.pipe.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    pub fn send_line(&self, line: &str) {
        self.send(line.as_bytes());
        self.send(b"\r\n");
    }

    /// Drains everything the server wrote so far.
    pub fn take_bytes(&self) -> Vec<u8> {
        std::mem::take(&mut self.pipe.borrow_mut().outbound)
    }

    pub fn take_output(&self) -> String {
        String::from_utf8(self.take_bytes()).expect("server wrote non UTF-8")
    }

    /// The client hangs up.
    pub fn hang_up(&self) {
        self.pipe.borrow_mut().peer_closed = true;
    }

    pub fn fail_writes(&self) {
        self.pipe.borrow_mut().fail_writes = true;
    }

    /// True once the server closed its side.
    pub fn is_closed(&self) -> bool {
        self.pipe.borrow().closed
    }
}

pub fn pipe() -> (MockConn, Peer) {
    let pipe = Rc::new(RefCell::new(Pipe::default()));
    (MockConn { pipe: pipe.clone() }, Peer { pipe })
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub struct MockTransport {
    pending_control: VecDeque<MockConn>,
    pending_data: VecDeque<MockConn>,
    outgoing: VecDeque<MockConn>,
    passive_open: bool,
    pub passive_port: u16,
    pub connect_attempts: Vec<SocketAddrV4>,
    pub passive_accepts: usize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            pending_control: VecDeque::new(),
            pending_data: VecDeque::new(),
            outgoing: VecDeque::new(),
            passive_open: false,
            passive_port: 55600,
            connect_attempts: Vec::new(),
            passive_accepts: 0,
        }
    }
}

impl MockTransport {
    /// Queues a client dialling the control port.
    pub fn incoming_control(&mut self) -> Peer {
        let (conn, peer) = pipe();
        self.pending_control.push_back(conn);
        peer
    }

    /// Queues a client dialling the passive port.
    pub fn incoming_data(&mut self) -> Peer {
        let (conn, peer) = pipe();
        self.pending_data.push_back(conn);
        peer
    }

    /// Queues the connection the next active-mode connect will get.
    pub fn outgoing_data(&mut self) -> Peer {
        let (conn, peer) = pipe();
        self.outgoing.push_back(conn);
        peer
    }
}

impl Transport for MockTransport {
    type Conn = MockConn;

    fn accept_control(&mut self) -> io::Result<Option<MockConn>> {
        Ok(self.pending_control.pop_front())
    }

    fn open_passive(&mut self) -> io::Result<u16> {
        self.passive_open = true;
        Ok(self.passive_port)
    }

    fn accept_data(&mut self) -> io::Result<Option<MockConn>> {
        if !self.passive_open {
            return Ok(None);
        }
        self.passive_accepts += 1;
        Ok(self.pending_data.pop_front())
    }

    fn connect(&mut self, peer: SocketAddrV4) -> io::Result<MockConn> {
        self.connect_attempts.push(peer);
        self.outgoing
            .pop_front()
            .ok_or_else(|| io::ErrorKind::ConnectionRefused.into())
    }

    fn local_address(&self) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 4, 1)
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

enum Node {
    File {
        data: Rc<RefCell<Vec<u8>>>,
        modified: PackedDateTime,
    },
    Dir {
        modified: PackedDateTime,
    },
}

pub struct MemFile {
    data: Rc<RefCell<Vec<u8>>>,
    pos: usize,
    open: Rc<Cell<usize>>,
}

impl MemFile {
    fn new(data: Rc<RefCell<Vec<u8>>>, open: Rc<Cell<usize>>) -> Self {
        open.set(open.get() + 1);
        Self { data, pos: 0, open }
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        self.open.set(self.open.get() - 1);
    }
}

impl FileHandle for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.borrow();
        let n = buf.len().min(data.len() - self.pos);
        buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.data.borrow_mut().extend_from_slice(bytes);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.borrow().len() as u64
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((head, _)) => head,
    }
}

/// Flat map of absolute paths. `/` always exists.
pub struct MemoryFs {
    nodes: BTreeMap<String, Node>,
    open: Rc<Cell<usize>>,
    pub stamp: PackedDateTime,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            open: Rc::new(Cell::new(0)),
            stamp: PackedDateTime::pack(&DateTime {
                year: 2020,
                month: 5,
                day: 4,
                hour: 3,
                minute: 2,
                second: 10,
            }),
        }
    }
}

impl MemoryFs {
    pub fn add_file(&mut self, path: &str, content: &[u8]) {
        self.nodes.insert(
            path.to_string(),
            Node::File {
                data: Rc::new(RefCell::new(content.to_vec())),
                modified: self.stamp,
            },
        );
    }

    pub fn add_dir(&mut self, path: &str) {
        self.nodes
            .insert(path.to_string(), Node::Dir { modified: self.stamp });
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.get(path) {
            Some(Node::File { data, .. }) => Some(data.borrow().clone()),
            _ => None,
        }
    }

    pub fn open_handles(&self) -> usize {
        self.open.get()
    }

    fn is_dir_path(&self, path: &str) -> bool {
        path == "/" || matches!(self.nodes.get(path), Some(Node::Dir { .. }))
    }

    fn missing(path: &str) -> StorageError {
        StorageError::NotFound(path.to_string())
    }
}

impl FileSystem for MemoryFs {
    type File = MemFile;
    type Dir = std::vec::IntoIter<DirEntry>;

    fn exists(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.is_dir_path(path)
    }

    fn open_read(&mut self, path: &str) -> Result<MemFile, StorageError> {
        match self.nodes.get(path) {
            Some(Node::File { data, .. }) => Ok(MemFile::new(data.clone(), self.open.clone())),
            _ => Err(Self::missing(path)),
        }
    }

    fn create(&mut self, path: &str) -> Result<MemFile, StorageError> {
        if !self.is_dir_path(parent_of(path)) || self.is_dir_path(path) {
            return Err(Self::missing(path));
        }
        let data = Rc::new(RefCell::new(Vec::new()));
        self.nodes.insert(
            path.to_string(),
            Node::File {
                data: data.clone(),
                modified: self.stamp,
            },
        );
        Ok(MemFile::new(data, self.open.clone()))
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        match self.nodes.get(path) {
            Some(Node::File { .. }) => {
                self.nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(StorageError::Io(io::ErrorKind::Other.into())),
            None => Err(Self::missing(path)),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StorageError> {
        if self.exists(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        if !self.is_dir_path(parent_of(path)) {
            return Err(Self::missing(path));
        }
        self.add_dir(path);
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> Result<(), StorageError> {
        if path == "/" || !matches!(self.nodes.get(path), Some(Node::Dir { .. })) {
            return Err(StorageError::NotADirectory(path.to_string()));
        }
        if self.nodes.keys().any(|key| parent_of(key) == path) {
            return Err(StorageError::Io(io::ErrorKind::Other.into()));
        }
        self.nodes.remove(path);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        let node = self.nodes.remove(from).ok_or_else(|| Self::missing(from))?;
        let prefix = format!("{}/", from);
        let children: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        for child in children {
            if let Some(moved) = self.nodes.remove(&child) {
                self.nodes
                    .insert(format!("{}/{}", to, &child[prefix.len()..]), moved);
            }
        }
        self.nodes.insert(to.to_string(), node);
        Ok(())
    }

    fn read_dir(&mut self, path: &str) -> Result<Self::Dir, StorageError> {
        if !self.is_dir_path(path) {
            return Err(StorageError::NotADirectory(path.to_string()));
        }
        let entries: Vec<DirEntry> = self
            .nodes
            .iter()
            .filter(|(key, _)| key.as_str() != "/" && parent_of(key) == path)
            .map(|(key, node)| {
                let name = key.rsplit('/').next().unwrap_or_default().to_string();
                match node {
                    Node::File { data, modified } => DirEntry {
                        name,
                        is_dir: false,
                        size: data.borrow().len() as u64,
                        modified: *modified,
                    },
                    Node::Dir { modified } => DirEntry {
                        name,
                        is_dir: true,
                        size: 0,
                        modified: *modified,
                    },
                }
            })
            .collect();
        Ok(entries.into_iter())
    }

    fn modified(&self, path: &str) -> Result<PackedDateTime, StorageError> {
        match self.nodes.get(path) {
            Some(Node::File { modified, .. }) | Some(Node::Dir { modified }) => Ok(*modified),
            None => Err(Self::missing(path)),
        }
    }

    fn set_modified(&mut self, path: &str, when: &DateTime) -> Result<(), StorageError> {
        match self.nodes.get_mut(path) {
            Some(Node::File { modified, .. }) | Some(Node::Dir { modified }) => {
                *modified = PackedDateTime::pack(when);
                Ok(())
            }
            None => Err(Self::missing(path)),
        }
    }

    fn free_mb(&self) -> u64 {
        1234
    }

    fn capacity_mb(&self) -> u64 {
        4096
    }
}

// ---------------------------------------------------------------------------
// Clock and harness
// ---------------------------------------------------------------------------

/// Clock the test moves by hand.
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u32>>);

impl ManualClock {
    pub fn starting_at(ms: u32) -> Self {
        Self(Rc::new(Cell::new(ms)))
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.0.get()
    }
}

pub type TestServer = FtpServer<MockTransport, MemoryFs, ManualClock>;

pub struct Harness {
    pub server: TestServer,
    pub clock: ManualClock,
    pub client: Peer,
}

impl Harness {
    /// A server with a client connected and its banner consumed.
    pub fn connected_with(fs: MemoryFs, clock: ManualClock) -> Self {
        Self::connected_with_options(ServerOptions::default(), fs, clock)
    }

    pub fn connected_with_options(
        options: ServerOptions,
        fs: MemoryFs,
        clock: ManualClock,
    ) -> Self {
        let mut server = FtpServer::new(options, MockTransport::default(), fs, clock.clone());
        let client = server.transport_mut().incoming_control();
        server.poll(); // Disconnecting -> Listening
        server.poll(); // accept
        client.take_output();
        Self {
            server,
            clock,
            client,
        }
    }

    pub fn connected() -> Self {
        Self::connected_with(MemoryFs::default(), ManualClock::default())
    }

    /// A server with a logged-in client.
    pub fn logged_in_with(fs: MemoryFs) -> Self {
        Self::logged_in_with_options(ServerOptions::default(), fs)
    }

    pub fn logged_in_with_options(options: ServerOptions, fs: MemoryFs) -> Self {
        let mut harness = Self::connected_with_options(options, fs, ManualClock::default());
        assert_eq!(harness.command("USER admin"), "331 OK. Password required\r\n");
        assert_eq!(harness.command("PASS secret"), "230 OK.\r\n");
        harness
    }

    pub fn logged_in() -> Self {
        Self::logged_in_with(MemoryFs::default())
    }

    /// Sends one command line, polls once and returns the reply text.
    pub fn command(&mut self, line: &str) -> String {
        self.client.send_line(line);
        self.server.poll();
        self.client.take_output()
    }

    pub fn poll(&mut self, times: usize) {
        for _ in 0..times {
            self.server.poll();
        }
    }

    pub fn fs(&self) -> &MemoryFs {
        self.server.filesystem()
    }

    pub fn fs_mut(&mut self) -> &mut MemoryFs {
        self.server.filesystem_mut()
    }

    pub fn transport(&mut self) -> &mut MockTransport {
        self.server.transport_mut()
    }
}
