//! Full sessions over real loopback sockets against a temporary root.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use pollftpd::server::{FtpServer, ServerOptions, TcpSettings, TcpTransport, Transport};
use pollftpd::{LocalFileSystem, MonotonicClock};

struct Client {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn connect(addr: SocketAddr) -> Self {
        let writer = TcpStream::connect(addr).unwrap();
        writer
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader = BufReader::new(writer.try_clone().unwrap());
        Self { writer, reader }
    }

    /// Reads one reply, following `NNN-` continuation lines.
    fn reply(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).unwrap();
            assert!(!line.is_empty(), "control connection closed early");
            let line = line.trim_end().to_string();
            let last = line.as_bytes().get(3) == Some(&b' ');
            lines.push(line);
            if last {
                return lines;
            }
        }
    }

    fn command(&mut self, line: &str) -> Vec<String> {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .unwrap();
        self.reply()
    }

    /// Sends PASV and dials the advertised endpoint.
    fn passive(&mut self) -> TcpStream {
        let reply = self.command("PASV");
        let text = &reply[0];
        assert!(text.starts_with("227 "), "{}", text);
        let open = text.find('(').unwrap();
        let close = text.find(')').unwrap();
        let fields: Vec<u16> = text[open + 1..close]
            .split(',')
            .map(|f| f.parse().unwrap())
            .collect();
        let port = fields[4] * 256 + fields[5];
        let stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

fn loopback_settings() -> TcpSettings {
    TcpSettings {
        bind_address: Ipv4Addr::LOCALHOST,
        control_port: 0,
        pasv_port: 0,
        pasv_address: None,
        data_connect_timeout: CONNECT_TIMEOUT,
    }
}

fn run_session<C>(root: &Path, client: C)
where
    C: FnOnce(SocketAddr) + Send + 'static,
{
    let transport = TcpTransport::bind(loopback_settings()).unwrap();
    let addr = transport.control_addr().unwrap();
    let fs = LocalFileSystem::new(root).unwrap();
    let mut server = FtpServer::new(ServerOptions::default(), transport, fs, MonotonicClock::new());

    let handle = thread::spawn(move || client(addr));
    let deadline = Instant::now() + Duration::from_secs(20);
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "session did not finish");
        server.poll();
        thread::sleep(Duration::from_millis(1));
    }
    handle.join().unwrap();
}

#[test]
fn upload_download_and_list_over_loopback() {
    let root = tempfile::tempdir().unwrap();
    let content: Vec<u8> = (0..5000u32).map(|i| (i % 253) as u8).collect();
    let expected = content.clone();

    run_session(root.path(), move |addr| {
        let mut client = Client::connect(addr);
        let banner = client.reply();
        assert_eq!(banner.len(), 3);

        assert_eq!(client.command("USER admin"), ["331 OK. Password required"]);
        assert_eq!(client.command("PASS secret"), ["230 OK."]);
        assert_eq!(client.command("TYPE I"), ["200 TYPE is now 8-bit binary"]);

        let mut data = client.passive();
        let started = client.command("STOR upload.bin");
        assert!(started[0].starts_with("150 Connected to port"), "{:?}", started);
        data.write_all(&content).unwrap();
        drop(data);
        let done = client.reply();
        assert!(done.last().unwrap().starts_with("226 "), "{:?}", done);

        assert_eq!(client.command("SIZE upload.bin"), ["213 5000"]);

        let mut data = client.passive();
        let started = client.command("RETR upload.bin");
        assert_eq!(started.last().unwrap(), "150 5000 bytes to download");
        let mut downloaded = Vec::new();
        data.read_to_end(&mut downloaded).unwrap();
        assert_eq!(downloaded, content);
        let done = client.reply();
        assert!(done.last().unwrap().starts_with("226 "), "{:?}", done);

        let mut data = client.passive();
        assert_eq!(client.command("NLST"), ["150 Accepted data connection"]);
        let mut names = String::new();
        data.read_to_string(&mut names).unwrap();
        assert_eq!(names, "upload.bin\r\n");
        assert_eq!(client.reply(), ["226 1 matches total"]);

        assert_eq!(client.command("QUIT"), ["221 Goodbye"]);
    });

    assert_eq!(fs::read(root.path().join("upload.bin")).unwrap(), expected);
}

#[test]
fn failed_login_closes_the_control_connection() {
    let root = tempfile::tempdir().unwrap();
    run_session(root.path(), |addr| {
        let mut client = Client::connect(addr);
        client.reply();
        assert_eq!(client.command("USER intruder"), ["530 Login incorrect"]);
        assert_eq!(client.reply(), ["221 Goodbye"]);

        let mut rest = String::new();
        client.reader.read_to_string(&mut rest).unwrap();
        assert!(rest.is_empty());
    });
}

#[test]
fn passive_accept_returns_at_once_when_nobody_dialled() {
    let mut transport = TcpTransport::bind(loopback_settings()).unwrap();
    let port = transport.open_passive().unwrap();

    let started = Instant::now();
    assert!(transport.accept_data().unwrap().is_none());
    assert!(started.elapsed() < CONNECT_TIMEOUT / 4);

    let _client = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
    let mut accepted = None;
    for _ in 0..100 {
        accepted = transport.accept_data().unwrap();
        if accepted.is_some() {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert!(accepted.is_some());
}

#[test]
fn listing_before_dialling_is_refused_without_stalling() {
    let root = tempfile::tempdir().unwrap();
    run_session(root.path(), |addr| {
        let mut client = Client::connect(addr);
        client.reply();
        client.command("USER admin");
        client.command("PASS secret");
        assert!(client.command("PASV")[0].starts_with("227 "));

        let started = Instant::now();
        assert_eq!(client.command("LIST"), ["425 No data connection"]);
        assert!(started.elapsed() < CONNECT_TIMEOUT / 4);
        assert_eq!(client.command("NOOP"), ["200 Zzz..."]);
        client.command("QUIT");
    });
}
