//! The poll-driven FTP session controller.
//!
//! `FtpServer::poll` is the single entry point the host calls over and over.
//! Each call does a bounded amount of non-blocking work: accept one
//! connection, read the control bytes that are available, run at most one
//! command and move at most one chunk of an active transfer.

use log::{debug, info, warn};

use crate::auth::{self, Credentials};
use crate::client::{Session, SessionState};
use crate::constants::{AUTH_FAILURE_HOLD_MS, DEFAULT_AUTH_TIMEOUT_MS, TIMEOUT_HOLD_MS};
use crate::error::AuthError;
use crate::protocol::commands::{CommandStatus, Verb};
use crate::protocol::handlers::{CommandContext, handle_command};
use crate::protocol::parser::{LineAssembler, LineEvent, ParsedCommand};
use crate::protocol::responses::send_banner;
use crate::reply;
use crate::server::transport::{Connection, Transport};
use crate::storage::FileSystem;
use crate::transfer::{self, ChunkOutcome, DataChannel, Transfer};
use crate::utils::clock::{Clock, deadline_after, has_elapsed};

/// Session policy handed to the server at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub credentials: Credentials,
    /// Inactivity allowed once logged in.
    pub idle_timeout_ms: u32,
    /// Time allowed to complete USER and PASS after connecting.
    pub auth_timeout_ms: u32,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            idle_timeout_ms: 5 * 60 * 1000,
            auth_timeout_ms: DEFAULT_AUTH_TIMEOUT_MS,
        }
    }
}

enum ControlInput {
    Idle,
    Command(ParsedCommand),
    Disconnected,
}

/// Single-session FTP server over pluggable transport, filesystem and clock.
pub struct FtpServer<T: Transport, F: FileSystem, K: Clock> {
    options: ServerOptions,
    transport: T,
    fs: F,
    clock: K,
    control: Option<T::Conn>,
    session: Session,
    line: LineAssembler,
    data: DataChannel<T::Conn>,
    transfer: Option<Transfer<F::File>>,
    hold_until: Option<u32>,
}

impl<T: Transport, F: FileSystem, K: Clock> FtpServer<T, F, K> {
    pub fn new(options: ServerOptions, transport: T, fs: F, clock: K) -> Self {
        Self {
            options,
            transport,
            fs,
            clock,
            control: None,
            session: Session::new(),
            line: LineAssembler::new(),
            data: DataChannel::new(),
            transfer: None,
            hold_until: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn is_transferring(&self) -> bool {
        self.transfer.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    pub fn filesystem_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    /// Advances the server by one bounded step. Never blocks and never fails;
    /// every error ends up as a reply or a state change.
    pub fn poll(&mut self) {
        let now = self.clock.now_millis();
        if let Some(until) = self.hold_until {
            if !has_elapsed(now, until) {
                return;
            }
            self.hold_until = None;
        }

        let mut command_ran = false;
        match self.session.state {
            SessionState::Disconnecting => self.disconnect(),
            SessionState::Listening => self.accept(now),
            SessionState::AwaitingUser | SessionState::AwaitingPassword | SessionState::Ready => {
                self.refuse_extra_connection();
                match self.read_control() {
                    ControlInput::Idle => {}
                    ControlInput::Command(command) => {
                        command_ran = true;
                        self.dispatch(&command, now);
                    }
                    ControlInput::Disconnected => self.drop_control(),
                }
            }
        }

        if self.transfer.is_some() {
            self.step_transfer(now);
        }

        if !command_ran && self.session.is_expired(now) {
            self.time_out(now);
        }
    }

    /// Ends the current session through the disconnect path: any transfer is
    /// aborted and a connected client gets its goodbye.
    pub fn shutdown(&mut self) {
        info!("Shutting down session");
        self.hold_until = None;
        self.disconnect();
    }

    fn disconnect(&mut self) {
        transfer::abort(&mut self.transfer, &mut self.data, self.control.as_mut());
        if let Some(mut conn) = self.control.take() {
            if conn.is_connected() {
                reply!(&mut conn, "221 Goodbye");
            }
            conn.close();
            info!("Client disconnected");
        }
        self.reset();
        self.session.state = SessionState::Listening;
    }

    fn reset(&mut self) {
        self.session.reset();
        self.line.reset();
        self.data.reset();
        self.transfer = None;
    }

    fn accept(&mut self, now: u32) {
        match self.transport.accept_control() {
            Ok(Some(mut conn)) => {
                info!("Client connected");
                send_banner(&mut conn);
                self.reset();
                self.session.extend_deadline(now, self.options.auth_timeout_ms);
                self.session.state = SessionState::AwaitingUser;
                self.control = Some(conn);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to accept control connection: {}", e),
        }
    }

    fn refuse_extra_connection(&mut self) {
        match self.transport.accept_control() {
            Ok(Some(mut extra)) => {
                info!("Refusing control connection while a session is active");
                reply!(&mut extra, "421 Too many connections. Try again later.");
                extra.close();
            }
            Ok(None) => {}
            Err(e) => debug!("Accept while busy failed: {}", e),
        }
    }

    /// Feeds available control bytes to the line assembler until a command
    /// completes or the input runs dry.
    fn read_control(&mut self) -> ControlInput {
        let Some(conn) = self.control.as_mut() else {
            return ControlInput::Disconnected;
        };
        if !conn.is_connected() {
            return ControlInput::Disconnected;
        }

        let mut byte = [0u8; 1];
        while conn.available() > 0 {
            match conn.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => match self.line.push(byte[0]) {
                    LineEvent::Command(command) => return ControlInput::Command(command),
                    LineEvent::SyntaxError => reply!(conn, "500 Syntax error"),
                    LineEvent::Pending | LineEvent::Empty => {}
                },
                Err(e) => {
                    warn!("Control connection read failed: {}", e);
                    return ControlInput::Disconnected;
                }
            }
        }
        ControlInput::Idle
    }

    fn drop_control(&mut self) {
        info!("Control connection lost");
        transfer::abort(&mut self.transfer, &mut self.data, None);
        if let Some(mut conn) = self.control.take() {
            conn.close();
        }
        self.reset();
        self.session.state = SessionState::Listening;
    }

    fn dispatch(&mut self, command: &ParsedCommand, now: u32) {
        if command.verb == Verb::Pass {
            info!("-> PASS ****");
        } else {
            info!("-> {} {}", command.token(), command.arg());
        }

        let Some(control) = self.control.as_mut() else {
            return;
        };
        match self.session.state {
            SessionState::AwaitingUser => {
                match auth::validate_user(command, &self.options.credentials) {
                    Ok(()) => {
                        reply!(control, "331 OK. Password required");
                        self.session.cwd = crate::navigate::root();
                        self.session.state = SessionState::AwaitingPassword;
                    }
                    Err(e) => self.fail_login(e, now),
                }
            }
            SessionState::AwaitingPassword => {
                match auth::validate_password(command, &self.options.credentials) {
                    Ok(()) => {
                        reply!(control, "230 OK.");
                        info!("User {} logged in", self.options.credentials.username);
                        self.session.extend_deadline(now, self.options.idle_timeout_ms);
                        self.session.state = SessionState::Ready;
                    }
                    Err(e) => self.fail_login(e, now),
                }
            }
            SessionState::Ready => {
                let mut ctx = CommandContext {
                    control,
                    transport: &mut self.transport,
                    fs: &mut self.fs,
                    session: &mut self.session,
                    data: &mut self.data,
                    transfer: &mut self.transfer,
                    now,
                };
                match handle_command(&mut ctx, command) {
                    CommandStatus::Continue => {
                        self.session.extend_deadline(now, self.options.idle_timeout_ms);
                    }
                    CommandStatus::CloseConnection => {
                        // The goodbye was sent and the connection closed.
                        self.control = None;
                        self.session.state = SessionState::Disconnecting;
                    }
                }
            }
            SessionState::Disconnecting | SessionState::Listening => {}
        }
    }

    fn fail_login(&mut self, error: AuthError, now: u32) {
        warn!("Authentication failed: {}", error);
        if let Some(control) = self.control.as_mut() {
            match error {
                AuthError::UnexpectedCommand { .. } => reply!(control, "500 Syntax error"),
                _ => reply!(control, "530 Login incorrect"),
            }
        }
        self.hold_until = Some(deadline_after(now, AUTH_FAILURE_HOLD_MS));
        self.session.state = SessionState::Disconnecting;
    }

    fn step_transfer(&mut self, now: u32) {
        let Some(running) = self.transfer.as_mut() else {
            return;
        };
        match running.copy_chunk(self.data.connection()) {
            Ok(ChunkOutcome::Moved(_)) => {
                self.session.extend_deadline(now, self.options.idle_timeout_ms);
            }
            Ok(ChunkOutcome::Idle) => {}
            Ok(ChunkOutcome::Complete) => {
                let Some(done) = self.transfer.take() else {
                    return;
                };
                match self.control.as_mut() {
                    Some(control) => transfer::finish(done, &mut self.data, control, now),
                    None => {
                        drop(done);
                        self.data.close();
                    }
                }
            }
            Err(e) => {
                warn!("Transfer failed: {}", e);
                transfer::abort(&mut self.transfer, &mut self.data, self.control.as_mut());
            }
        }
    }

    fn time_out(&mut self, now: u32) {
        info!("Session timed out in state {:?}", self.session.state);
        if let Some(control) = self.control.as_mut() {
            reply!(control, "530 Timeout");
        }
        self.hold_until = Some(deadline_after(now, TIMEOUT_HOLD_MS));
        self.session.state = SessionState::Disconnecting;
    }
}
