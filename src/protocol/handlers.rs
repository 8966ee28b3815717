//! Command handlers module for the FTP server.
//!
//! Each handler executes one verb for the logged-in session and writes
//! exactly one reply (single or multi-line) to the control connection.
//! Failures never escape a handler; they become the matching reply.

use log::{debug, info, warn};

use crate::client::Session;
use crate::error::NavigateError;
use crate::navigate::{self, VirtualPath};
use crate::protocol::commands::{CommandStatus, Verb};
use crate::protocol::parser::ParsedCommand;
use crate::protocol::responses::{ConnectionWriter, send_features};
use crate::reply;
use crate::server::transport::{Connection, Transport};
use crate::storage::{FileHandle, FileSystem, ListFormat, split_mdtm_argument, write_entry};
use crate::transfer::{
    self, DataChannel, Direction, PassiveModeResult, Transfer, parse_port_argument,
};

/// Everything a command may touch, borrowed from the server for the
/// duration of one command.
pub struct CommandContext<'a, T: Transport, F: FileSystem> {
    pub control: &'a mut T::Conn,
    pub transport: &'a mut T,
    pub fs: &'a mut F,
    pub session: &'a mut Session,
    pub data: &'a mut DataChannel<T::Conn>,
    pub transfer: &'a mut Option<Transfer<F::File>>,
    pub now: u32,
}

impl<T: Transport, F: FileSystem> CommandContext<'_, T, F> {
    /// Resolves `arg` against the working directory, replying on failure.
    fn resolve(&mut self, arg: &str) -> Option<VirtualPath> {
        match navigate::resolve(&self.session.cwd, arg) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Path resolution failed for {:?}: {}", arg, e);
                reply!(self.control, "500 Command line too long");
                None
            }
        }
    }

    /// Abandons a running transfer before a new one takes the data channel.
    fn abort_transfer(&mut self) -> bool {
        transfer::abort(self.transfer, self.data, Some(&mut *self.control))
    }
}

/// Dispatches a command received in the `Ready` state.
pub fn handle_command<T: Transport, F: FileSystem>(
    ctx: &mut CommandContext<'_, T, F>,
    command: &ParsedCommand,
) -> CommandStatus {
    let arg = command.arg();
    match command.verb {
        Verb::Quit => return handle_cmd_quit(ctx),
        Verb::Cdup => handle_cmd_cdup(ctx),
        Verb::Cwd => handle_cmd_cwd(ctx, arg),
        Verb::Pwd => handle_cmd_pwd(ctx),
        Verb::Mode => handle_cmd_mode(ctx, arg),
        Verb::Pasv => handle_cmd_pasv(ctx),
        Verb::Port => handle_cmd_port(ctx, arg),
        Verb::Stru => handle_cmd_stru(ctx, arg),
        Verb::Type => handle_cmd_type(ctx, arg),
        Verb::Abor => handle_cmd_abor(ctx),
        Verb::Dele => handle_cmd_dele(ctx, arg),
        Verb::List => handle_listing(ctx, ListFormat::List),
        Verb::Mlsd => handle_listing(ctx, ListFormat::Mlsd),
        Verb::Nlst => handle_listing(ctx, ListFormat::Nlst),
        Verb::Noop => reply!(ctx.control, "200 Zzz..."),
        Verb::Retr => handle_cmd_retr(ctx, arg),
        Verb::Stor => handle_cmd_stor(ctx, arg),
        Verb::Mkd => handle_cmd_mkd(ctx, arg),
        Verb::Rmd => handle_cmd_rmd(ctx, arg),
        Verb::Rnfr => handle_cmd_rnfr(ctx, arg),
        Verb::Rnto => handle_cmd_rnto(ctx, arg),
        Verb::Feat => send_features(ctx.control),
        Verb::Mdtm => handle_cmd_mdtm(ctx, arg),
        Verb::Size => handle_cmd_size(ctx, arg),
        Verb::Site => handle_cmd_site(ctx, arg),
        Verb::User | Verb::Pass | Verb::Unknown => {
            debug!("Unsupported command {}", command.token());
            reply!(ctx.control, "500 Unknown command");
        }
    }
    CommandStatus::Continue
}

/// Handles QUIT: abandons any transfer, says goodbye and closes the control
/// connection.
fn handle_cmd_quit<T: Transport, F: FileSystem>(
    ctx: &mut CommandContext<'_, T, F>,
) -> CommandStatus {
    ctx.abort_transfer();
    reply!(ctx.control, "221 Goodbye");
    ctx.control.close();
    CommandStatus::CloseConnection
}

fn handle_cmd_cdup<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>) {
    ctx.session.cwd = navigate::change_to_parent(ctx.fs, &ctx.session.cwd);
    reply!(ctx.control, "200 Ok. Current directory is {}", ctx.session.cwd);
}

/// Handles CWD. `CWD .` behaves like PWD.
fn handle_cmd_cwd<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg == "." {
        return handle_cmd_pwd(ctx);
    }
    match navigate::change_directory(ctx.fs, &ctx.session.cwd, arg) {
        Ok(path) => {
            ctx.session.cwd = path;
            reply!(ctx.control, "250 Ok. Current directory is {}", ctx.session.cwd);
        }
        Err(NavigateError::Path(e)) => {
            debug!("CWD {:?} rejected: {}", arg, e);
            reply!(ctx.control, "500 Command line too long");
        }
        Err(NavigateError::DirectoryNotFound(_)) => {
            reply!(ctx.control, "550 Can't change directory to {}", arg);
        }
    }
}

fn handle_cmd_pwd<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>) {
    reply!(ctx.control, "257 \"{}\" is your current directory", ctx.session.cwd);
}

fn handle_cmd_mode<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg == "S" {
        reply!(ctx.control, "200 S Ok");
    } else {
        reply!(ctx.control, "504 Only S(tream) is supported");
    }
}

fn handle_cmd_stru<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg == "F" {
        reply!(ctx.control, "200 F Ok");
    } else {
        reply!(ctx.control, "504 Only F(ile) is supported");
    }
}

/// Handles TYPE. Both types are acknowledged; bytes are always copied as is.
fn handle_cmd_type<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    match arg {
        "A" => reply!(ctx.control, "200 TYPE is now ASCII"),
        "I" => reply!(ctx.control, "200 TYPE is now 8-bit binary"),
        _ => reply!(ctx.control, "504 Unknown TYPE"),
    }
}

/// Handles PASV: opens the passive endpoint and advertises it.
fn handle_cmd_pasv<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>) {
    ctx.data.close();
    match ctx.transport.open_passive() {
        Ok(port) => {
            ctx.data.set_passive(port);
            let endpoint = PassiveModeResult {
                address: ctx.transport.local_address(),
                port,
            };
            info!("Passive mode on {}:{}", endpoint.address, port);
            reply!(ctx.control, "227 Entering Passive Mode ({}).", endpoint);
        }
        Err(e) => {
            warn!("Failed to open passive endpoint: {}", e);
            reply!(ctx.control, "425 Can't open data connection");
        }
    }
}

/// Handles PORT: records the peer to dial for the next transfer.
fn handle_cmd_port<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    ctx.data.close();
    match parse_port_argument(arg) {
        Ok(peer) => {
            ctx.data.set_active(peer);
            reply!(ctx.control, "200 PORT command successful");
        }
        Err(e) => {
            debug!("{}", e);
            reply!(ctx.control, "501 Can't interpret parameters");
        }
    }
}

fn handle_cmd_abor<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>) {
    ctx.abort_transfer();
    reply!(ctx.control, "226 Data connection closed");
}

fn handle_cmd_dele<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg.is_empty() {
        return reply!(ctx.control, "501 No file name");
    }
    let Some(path) = ctx.resolve(arg) else { return };
    if !ctx.fs.exists(&path) {
        return reply!(ctx.control, "550 File {} not found", arg);
    }
    match ctx.fs.remove(&path) {
        Ok(()) => {
            info!("Deleted {}", path);
            reply!(ctx.control, "250 Deleted {}", arg);
        }
        Err(e) => {
            warn!("Failed to delete {}: {}", path, e);
            reply!(ctx.control, "450 Can't delete {}", path);
        }
    }
}

/// Handles LIST, MLSD and NLST: streams the working directory over the data
/// connection, then closes it.
fn handle_listing<T: Transport, F: FileSystem>(
    ctx: &mut CommandContext<'_, T, F>,
    format: ListFormat,
) {
    if let Err(e) = ctx.data.connect(ctx.transport) {
        debug!("Listing without data connection: {}", e);
        return reply!(ctx.control, "425 No data connection");
    }
    reply!(ctx.control, "150 Accepted data connection");

    match ctx.fs.read_dir(&ctx.session.cwd) {
        Err(e) => {
            warn!("Failed to open directory {}: {}", ctx.session.cwd, e);
            reply!(ctx.control, "550 Can't open directory {}", ctx.session.cwd);
        }
        Ok(entries) => {
            let mut matches = 0usize;
            let mut sent = Ok(());
            if let Some(conn) = ctx.data.connection() {
                let mut out = ConnectionWriter::new(conn);
                for entry in entries {
                    if write_entry(&mut out, format, &entry).is_err() {
                        break;
                    }
                    matches += 1;
                }
                sent = out.finish();
            }
            match sent {
                Ok(()) => {
                    if format == ListFormat::Mlsd {
                        reply!(ctx.control, "226-options: -a -l");
                    }
                    reply!(ctx.control, "226 {} matches total", matches);
                }
                Err(e) => {
                    warn!("Listing interrupted after {} entries: {}", matches, e);
                    reply!(ctx.control, "426 Transfer aborted");
                }
            }
        }
    }
    ctx.data.close();
}

/// Handles RETR: opens the file and starts a retrieving transfer.
fn handle_cmd_retr<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg.is_empty() {
        return reply!(ctx.control, "501 No file name");
    }
    let Some(path) = ctx.resolve(arg) else { return };
    if !ctx.fs.exists(&path) {
        return reply!(ctx.control, "550 File {} not found", arg);
    }
    let file = match ctx.fs.open_read(&path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to open {}: {}", path, e);
            return reply!(ctx.control, "450 Can't open {}", arg);
        }
    };
    ctx.abort_transfer();
    if let Err(e) = ctx.data.connect(ctx.transport) {
        debug!("RETR without data connection: {}", e);
        return reply!(ctx.control, "425 No data connection");
    }

    let size = file.size();
    info!("Sending {} ({} bytes)", path, size);
    reply!(ctx.control, "150-Connected to port {}", ctx.data.port());
    reply!(ctx.control, "150 {} bytes to download", size);
    *ctx.transfer = Some(Transfer::new(Direction::Retrieve, file, ctx.now));
}

/// Handles STOR: creates the file and starts a storing transfer.
fn handle_cmd_stor<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg.is_empty() {
        return reply!(ctx.control, "501 No file name");
    }
    let Some(path) = ctx.resolve(arg) else { return };
    ctx.abort_transfer();
    let file = match ctx.fs.create(&path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to create {}: {}", path, e);
            return reply!(ctx.control, "451 Can't open/create {}", arg);
        }
    };
    if let Err(e) = ctx.data.connect(ctx.transport) {
        debug!("STOR without data connection: {}", e);
        drop(file);
        return reply!(ctx.control, "425 No data connection");
    }

    info!("Receiving {}", path);
    reply!(ctx.control, "150 Connected to port {}", ctx.data.port());
    *ctx.transfer = Some(Transfer::new(Direction::Store, file, ctx.now));
}

fn handle_cmd_mkd<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg.is_empty() {
        return reply!(ctx.control, "501 No directory name");
    }
    let Some(path) = ctx.resolve(arg) else { return };
    if ctx.fs.exists(&path) {
        return reply!(ctx.control, "521 \"{}\" directory already exists", arg);
    }
    match ctx.fs.mkdir(&path) {
        Ok(()) => {
            info!("Created directory {}", path);
            reply!(ctx.control, "257 \"{}\" created", arg);
        }
        Err(e) => {
            warn!("Failed to create directory {}: {}", path, e);
            reply!(ctx.control, "550 Can't create \"{}\"", arg);
        }
    }
}

fn handle_cmd_rmd<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg.is_empty() {
        return reply!(ctx.control, "501 No directory name");
    }
    let Some(path) = ctx.resolve(arg) else { return };
    if !ctx.fs.exists(&path) {
        return reply!(ctx.control, "550 File {} not found", arg);
    }
    match ctx.fs.rmdir(&path) {
        Ok(()) => {
            info!("Removed directory {}", path);
            reply!(ctx.control, "250 \"{}\" deleted", arg);
        }
        Err(e) => {
            warn!("Failed to remove directory {}: {}", path, e);
            reply!(ctx.control, "501 Can't delete \"{}\"", arg);
        }
    }
}

/// Handles RNFR: stages an existing path as the rename source. Any earlier
/// staged source is dropped first.
fn handle_cmd_rnfr<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    ctx.session.rename.clear();
    if arg.is_empty() {
        return reply!(ctx.control, "501 No file name");
    }
    let Some(path) = ctx.resolve(arg) else { return };
    if !ctx.fs.exists(&path) {
        return reply!(ctx.control, "550 File {} not found", arg);
    }
    debug!("Rename source staged: {}", path);
    ctx.session.rename.stage(path);
    reply!(ctx.control, "350 RNFR accepted - file exists, ready for destination");
}

/// Handles RNTO: consumes the staged source whatever the outcome.
fn handle_cmd_rnto<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    let Some(source) = ctx.session.rename.take() else {
        return reply!(ctx.control, "503 Need RNFR before RNTO");
    };
    if arg.is_empty() {
        return reply!(ctx.control, "501 No file name");
    }
    let Some(target) = ctx.resolve(arg) else { return };
    if ctx.fs.exists(&target) {
        return reply!(ctx.control, "553 {} already exists", arg);
    }
    let parent = navigate::containing_dir(&target);
    if !ctx.fs.is_dir(parent) {
        return reply!(ctx.control, "550 \"{}\" is not directory", parent);
    }
    match ctx.fs.rename(&source, &target) {
        Ok(()) => {
            info!("Renamed {} to {}", source, target);
            reply!(ctx.control, "250 File successfully renamed or moved");
        }
        Err(e) => {
            warn!("Failed to rename {} to {}: {}", source, target, e);
            reply!(ctx.control, "451 Rename/move failure");
        }
    }
}

/// Handles MDTM. A leading `YYYYMMDDHHMMSS ` sets the time, otherwise the
/// whole argument names the file whose time is returned.
fn handle_cmd_mdtm<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    let (stamp, name) = split_mdtm_argument(arg);
    if name.is_empty() {
        return reply!(ctx.control, "501 No file name");
    }
    let Some(path) = ctx.resolve(name) else { return };
    if !ctx.fs.exists(&path) {
        return reply!(ctx.control, "550 No such file {}", arg);
    }
    match stamp {
        Some(when) => match ctx.fs.set_modified(&path, &when) {
            Ok(()) => reply!(ctx.control, "200 Ok"),
            Err(e) => {
                warn!("Failed to set modification time of {}: {}", path, e);
                reply!(ctx.control, "550 Unable to modify time");
            }
        },
        None => match ctx.fs.modified(&path) {
            Ok(packed) => reply!(ctx.control, "213 {}", packed.timestamp()),
            Err(e) => {
                warn!("Failed to read modification time of {}: {}", path, e);
                reply!(ctx.control, "550 Unable to retrieve time");
            }
        },
    }
}

fn handle_cmd_size<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg.is_empty() {
        return reply!(ctx.control, "501 No file name");
    }
    let Some(path) = ctx.resolve(arg) else { return };
    if !ctx.fs.exists(&path) {
        return reply!(ctx.control, "550 No such file {}", arg);
    }
    match ctx.fs.open_read(&path) {
        Ok(file) => reply!(ctx.control, "213 {}", file.size()),
        Err(e) => {
            debug!("SIZE could not open {}: {}", path, e);
            reply!(ctx.control, "450 Can't open {}", arg);
        }
    }
}

/// Handles SITE. Only `SITE FREE` is implemented.
fn handle_cmd_site<T: Transport, F: FileSystem>(ctx: &mut CommandContext<'_, T, F>, arg: &str) {
    if arg.eq_ignore_ascii_case("FREE") {
        let free = ctx.fs.free_mb();
        let capacity = ctx.fs.capacity_mb();
        reply!(ctx.control, "200 {} MB free of {} MB capacity", free, capacity);
    } else {
        reply!(ctx.control, "500 Unknown SITE command {}", arg);
    }
}
