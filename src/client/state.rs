//! Module `state`
//!
//! Per-session values owned by the poll loop: where the session is in the
//! login dialogue, its working directory, its deadline and any staged rename.

use crate::client::rename::RenameTransaction;
use crate::navigate::{self, VirtualPath};
use crate::utils::clock::{deadline_after, has_elapsed};

/// Position of the single session in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Tear down whatever is left of the previous connection.
    Disconnecting,
    /// Waiting for a control connection.
    Listening,
    AwaitingUser,
    AwaitingPassword,
    /// Logged in; commands go to the command processor.
    Ready,
}

impl SessionState {
    /// True for every state that owns a control connection.
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            SessionState::AwaitingUser | SessionState::AwaitingPassword | SessionState::Ready
        )
    }
}

/// The one client context the server holds.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: SessionState,
    pub cwd: VirtualPath,
    pub rename: RenameTransaction,
    deadline: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Disconnecting,
            cwd: navigate::root(),
            rename: RenameTransaction::Empty,
            deadline: 0,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the root with nothing staged. The state is left alone.
    pub fn reset(&mut self) {
        self.cwd = navigate::root();
        self.rename.clear();
        self.deadline = 0;
    }

    pub fn extend_deadline(&mut self, now: u32, timeout_ms: u32) {
        self.deadline = deadline_after(now, timeout_ms);
    }

    pub fn is_expired(&self, now: u32) -> bool {
        self.state.is_connected() && has_elapsed(now, self.deadline)
    }
}
