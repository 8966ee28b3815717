//! Two-phase rename
//!
//! RNFR stages a source path, the next RNTO consumes it. A staged source
//! survives unrelated commands in between; only RNFR, RNTO and a session
//! reset change it.

use crate::navigate::VirtualPath;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenameTransaction {
    #[default]
    Empty,
    Staged(VirtualPath),
}

impl RenameTransaction {
    pub fn stage(&mut self, source: VirtualPath) {
        *self = RenameTransaction::Staged(source);
    }

    /// Consumes the staged source, leaving the transaction empty.
    pub fn take(&mut self) -> Option<VirtualPath> {
        match std::mem::take(self) {
            RenameTransaction::Staged(source) => Some(source),
            RenameTransaction::Empty => None,
        }
    }

    pub fn clear(&mut self) {
        *self = RenameTransaction::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> VirtualPath {
        VirtualPath::try_from_str(s).unwrap()
    }

    #[test]
    fn take_consumes_the_staged_source() {
        let mut rename = RenameTransaction::default();
        assert_eq!(rename.take(), None);

        rename.stage(path("/a.txt"));
        assert_eq!(rename, RenameTransaction::Staged(path("/a.txt")));
        assert_eq!(rename.take(), Some(path("/a.txt")));
        assert_eq!(rename, RenameTransaction::Empty);
        assert_eq!(rename.take(), None);
    }

    #[test]
    fn restaging_replaces_the_source() {
        let mut rename = RenameTransaction::default();
        rename.stage(path("/a"));
        rename.stage(path("/b"));
        assert_eq!(rename, RenameTransaction::Staged(path("/b")));
        rename.clear();
        assert_eq!(rename, RenameTransaction::Empty);
    }
}
