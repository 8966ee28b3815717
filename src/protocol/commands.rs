//! Module `commands`
//!
//! Defines the FTP verbs the server understands and the status a handler
//! reports back to the session.

/// An FTP verb, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    User,
    Pass,
    Cdup,
    Cwd,
    Pwd,
    Quit,
    Mode,
    Pasv,
    Port,
    Stru,
    Type,
    Abor,
    Dele,
    List,
    Mlsd,
    Nlst,
    Noop,
    Retr,
    Stor,
    Mkd,
    Rmd,
    Rnfr,
    Rnto,
    Feat,
    Mdtm,
    Size,
    Site,
    Unknown,
}

impl Verb {
    /// Maps an upper-case token to its verb.
    pub fn parse(token: &str) -> Verb {
        match token {
            "USER" => Verb::User,
            "PASS" => Verb::Pass,
            "CDUP" => Verb::Cdup,
            "CWD" => Verb::Cwd,
            "PWD" => Verb::Pwd,
            "QUIT" => Verb::Quit,
            "MODE" => Verb::Mode,
            "PASV" => Verb::Pasv,
            "PORT" => Verb::Port,
            "STRU" => Verb::Stru,
            "TYPE" => Verb::Type,
            "ABOR" => Verb::Abor,
            "DELE" => Verb::Dele,
            "LIST" => Verb::List,
            "MLSD" => Verb::Mlsd,
            "NLST" => Verb::Nlst,
            "NOOP" => Verb::Noop,
            "RETR" => Verb::Retr,
            "STOR" => Verb::Stor,
            "MKD" => Verb::Mkd,
            "RMD" => Verb::Rmd,
            "RNFR" => Verb::Rnfr,
            "RNTO" => Verb::Rnto,
            "FEAT" => Verb::Feat,
            "MDTM" => Verb::Mdtm,
            "SIZE" => Verb::Size,
            "SITE" => Verb::Site,
            _ => Verb::Unknown,
        }
    }
}

/// What the session does after a command has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Keep the session and refresh its deadline.
    Continue,
    /// The goodbye has been sent; tear the session down.
    CloseConnection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_map_to_verbs() {
        assert_eq!(Verb::parse("RETR"), Verb::Retr);
        assert_eq!(Verb::parse("MKD"), Verb::Mkd);
        assert_eq!(Verb::parse("XPWD"), Verb::Unknown);
        assert_eq!(Verb::parse(""), Verb::Unknown);
    }
}
