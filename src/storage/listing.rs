//! Directory listing formatter
//!
//! Renders one directory entry as a line of LIST, MLSD or NLST output.

use std::fmt::{self, Write};

use crate::storage::filesystem::DirEntry;

/// Output flavour requested by the listing verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// EPLF style: `+/,\tname` for directories, `+r,s<size>,\tname` for files.
    List,
    /// RFC 3659 facts: `Type=..;Size=..;Modify=..; name`.
    Mlsd,
    /// Bare names.
    Nlst,
}

/// Writes `entry` as one CRLF-terminated line in `format`.
pub fn write_entry<W: Write>(
    out: &mut W,
    format: ListFormat,
    entry: &DirEntry,
) -> fmt::Result {
    match format {
        ListFormat::List => {
            if entry.is_dir {
                out.write_str("+/")?;
            } else {
                write!(out, "+r,s{}", entry.size)?;
            }
            write!(out, ",\t{}\r\n", entry.name)
        }
        ListFormat::Mlsd => write!(
            out,
            "Type={};Size={};Modify={}; {}\r\n",
            if entry.is_dir { "dir" } else { "file" },
            entry.size,
            entry.modified.timestamp(),
            entry.name
        ),
        ListFormat::Nlst => write!(out, "{}\r\n", entry.name),
    }
}
