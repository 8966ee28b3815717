//! Timestamp codec
//!
//! Converts between the packed FAT-style date/time pair a filesystem stores
//! and the `YYYYMMDDHHMMSS` text used by MDTM and MLSD.

use std::fmt;

/// Calendar fields of a modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Packed date/time as stored by the filesystem.
///
/// `date`: bits 15-9 year since 1980, 8-5 month, 4-0 day.
/// `time`: bits 15-11 hour, 10-5 minute, 4-0 seconds divided by two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedDateTime {
    pub date: u16,
    pub time: u16,
}

impl PackedDateTime {
    pub fn new(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    /// Packs calendar fields. Years outside 1980..=2107 are clamped and
    /// odd seconds are rounded down.
    pub fn pack(dt: &DateTime) -> Self {
        let year = dt.year.clamp(1980, 2107) - 1980;
        let date = (year << 9) | ((dt.month as u16 & 0x0F) << 5) | (dt.day as u16 & 0x1F);
        let time = ((dt.hour as u16 & 0x1F) << 11)
            | ((dt.minute as u16 & 0x3F) << 5)
            | ((dt.second as u16 / 2) & 0x1F);
        Self { date, time }
    }

    pub fn unpack(self) -> DateTime {
        DateTime {
            year: ((self.date & 0xFE00) >> 9) + 1980,
            month: ((self.date & 0x01E0) >> 5) as u8,
            day: (self.date & 0x001F) as u8,
            hour: ((self.time & 0xF800) >> 11) as u8,
            minute: ((self.time & 0x07E0) >> 5) as u8,
            second: ((self.time & 0x001F) << 1) as u8,
        }
    }

    /// The 14-digit text form of this packed value.
    pub fn timestamp(self) -> Timestamp {
        Timestamp(self.unpack())
    }
}

/// Displays as `YYYYMMDDHHMMSS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(pub DateTime);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dt = &self.0;
        write!(
            f,
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
        )
    }
}

/// Decodes exactly 14 ASCII digits into calendar fields.
pub fn parse_timestamp(text: &str) -> Option<DateTime> {
    let bytes = text.as_bytes();
    if bytes.len() != 14 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let field = |from: usize, to: usize| {
        bytes[from..to]
            .iter()
            .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'))
    };
    Some(DateTime {
        year: field(0, 4),
        month: field(4, 6) as u8,
        day: field(6, 8) as u8,
        hour: field(8, 10) as u8,
        minute: field(10, 12) as u8,
        second: field(12, 14) as u8,
    })
}

/// Splits an MDTM argument into an optional leading timestamp and the
/// file name. A timestamp is recognised only when it is followed by a space.
pub fn split_mdtm_argument(arg: &str) -> (Option<DateTime>, &str) {
    match arg.get(..14).zip(arg.get(14..)) {
        Some((stamp, rest)) if rest.starts_with(' ') => match parse_timestamp(stamp) {
            Some(dt) => (Some(dt), &rest[1..]),
            None => (None, arg),
        },
        _ => (None, arg),
    }
}
