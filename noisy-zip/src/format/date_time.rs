use std::fmt;

use chrono::{DateTime, Datelike, Local, Timelike};
use winnow::{binary::le_u16, seq, PResult, Parser, Partial};

/// A timestamp in MS-DOS format
///
/// Represents local dates from 1980 onwards with 2 second precision.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct MsdosTimestamp {
    /// Time in 2-second intervals
    pub time: u16,

    /// Date in MS-DOS format, cf. <https://docs.microsoft.com/en-us/windows/win32/api/winbase/nf-winbase-dosdatetimetofiletime>
    pub date: u16,
}

impl fmt::Debug for MsdosTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MsdosTimestamp({:04x}:{:04x})", self.date, self.time)
    }
}

impl MsdosTimestamp {
    /// 1980-01-01 00:00:00, the earliest representable moment. Anything
    /// older than the format itself collapses to this.
    pub const EPOCH: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Parser for MS-DOS timestamps
    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        seq! {Self {
            time: le_u16,
            date: le_u16,
        }}
        .parse_next(i)
    }

    /// Pack a local datetime. Dates before 1980 collapse to [Self::EPOCH];
    /// dates past 2107 pin to the last representable year.
    pub fn from_datetime(dt: DateTime<Local>) -> Self {
        if dt.year() < 1980 {
            return Self::EPOCH;
        }
        let year = (dt.year() - 1980).min(0x7f) as u16;
        Self {
            // bits 0-4: second/2, bits 5-10: minute, bits 11-15: hour
            time: ((dt.hour() as u16) << 11)
                | ((dt.minute() as u16) << 5)
                | (dt.second() as u16 / 2),
            // bits 0-4: day, bits 5-8: month, bits 9-15: year since 1980
            date: (year << 9) | ((dt.month() as u16) << 5) | dt.day() as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn packs_the_documented_bit_layout() {
        let dt = Local.with_ymd_and_hms(2020, 6, 15, 12, 34, 56).unwrap();
        let ts = MsdosTimestamp::from_datetime(dt);
        assert_eq!(ts.date, ((2020 - 1980) << 9) | (6 << 5) | 15);
        assert_eq!(ts.time, (12 << 11) | (34 << 5) | (56 / 2));
    }

    #[test]
    fn pre_1980_collapses_to_the_epoch() {
        let dt = Local.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(MsdosTimestamp::from_datetime(dt), MsdosTimestamp::EPOCH);
    }

    #[test]
    fn epoch_is_1980_01_01() {
        assert_eq!(MsdosTimestamp::EPOCH.date, 0x21);
        assert_eq!(MsdosTimestamp::EPOCH.time, 0);
    }
}
