//! TOML date and time literals (RFC 3339 profile).

#[cfg(test)]
#[path = "./time_tests.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

/// A calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// A wall-clock time.
#[derive(Clone, Copy, Debug)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
    /// Number of digits in the original fractional seconds, 0 if none.
    precision: u8,
}

impl Time {
    /// Creates a time without fractional seconds.
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
            nanosecond: 0,
            precision: 0,
        }
    }

    /// Number of digits in the original fractional seconds, 0 if none.
    pub fn subsecond_precision(&self) -> u8 {
        self.precision
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.hour == other.hour
            && self.minute == other.minute
            && self.second == other.second
            && self.nanosecond == other.nanosecond
    }
}

impl Eq for Time {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeOffset {
    /// A suffix which, when applied to a time, denotes a UTC offset of 00:00;
    /// often spoken “Zulu” from the ICAO phonetic alphabet representation of the letter “Z”.
    /// RFC 3339 section 2
    Z,
    /// Offset between local time and UTC
    Custom { minutes: i16 },
}

/// Which of the four TOML date/time literal shapes a [`Datetime`] has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatetimeKind {
    /// `1979-05-27T07:32:00Z`
    OffsetDatetime,
    /// `1979-05-27T07:32:00`
    LocalDatetime,
    /// `1979-05-27`
    LocalDate,
    /// `07:32:00`
    LocalTime,
}

/// Container for temporal times for TOML format, based on RFC 3339
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Datetime {
    date: Option<Date>,
    time: Option<Time>,
    offset: Option<TimeOffset>,
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    const DAYS: [u8; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[month as usize]
    }
}

impl Datetime {
    /// A local date such as `2024-01-01`.
    pub fn local_date(date: Date) -> Self {
        Self {
            date: Some(date),
            time: None,
            offset: None,
        }
    }

    /// A local time such as `07:32:00`.
    pub fn local_time(time: Time) -> Self {
        Self {
            date: None,
            time: Some(time),
            offset: None,
        }
    }

    /// A date and time without an offset.
    pub fn local_datetime(date: Date, time: Time) -> Self {
        Self {
            date: Some(date),
            time: Some(time),
            offset: None,
        }
    }

    /// A date and time at a fixed UTC offset.
    pub fn offset_datetime(date: Date, time: Time, offset: TimeOffset) -> Self {
        Self {
            date: Some(date),
            time: Some(time),
            offset: Some(offset),
        }
    }

    pub fn kind(&self) -> DatetimeKind {
        match (self.date.is_some(), self.time.is_some(), self.offset.is_some()) {
            (true, true, true) => DatetimeKind::OffsetDatetime,
            (true, true, false) => DatetimeKind::LocalDatetime,
            (true, false, _) => DatetimeKind::LocalDate,
            _ => DatetimeKind::LocalTime,
        }
    }

    pub fn date(&self) -> Option<Date> {
        self.date
    }

    pub fn time(&self) -> Option<Time> {
        self.time
    }

    pub fn offset(&self) -> Option<TimeOffset> {
        self.offset
    }

    /// Returns `true` when `input` starts like a date or time rather than a
    /// number: a run of digits directly followed by `-` or `:`.
    pub(crate) fn looks_like(input: &[u8]) -> bool {
        let digits = input.iter().take_while(|b| b.is_ascii_digit()).count();
        digits > 0 && matches!(input.get(digits), Some(b'-' | b':'))
    }

    /// Scans a date/time literal from the start of `input`, returning the
    /// number of bytes consumed. Every component must be fully zero padded.
    pub(crate) fn munch(input: &[u8]) -> Option<(usize, Datetime)> {
        enum State {
            Year,
            Month,
            Day,
            Hour,
            Minute,
            Second,
            Frac,
            OffHour,
            OffMin,
        }
        let mut state = match input {
            [_, _, b':', _, _, ..] => State::Hour,
            [_, _, _, _, b'-', _, _, b'-', ..] => State::Year,
            _ => return None,
        };

        let mut date = Date {
            year: 0,
            month: 0,
            day: 0,
        };
        let mut time = Time::new(0, 0, 0);
        let mut has_date = false;
        let mut has_time = false;
        let mut offset = None;

        let mut current = 0u32;
        let mut len = 0u32;
        let mut off_sign: i16 = 1;
        let mut off_hour: u8 = 0;
        let mut i = 0usize;
        let mut valid = false;

        'outer: loop {
            let byte = input.get(i).copied().unwrap_or(0);
            if byte.is_ascii_digit() {
                len += 1;
                if len <= 9 {
                    current = current * 10 + (byte - b'0') as u32;
                }
                i += 1;
                continue;
            }
            'next: {
                match state {
                    State::Year => {
                        if len != 4 || byte != b'-' {
                            break 'outer;
                        }
                        date.year = current as u16;
                        state = State::Month;
                        break 'next;
                    }
                    State::Month => {
                        let m = current as u8;
                        if len != 2 || byte != b'-' || m < 1 || m > 12 {
                            break 'outer;
                        }
                        date.month = m;
                        state = State::Day;
                        break 'next;
                    }
                    State::Day => {
                        let d = current as u8;
                        if len != 2 || d < 1 || d > days_in_month(date.year, date.month) {
                            break 'outer;
                        }
                        date.day = d;
                        has_date = true;
                        if byte == b'T' || byte == b't' {
                            state = State::Hour;
                            break 'next;
                        } else if byte == b' '
                            && input.get(i + 1).is_some_and(|b| b.is_ascii_digit())
                        {
                            state = State::Hour;
                            break 'next;
                        } else {
                            valid = true;
                            break 'outer;
                        }
                    }
                    State::Hour => {
                        let h = current as u8;
                        if len != 2 || byte != b':' || h > 23 {
                            break 'outer;
                        }
                        time.hour = h;
                        state = State::Minute;
                        break 'next;
                    }
                    State::Minute => {
                        // Seconds are mandatory.
                        if len != 2 || byte != b':' || current > 59 {
                            break 'outer;
                        }
                        time.minute = current as u8;
                        has_time = true;
                        state = State::Second;
                        break 'next;
                    }
                    State::Second => {
                        // 60 is allowed for leap seconds
                        if len != 2 || current > 60 {
                            break 'outer;
                        }
                        time.second = current as u8;
                        if byte == b'.' {
                            state = State::Frac;
                            break 'next;
                        }
                    }
                    State::Frac => {
                        if len == 0 {
                            break 'outer;
                        }
                        let nd = len.min(9) as u8;
                        let mut nanos = current;
                        for _ in nd..9 {
                            nanos *= 10;
                        }
                        time.nanosecond = nanos;
                        time.precision = nd;
                    }
                    State::OffHour => {
                        let h = current as u8;
                        if len != 2 || byte != b':' || h > 23 {
                            break 'outer;
                        }
                        off_hour = h;
                        state = State::OffMin;
                        break 'next;
                    }
                    State::OffMin => {
                        if len != 2 || current > 59 {
                            break 'outer;
                        }
                        offset = Some(TimeOffset::Custom {
                            minutes: off_sign * (off_hour as i16 * 60 + current as i16),
                        });
                        valid = true;
                        break 'outer;
                    }
                }
                // Only reached after the second or fraction component.
                match byte {
                    b'Z' | b'z' => {
                        offset = Some(TimeOffset::Z);
                        i += 1;
                        valid = true;
                        break 'outer;
                    }
                    b'+' => {
                        off_sign = 1;
                        state = State::OffHour;
                    }
                    b'-' => {
                        off_sign = -1;
                        state = State::OffHour;
                    }
                    _ => {
                        valid = true;
                        break 'outer;
                    }
                }
            }
            i += 1;
            current = 0;
            len = 0;
        }
        // A bare time cannot carry an offset.
        if !valid || (!has_date && offset.is_some()) {
            return None;
        }
        Some((
            i,
            Datetime {
                date: has_date.then_some(date),
                time: has_time.then_some(time),
                offset,
            },
        ))
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(date) = &self.date {
            write!(f, "{:04}-{:02}-{:02}", date.year, date.month, date.day)?;
            if self.time.is_some() {
                f.write_str("T")?;
            }
        }
        if let Some(time) = &self.time {
            write!(f, "{:02}:{:02}:{:02}", time.hour, time.minute, time.second)?;
            if time.precision > 0 {
                let digits = format!("{:09}", time.nanosecond);
                f.write_str(".")?;
                f.write_str(&digits[..time.precision as usize])?;
            }
            match self.offset {
                None => {}
                Some(TimeOffset::Z) => f.write_str("Z")?,
                Some(TimeOffset::Custom { minutes }) => {
                    let sign = if minutes < 0 { '-' } else { '+' };
                    let abs = minutes.unsigned_abs();
                    write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Error returned when a string is not a complete TOML date/time literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatetimeParseError;

impl fmt::Display for DatetimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid date or time")
    }
}

impl std::error::Error for DatetimeParseError {}

impl FromStr for Datetime {
    type Err = DatetimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Datetime::munch(s.as_bytes()) {
            Some((len, value)) if len == s.len() => Ok(value),
            _ => Err(DatetimeParseError),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Datetime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
