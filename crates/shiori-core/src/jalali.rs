//! Gregorian → Jalali (Solar Hijri) conversion and Persian digit rendering.

use chrono::{Datelike, NaiveDate};

/// A date on the Jalali calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JalaliDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Cumulative day counts at the start of each Gregorian month (non-leap).
const GREGORIAN_MONTH_OFFSETS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

impl JalaliDate {
    /// Arithmetic conversion over the 33-year cycle; exact for 1979..2100.
    pub fn from_gregorian(date: NaiveDate) -> Self {
        let gy = i64::from(date.year());
        let gm = date.month() as usize;
        let gd = i64::from(date.day());

        let gy2 = if gm > 2 { gy + 1 } else { gy };
        let mut days = 355_666 + 365 * gy + (gy2 + 3) / 4 - (gy2 + 99) / 100 + (gy2 + 399) / 400
            + gd
            + GREGORIAN_MONTH_OFFSETS[gm - 1];

        let mut jy = -1595 + 33 * (days / 12_053);
        days %= 12_053;
        jy += 4 * (days / 1461);
        days %= 1461;
        if days > 365 {
            jy += (days - 1) / 365;
            days = (days - 1) % 365;
        }

        let (jm, jd) = if days < 186 {
            (1 + days / 31, 1 + days % 31)
        } else {
            (7 + (days - 186) / 30, 1 + (days - 186) % 30)
        };

        Self {
            year: jy as i32,
            month: jm as u32,
            day: jd as u32,
        }
    }

    /// `YYYY/MM/DD` in Persian digits.
    pub fn to_persian_string(self) -> String {
        to_persian_digits(&format!("{:04}/{:02}/{:02}", self.year, self.month, self.day))
    }
}

/// Replace ASCII digits with Extended Arabic-Indic (Persian) digits.
pub fn to_persian_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if c.is_ascii_digit() => char::from_u32(0x06F0 + d).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Render an upstream date string for display.
///
/// ISO dates (optionally followed by a time part) become Jalali; anything
/// else is assumed to be pre-formatted and returned unchanged.
pub fn format_air_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => JalaliDate::from_gregorian(date).to_persian_string(),
        Err(_) => raw.to_string(),
    }
}
