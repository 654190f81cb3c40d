//! UTCTime and GeneralizedTime parsing.
//!
//! Both forms share one shape (date, time-of-day with optional minutes,
//! seconds and fractional part, then an optional `Z` or `±HHMM` zone
//! suffix) and differ only in the year width. Results are normalized to
//! UTC. Two-digit years pivot at 70 into the fixed range [1970, 2069].

use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

use crate::error::Error;

const UTC_TIME_PATTERN: &str = r"^(\d\d)(0[1-9]|1[0-2])(0[1-9]|[12]\d|3[01])([01]\d|2[0-3])(?:([0-5]\d)(?:([0-5]\d)(?:[.,](\d{1,3}))?)?)?(Z|[-+](?:0\d|1[0-2])(?:[0-5]\d)?)?$";
const GENERALIZED_TIME_PATTERN: &str = r"^(\d\d\d\d)(0[1-9]|1[0-2])(0[1-9]|[12]\d|3[01])([01]\d|2[0-3])(?:([0-5]\d)(?:([0-5]\d)(?:[.,](\d{1,3}))?)?)?(Z|[-+](?:0\d|1[0-2])(?:[0-5]\d)?)?$";

pub(crate) fn parse_utc_time(data: &[u8]) -> Result<NaiveDateTime, Error> {
    let s = std::str::from_utf8(data).map_err(|_| Error::UtcTimeNoData)?;
    let caps = captures(UTC_TIME_PATTERN, s).ok_or_else(|| Error::UtcTimeInvalidFormat(s.to_string()))?;
    let mut year = group(&caps, 1);
    year += if year < 70 { 2000 } else { 1900 };
    build(&caps, year).ok_or_else(|| Error::UtcTimeInvalidFormat(s.to_string()))
}

pub(crate) fn parse_generalized_time(data: &[u8]) -> Result<NaiveDateTime, Error> {
    let s = std::str::from_utf8(data).map_err(|_| Error::GeneralizedTimeNoData)?;
    let caps = captures(GENERALIZED_TIME_PATTERN, s)
        .ok_or_else(|| Error::GeneralizedTimeInvalidFormat(s.to_string()))?;
    let year = group(&caps, 1);
    build(&caps, year).ok_or_else(|| Error::GeneralizedTimeInvalidFormat(s.to_string()))
}

fn captures<'a>(pattern: &str, s: &'a str) -> Option<Captures<'a>> {
    Regex::new(pattern).ok().and_then(|re| re.captures(s))
}

fn group(caps: &Captures<'_>, index: usize) -> i64 {
    caps.get(index)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

fn build(caps: &Captures<'_>, year: i64) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(year as i32, group(caps, 2) as u32, group(caps, 3) as u32)?;
    let dt = date.and_hms_milli_opt(
        group(caps, 4) as u32,
        group(caps, 5) as u32,
        group(caps, 6) as u32,
        group(caps, 7) as u32,
    )?;
    // normalize a ±HHMM suffix to UTC; a bare or Z suffix already is
    match caps.get(8).map(|m| m.as_str()) {
        Some(zone) if zone != "Z" && zone != "z" => {
            let sign: i64 = if zone.starts_with('-') { -1 } else { 1 };
            let digits = &zone[1..];
            let hours: i64 = digits.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i64 = digits.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            Some(dt - Duration::minutes(sign * (hours * 60 + minutes)))
        }
        _ => Some(dt),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use rstest::rstest;

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    #[rstest(
        input,
        expected,
        case("191216030210Z", "2019-12-16 03:02:10"),
        case("191228163336Z", "2019-12-28 16:33:36"),
        // pre-pivot years land in the 1900s
        case("701216030210Z", "1970-12-16 03:02:10"),
        case("691216030210Z", "2069-12-16 03:02:10"),
        // a zone offset is folded into UTC
        case("191215190210-0800", "2019-12-16 03:02:10"),
        case("191216060210+0300", "2019-12-16 03:02:10"),
        // seconds are optional
        case("1912160302Z", "2019-12-16 03:02:00")
    )]
    fn test_parse_utc_time(input: &str, expected: &str) {
        let expected = NaiveDateTime::parse_from_str(expected, FORMAT).unwrap();
        let actual = super::parse_utc_time(input.as_bytes()).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(
        input,
        expected,
        case("20191216030210Z", "2019-12-16 03:02:10"),
        case("20190929163336Z", "2019-09-29 16:33:36"),
        case("20191215190210-0800", "2019-12-16 03:02:10"),
        case("20500101000000Z", "2050-01-01 00:00:00")
    )]
    fn test_parse_generalized_time(input: &str, expected: &str) {
        let expected = NaiveDateTime::parse_from_str(expected, FORMAT).unwrap();
        let actual = super::parse_generalized_time(input.as_bytes()).unwrap();
        assert_eq!(expected, actual);
    }

    #[rstest(
        input,
        case("19121603021Z"),
        case("191316030210Z"),
        case("191232030210Z"),
        case("notatime"),
        case("")
    )]
    fn test_parse_utc_time_invalid(input: &str) {
        assert!(super::parse_utc_time(input.as_bytes()).is_err());
    }

    #[test]
    fn test_fractional_seconds_accepted() {
        let actual = super::parse_generalized_time(b"20191216030210.500Z").unwrap();
        let expected =
            NaiveDateTime::parse_from_str("2019-12-16 03:02:10", FORMAT).unwrap()
                + chrono::Duration::milliseconds(500);
        assert_eq!(expected, actual);
    }
}
