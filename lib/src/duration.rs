//! Durations written as a sequence of `<decimal><unit>` terms, e.g. `2m`,
//! `1h30m` or `1.5s`, with the units `ns`, `us` (also `µs`/`μs`), `ms`, `s`,
//! `m` and `h`.
//!
//! A leading sign applies to the whole sequence, so `-1h30m` is ninety
//! minutes before zero. Values span a signed 64 bit nanosecond count.
//! [`format_duration`] produces the canonical spelling, which parses back
//! to the same value.

use chrono::TimeDelta;
use serde::Serializer;
use thiserror::Error;

/// Maximum representable magnitude, in nanoseconds (a signed 64 bit count).
const MAX_NANOS: u64 = 1 << 63;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Why a duration failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("duration out of range: {0:?}")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u64> {
    let r = match unit {
        "ns" => 1,
        // U+00B5 micro sign and U+03BC greek small letter mu
        "us" | "\u{00b5}s" | "\u{03bc}s" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 60 * 60 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(r)
}

/// Consume leading ASCII digits, returning their value (None on overflow),
/// the number of digits consumed, and the rest of the input.
fn leading_int(s: &str) -> (Option<u64>, usize, &str) {
    let n = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut v: Option<u64> = Some(0);
    for b in s[..n].bytes() {
        v = v
            .and_then(|v| v.checked_mul(10))
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .filter(|&v| v <= MAX_NANOS);
    }
    (v, n, &s[n..])
}

/// Consume the digits after a decimal point. Digits beyond what fits are
/// dropped; they're below nanosecond resolution anyway.
fn leading_fraction(s: &str) -> (u64, f64, usize, &str) {
    let n = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut v: u64 = 0;
    let mut scale = 1f64;
    let mut overflow = false;
    for b in s[..n].bytes() {
        if overflow {
            continue;
        }
        match v
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .filter(|&v| v <= MAX_NANOS)
        {
            Some(next) => {
                v = next;
                scale *= 10.0;
            }
            None => overflow = true,
        }
    }
    (v, scale, n, &s[n..])
}

/// Parse a duration string.
pub(crate) fn parse_duration(input: &str) -> Result<TimeDelta, DurationError> {
    let invalid = || DurationError::Invalid(input.to_owned());
    let overflow = || DurationError::Overflow(input.to_owned());

    let mut s = input;
    let mut neg = false;
    if let Some(rest) = s.strip_prefix('-') {
        neg = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    // The one unitless value we accept
    if s == "0" {
        return Ok(TimeDelta::zero());
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !s.is_empty() {
        if !s.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
            return Err(invalid());
        }
        let (whole, pre, rest) = leading_int(s);
        let whole = whole.ok_or_else(invalid)?;
        s = rest;
        let mut frac = (0u64, 1f64, 0usize);
        if let Some(rest) = s.strip_prefix('.') {
            let (f, scale, post, rest) = leading_fraction(rest);
            frac = (f, scale, post);
            s = rest;
        }
        let (f, scale, post) = frac;
        if pre == 0 && post == 0 {
            // "." or ".s" has no digits at all
            return Err(invalid());
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        if unit_len == 0 {
            return Err(DurationError::MissingUnit(input.to_owned()));
        }
        let (unit, rest) = s.split_at(unit_len);
        s = rest;
        let per_unit = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_owned(),
            input: input.to_owned(),
        })?;

        if whole > MAX_NANOS / per_unit {
            return Err(overflow());
        }
        let mut v = whole * per_unit;
        if f > 0 {
            // Fractional part, truncated to the nanosecond
            v += (f as f64 * (per_unit as f64 / scale)) as u64;
            if v > MAX_NANOS {
                return Err(overflow());
            }
        }
        total = total.checked_add(v).ok_or_else(overflow)?;
        if total > MAX_NANOS {
            return Err(overflow());
        }
    }

    let total = i128::from(total);
    let nanos = i64::try_from(if neg { -total } else { total }).map_err(|_| overflow())?;
    Ok(TimeDelta::nanoseconds(nanos))
}

/// Render `v / 10^prec` with trailing fractional zeros removed.
fn fmt_frac(v: u64, prec: u32) -> String {
    let div = 10u64.pow(prec);
    let (whole, frac) = (v / div, v % div);
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = prec as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Format a duration the way it's written in annotations, e.g. `1h30m0s`,
/// `250ms` or `-2m0s`. Parsing the result yields the same duration.
pub fn format_duration(d: TimeDelta) -> String {
    let nanos = d
        .num_nanoseconds()
        .unwrap_or(if d < TimeDelta::zero() { i64::MIN } else { i64::MAX });
    let sign = if nanos < 0 { "-" } else { "" };
    let nanos = nanos.unsigned_abs();
    if nanos < NANOS_PER_SEC {
        return match nanos {
            0 => "0s".to_owned(),
            n if n < 1_000 => format!("{sign}{n}ns"),
            n if n < 1_000_000 => format!("{sign}{}\u{00b5}s", fmt_frac(n, 3)),
            n => format!("{sign}{}ms", fmt_frac(n, 6)),
        };
    }
    let secs = nanos / NANOS_PER_SEC;
    let subsec = nanos % NANOS_PER_SEC;
    let mut r = format!("{}s", fmt_frac((secs % 60) * NANOS_PER_SEC + subsec, 9));
    let mins = secs / 60;
    if mins > 0 {
        r = format!("{}m{r}", mins % 60);
        let hours = mins / 60;
        if hours > 0 {
            r = format!("{hours}h{r}");
        }
    }
    format!("{sign}{r}")
}

/// Serialize an optional duration in annotation syntax.
pub(crate) fn serialize_opt<S: Serializer>(
    d: &Option<TimeDelta>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => serializer.serialize_str(&format_duration(*d)),
        None => serializer.serialize_none(),
    }
}
