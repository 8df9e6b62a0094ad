//! Kubernetes-style resource quantities, e.g. `10M`, `512Mi`, `100m` or `1e3`.
//!
//! ```text
//! <quantity>  ::= <sign>? <number> <suffix>
//! <number>    ::= <digits> | <digits> "." <digits>? | "." <digits>
//! <suffix>    ::= <binarySI> | <decimalSI> | <exponent>
//! <binarySI>  ::= Ki | Mi | Gi | Ti | Pi | Ei
//! <decimalSI> ::= n | u | m | "" | k | M | G | T | P | E
//! <exponent>  ::= ("e" | "E") <sign>? <digits>
//! ```
//!
//! Values are held exactly at nanounit resolution; anything finer is
//! rounded away from zero, as the API server does. Magnitudes beyond a
//! signed 64 bit count of base units are clamped to that limit.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Scale of the internal representation: one base unit is 10^9 nanounits.
const NANO_EXP: i64 = 9;

/// The largest magnitude held: `i64::MAX` base units.
const MAX_NANOS: i128 = i64::MAX as i128 * 1_000_000_000;

/// Mantissa digits that always fit an i128.
const MAX_DIGITS: usize = 38;

/// Why a quantity failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    /// The input was the empty string.
    #[error("quantity is empty")]
    Empty,
    /// The number portion is malformed.
    #[error("quantities must match the regular expression '^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$': {0:?}")]
    Format(String),
    /// The number is fine but the suffix is not one we know.
    #[error("unable to parse quantity's suffix {suffix:?} in {input:?}")]
    UnknownSuffix {
        /// The unrecognized suffix
        suffix: String,
        /// The whole input
        input: String,
    },
}

/// A parsed resource quantity.
///
/// Equality and ordering compare magnitudes, so `10M == 10000000` and
/// `1Ki == 1024`; the original spelling is kept for display.
#[derive(Debug, Clone)]
pub struct Quantity {
    nanos: i128,
    repr: String,
}

/// Returns (power of ten, power of 1024) for a suffix.
fn interpret_suffix(suffix: &str) -> Option<(i64, u32)> {
    let r = match suffix {
        "Ki" => (0, 1),
        "Mi" => (0, 2),
        "Gi" => (0, 3),
        "Ti" => (0, 4),
        "Pi" => (0, 5),
        "Ei" => (0, 6),
        "n" => (-9, 0),
        "u" => (-6, 0),
        "m" => (-3, 0),
        "" => (0, 0),
        "k" => (3, 0),
        "M" => (6, 0),
        "G" => (9, 0),
        "T" => (12, 0),
        "P" => (15, 0),
        "E" => (18, 0),
        s => {
            // A lone "e" is not an exponent; a lone "E" was handled above.
            let exp = s.strip_prefix(['e', 'E'].as_slice())?;
            let digits = exp.strip_prefix(['+', '-'].as_slice()).unwrap_or(exp);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (i64::from(exp.parse::<i32>().ok()?), 0)
        }
    };
    Some(r)
}

/// `mantissa * 1024^exp1024 * 10^exp10` in nanounits, saturating at
/// [`MAX_NANOS`]. `inexact` marks nonzero digits dropped from the mantissa.
fn scale_nanos(mantissa: i128, exp1024: u32, exp10: i64, inexact: bool) -> i128 {
    if mantissa == 0 {
        return 0;
    }
    let Some(m) = mantissa.checked_mul(1024i128.pow(exp1024)) else {
        return MAX_NANOS;
    };
    let pow10 = u32::try_from(exp10.unsigned_abs())
        .ok()
        .and_then(|e| 10i128.checked_pow(e));
    if exp10 >= 0 {
        pow10
            .and_then(|mul| m.checked_mul(mul))
            .map_or(MAX_NANOS, |v| v.min(MAX_NANOS))
    } else {
        // Finer than a nanounit: round up.
        match pow10 {
            Some(div) => m / div + i128::from(m % div != 0 || inexact),
            None => 1,
        }
    }
}

impl Quantity {
    /// Parse a quantity.
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        if input.is_empty() {
            return Err(QuantityError::Empty);
        }
        let format_err = || QuantityError::Format(input.to_owned());

        let (negative, rest) = match input.as_bytes()[0] {
            b'-' => (true, &input[1..]),
            b'+' => (false, &input[1..]),
            _ => (false, input),
        };
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, rest) = rest.split_at(int_len);
        let (frac_part, suffix) = match rest.strip_prefix('.') {
            Some(rest) => {
                let n = rest.bytes().take_while(u8::is_ascii_digit).count();
                rest.split_at(n)
            }
            None => ("", rest),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format_err());
        }
        if !suffix
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-')
        {
            return Err(format_err());
        }
        let (exp10, exp1024) =
            interpret_suffix(suffix).ok_or_else(|| QuantityError::UnknownSuffix {
                suffix: suffix.to_owned(),
                input: input.to_owned(),
            })?;

        let digits = format!("{int_part}{frac_part}");
        let digits = digits.trim_start_matches('0');
        let (head, tail) = digits.split_at(digits.len().min(MAX_DIGITS));
        let mantissa: i128 = if head.is_empty() {
            0
        } else {
            head.parse().map_err(|_| format_err())?
        };
        let exp10 = exp10 + NANO_EXP - frac_part.len() as i64 + tail.len() as i64;
        let inexact = tail.bytes().any(|b| b != b'0');
        let nanos = scale_nanos(mantissa, exp1024, exp10, inexact);

        Ok(Quantity {
            nanos: if negative { -nanos } else { nanos },
            repr: input.to_owned(),
        })
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nanos.hash(state);
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.repr)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a quantity such as 512Mi, or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
                Quantity::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
                self.visit_str(&v.to_string())
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
                self.visit_str(&v.to_string())
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
                self.visit_str(&v.to_string())
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}
