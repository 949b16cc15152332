//! Recurrence specifications.
//!
//! A recurrence is one or more ASCII digits followed by a single unit
//! character: `m` (minutes), `h` (hours) or `d` (days). Composite forms such
//! as `1h30m` are not accepted.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::RecurrenceError;

/// Compiled recurrence pattern (cached).
fn recurrence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+)([mhd])$").unwrap())
}

/// Unit of a recurrence interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceUnit {
    Minutes,
    Hours,
    Days,
}

impl RecurrenceUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            "d" => Some(Self::Days),
            _ => None,
        }
    }

    /// The single-character suffix for this unit.
    pub fn suffix(self) -> char {
        match self {
            Self::Minutes => 'm',
            Self::Hours => 'h',
            Self::Days => 'd',
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(self) -> i64 {
        match self {
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 24 * 60 * 60,
        }
    }
}

/// A parsed, strictly positive repeat interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recurrence {
    value: u32,
    unit: RecurrenceUnit,
}

impl Recurrence {
    /// Parse a recurrence specification such as `"5m"`, `"3h"` or `"2d"`.
    pub fn parse(input: &str) -> Result<Self, RecurrenceError> {
        if input.is_empty() {
            return Err(RecurrenceError::Empty);
        }

        let caps = recurrence_regex()
            .captures(input)
            .ok_or_else(|| RecurrenceError::Malformed(input.to_string()))?;

        let value: u32 = caps[1]
            .parse()
            .map_err(|_| RecurrenceError::OutOfRange(input.to_string()))?;
        if value == 0 {
            return Err(RecurrenceError::Zero(input.to_string()));
        }

        let unit = RecurrenceUnit::from_suffix(&caps[2])
            .ok_or_else(|| RecurrenceError::Malformed(input.to_string()))?;

        Ok(Self { value, unit })
    }

    /// Numeric part of the interval.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Unit of the interval.
    pub fn unit(&self) -> RecurrenceUnit {
        self.unit
    }

    /// The interval as a duration. Always strictly positive.
    pub fn duration(&self) -> Duration {
        // u32::MAX days is far below the TimeDelta limit
        Duration::seconds(i64::from(self.value) * self.unit.seconds())
    }
}

impl FromStr for Recurrence {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl Serialize for Recurrence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Recurrence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_each_unit() {
        assert_eq!(Recurrence::parse("5m").unwrap().duration(), Duration::minutes(5));
        assert_eq!(Recurrence::parse("3h").unwrap().duration(), Duration::hours(3));
        assert_eq!(Recurrence::parse("2d").unwrap().duration(), Duration::days(2));
    }

    #[test]
    fn test_leading_zeros_accepted() {
        let r = Recurrence::parse("007h").unwrap();
        assert_eq!(r.value(), 7);
        assert_eq!(r.to_string(), "7h");
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(Recurrence::parse(""), Err(RecurrenceError::Empty));
    }

    #[test]
    fn test_zero_rejected() {
        for input in ["0m", "0h", "0d", "000d"] {
            assert!(
                matches!(Recurrence::parse(input), Err(RecurrenceError::Zero(_))),
                "{input} should be rejected as zero"
            );
        }
    }

    #[test]
    fn test_malformed_rejected() {
        for input in [
            "h", "5", "5s", "5w", "5H", "1h30m", " 5m", "5m ", "+5m", "-5m", "5 m", "bad", "1.5h",
            "５m",
        ] {
            assert!(
                matches!(Recurrence::parse(input), Err(RecurrenceError::Malformed(_))),
                "{input:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            Recurrence::parse("99999999999999999999d"),
            Err(RecurrenceError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_largest_value_fits() {
        let r = Recurrence::parse(&format!("{}d", u32::MAX)).unwrap();
        assert!(r.duration() > Duration::zero());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let r: Recurrence = serde_json::from_str("\"12h\"").unwrap();
        assert_eq!(r.unit(), RecurrenceUnit::Hours);
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"12h\"");
        assert!(serde_json::from_str::<Recurrence>("\"0h\"").is_err());
    }

    proptest! {
        #[test]
        fn parsed_duration_is_value_times_unit(value in 1u32..1_000_000, unit in prop::sample::select(vec!['m', 'h', 'd'])) {
            let r = Recurrence::parse(&format!("{value}{unit}")).unwrap();
            let unit_secs = match unit {
                'm' => 60,
                'h' => 3600,
                _ => 86400,
            };
            prop_assert_eq!(r.duration().num_seconds(), i64::from(value) * unit_secs);
        }

        #[test]
        fn parsed_duration_always_positive(input in "[0-9]{1,9}[mhd]") {
            match Recurrence::parse(&input) {
                Ok(r) => prop_assert!(r.duration() > Duration::zero()),
                Err(e) => prop_assert_eq!(e, RecurrenceError::Zero(input.clone())),
            }
        }

        #[test]
        fn non_matching_input_rejected(input in "[^0-9]*|[0-9]*[^mhd0-9]|[0-9]+[mhd].+") {
            prop_assert!(Recurrence::parse(&input).is_err());
        }

        #[test]
        fn display_roundtrips(value in 1u32.., unit in prop::sample::select(vec!['m', 'h', 'd'])) {
            let r = Recurrence::parse(&format!("{value}{unit}")).unwrap();
            prop_assert_eq!(Recurrence::parse(&r.to_string()).unwrap(), r);
        }
    }
}
