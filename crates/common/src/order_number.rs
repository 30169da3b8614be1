use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const PREFIX: &str = "ORD";

/// Human-readable order identifier of the form `ORD-<year>-<sequence>`.
///
/// The sequence is zero-padded to four digits and is unique only within its
/// year. Ordering compares year first, then sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderNumber {
    year: i32,
    sequence: u32,
}

impl OrderNumber {
    /// Creates an order number from its parts.
    pub fn new(year: i32, sequence: u32) -> Self {
        Self { year, sequence }
    }

    /// Returns the calendar year the number belongs to.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the per-year sequence.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}-{}-{:04}", self.year, self.sequence)
    }
}

/// Error returned when a string is not a well-formed order number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order number '{0}': expected ORD-<year>-<sequence>")]
pub struct OrderNumberParseError(String);

impl FromStr for OrderNumber {
    type Err = OrderNumberParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || OrderNumberParseError(s.to_string());
        let mut parts = s.trim().splitn(3, '-');

        if parts.next() != Some(PREFIX) {
            return Err(err());
        }
        let year = parts
            .next()
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(err)?;
        let sequence_str = parts.next().ok_or_else(err)?;
        if sequence_str.len() < 4 || !sequence_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let sequence = sequence_str.parse::<u32>().map_err(|_| err())?;
        if sequence == 0 {
            return Err(err());
        }

        Ok(Self { year, sequence })
    }
}

impl Serialize for OrderNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_four_digit_padding() {
        assert_eq!(OrderNumber::new(2024, 1).to_string(), "ORD-2024-0001");
        assert_eq!(OrderNumber::new(2024, 42).to_string(), "ORD-2024-0042");
        assert_eq!(OrderNumber::new(2025, 12345).to_string(), "ORD-2025-12345");
    }

    #[test]
    fn parses_printed_form() {
        let number: OrderNumber = "ORD-2024-0007".parse().unwrap();
        assert_eq!(number.year(), 2024);
        assert_eq!(number.sequence(), 7);
    }

    #[test]
    fn rejects_malformed_numbers() {
        for raw in ["", "ORD-2024", "ORD-2024-7", "INV-2024-0001", "ORD-abcd-0001", "ORD-2024-0000"] {
            assert!(raw.parse::<OrderNumber>().is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn orders_by_year_then_sequence() {
        assert!(OrderNumber::new(2024, 9999) < OrderNumber::new(2025, 1));
        assert!(OrderNumber::new(2025, 2) > OrderNumber::new(2025, 1));
    }

    #[test]
    fn serializes_as_string() {
        let number = OrderNumber::new(2024, 3);
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"ORD-2024-0003\"");
        let back: OrderNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);
    }
}
