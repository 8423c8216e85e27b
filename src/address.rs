//! Address formatting for twd97geo.
//!
//! A reverse geocoding lookup produces a `PlaceRecord` (or nothing, or an
//! error). This module shapes that outcome into an `AddressResult`, whose
//! `Display` output is the string written for the user:
//!
//! - `"<country>, <county>, <town>"` when the record has all three parts
//! - `無法找到地址` ("address not found") when there is nothing usable
//! - `發生錯誤: <message>` ("an error occurred") when the lookup failed
//!
//! The field order, the `", "` separator and both sentinel strings are relied
//! on by downstream consumers of the output and must not change.

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between address components
pub const ADDRESS_SEPARATOR: &str = ", ";

/// Text shown when a lookup succeeded but yielded no usable address
pub const NOT_FOUND_MESSAGE: &str = "無法找到地址";

/// Prefix of the text shown when a lookup failed
pub const ERROR_PREFIX: &str = "發生錯誤";

/// A place returned by a reverse geocoding lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlaceRecord {
    /// The service's own one-line rendering of the place
    pub display_name: Option<String>,
    /// Country name (e.g., "臺灣")
    pub country: Option<String>,
    /// County or city-level administrative area (e.g., "花蓮縣")
    pub county: Option<String>,
    /// Town or township (e.g., "吉安鄉")
    pub town: Option<String>,
}

impl PlaceRecord {
    /// Returns true when the record carries any address data at all.
    pub fn has_address(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());

        present(&self.display_name)
            || present(&self.country)
            || present(&self.county)
            || present(&self.town)
    }
}

/// Outcome of shaping a lookup into a displayable address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressResult {
    /// The formatted address
    Found(String),
    /// The lookup returned no usable address
    NotFound,
    /// The lookup failed; carries the underlying message
    Error(String),
}

impl fmt::Display for AddressResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressResult::Found(address) => write!(f, "{address}"),
            AddressResult::NotFound => write!(f, "{NOT_FOUND_MESSAGE}"),
            AddressResult::Error(message) => write!(f, "{ERROR_PREFIX}: {message}"),
        }
    }
}

/// Formats a place into `"<country>, <county>, <town>"`.
///
/// An absent or empty record is `NotFound`. So is a partial record missing any
/// of the three components: a Taipei-style municipality with no county, for
/// instance, is reported as not found rather than as a shortened address.
pub fn format_address(place: Option<&PlaceRecord>) -> AddressResult {
    let Some(place) = place.filter(|p| p.has_address()) else {
        return AddressResult::NotFound;
    };

    let fields = [
        ("country", &place.country),
        ("county", &place.county),
        ("town", &place.town),
    ];

    let mut parts = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        match value.as_deref() {
            Some(value) if !value.is_empty() => parts.push(value),
            _ => {
                debug!("Place record is missing its {name}: {place:?}");
                return AddressResult::NotFound;
            }
        }
    }

    AddressResult::Found(parts.join(ADDRESS_SEPARATOR))
}

/// Formats the outcome of a geocoding lookup, turning failures into `Error`.
pub fn format_lookup(lookup: Result<Option<PlaceRecord>>) -> AddressResult {
    match lookup {
        Ok(place) => format_address(place.as_ref()),
        Err(err) => AddressResult::Error(format!("{err:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    fn hualien() -> PlaceRecord {
        PlaceRecord {
            display_name: Some("吉安鄉, 花蓮縣, 臺灣".to_string()),
            country: Some("臺灣".to_string()),
            county: Some("花蓮縣".to_string()),
            town: Some("吉安鄉".to_string()),
        }
    }

    #[test]
    fn test_format_complete_record() {
        let result = format_address(Some(&hualien()));

        assert_eq!(result, AddressResult::Found("臺灣, 花蓮縣, 吉安鄉".to_string()));
        assert_eq!(result.to_string(), "臺灣, 花蓮縣, 吉安鄉");
    }

    #[test]
    fn test_format_absent_record() {
        let result = format_address(None);

        assert_eq!(result, AddressResult::NotFound);
        assert_eq!(result.to_string(), "無法找到地址");
    }

    #[test]
    fn test_format_empty_record() {
        assert_eq!(
            format_address(Some(&PlaceRecord::default())),
            AddressResult::NotFound
        );

        let blank = PlaceRecord {
            display_name: Some(String::new()),
            ..PlaceRecord::default()
        };
        assert!(!blank.has_address());
        assert_eq!(format_address(Some(&blank)), AddressResult::NotFound);
    }

    #[test]
    fn test_format_partial_record() {
        // Special municipalities have no county
        let taipei = PlaceRecord {
            display_name: Some("信義區, 臺北市, 臺灣".to_string()),
            country: Some("臺灣".to_string()),
            county: None,
            town: None,
        };
        assert!(taipei.has_address());
        assert_eq!(format_address(Some(&taipei)), AddressResult::NotFound);

        let no_town = PlaceRecord {
            town: Some(String::new()),
            ..hualien()
        };
        assert_eq!(format_address(Some(&no_town)), AddressResult::NotFound);
    }

    #[test]
    fn test_format_lookup_success() {
        assert_eq!(
            format_lookup(Ok(Some(hualien()))).to_string(),
            "臺灣, 花蓮縣, 吉安鄉"
        );
        assert_eq!(format_lookup(Ok(None)), AddressResult::NotFound);
    }

    #[test]
    fn test_format_lookup_error_keeps_message() {
        let failure: Result<Option<PlaceRecord>> =
            Err(anyhow!("operation timed out")).context("Reverse geocoding request failed");

        let result = format_lookup(failure);

        match &result {
            AddressResult::Error(message) => {
                assert!(message.contains("Reverse geocoding request failed"));
                assert!(message.contains("operation timed out"));
            }
            other => panic!("expected an error result, got {other:?}"),
        }
        assert!(result.to_string().starts_with("發生錯誤: "));
        assert!(result.to_string().contains("operation timed out"));
    }
}
