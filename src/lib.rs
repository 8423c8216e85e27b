//! # twd97geo
//!
//! A command-line tool that converts TWD97 grid coordinates to addresses.
//!
//! TWD97 (Taiwan Datum 1997) is the Transverse Mercator grid used by Taiwan's
//! national mapping. This crate inverts that projection to WGS84
//! latitude/longitude, asks a reverse geocoding service (Nominatim by default)
//! what is there, and formats the answer as `"<country>, <county>, <town>"`.
//!
//! ## Features
//!
//! - Closed-form TWD97 → WGS84 conversion with fixed ellipsoid constants
//! - Address formatting with distinct "not found" and "error" outcomes
//! - Pluggable geocoding through the `GeocodingService` trait
//! - Ordered batch resolution where one failed row never stops the rest
//! - YAML configuration for the geocoding endpoint, language and timeout

pub mod address;
pub mod config;
pub mod geocode;
pub mod input;
pub mod projection;
pub mod resolve;

pub use address::{AddressResult, PlaceRecord, format_address, format_lookup};
pub use projection::{GeographicCoordinate, PlanarCoordinate, twd97_to_wgs84};
