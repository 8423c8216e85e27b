//! Coordinate-to-address resolution for twd97geo.
//!
//! Ties the pieces together: a TWD97 grid point is converted to WGS84, handed
//! to a `GeocodingService`, and whatever comes back is shaped into an
//! `AddressResult`. `resolve_rows` does the same for a sequence of points,
//! keeping the input order and recording a failed row in its own result
//! instead of stopping the run.

use log::{info, warn};
use serde::Serialize;

use crate::address::{AddressResult, format_lookup};
use crate::geocode::GeocodingService;
use crate::projection::{GeographicCoordinate, PlanarCoordinate};

/// One grid point carried all the way to an address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub coordinate: PlanarCoordinate,
    pub geographic: GeographicCoordinate,
    pub address: AddressResult,
}

/// Converts a TWD97 point to WGS84 and reverse geocodes it
pub async fn twd97_to_address<S: GeocodingService>(
    service: &S,
    coordinate: PlanarCoordinate,
    language: &str,
) -> Resolved {
    let geographic = coordinate.to_wgs84();
    let lookup = service
        .reverse_geocode(geographic.latitude, geographic.longitude, language)
        .await;

    if let Err(ref err) = lookup {
        warn!("Reverse geocoding failed for {coordinate}: {err:#}");
    }

    Resolved {
        coordinate,
        geographic,
        address: format_lookup(lookup),
    }
}

/// Resolves every row in order, one lookup at a time
pub async fn resolve_rows<S: GeocodingService>(
    service: &S,
    rows: &[PlanarCoordinate],
    language: &str,
) -> Vec<Resolved> {
    let total = rows.len();
    let mut results = Vec::with_capacity(total);

    for (i, coordinate) in rows.iter().enumerate() {
        let resolved = twd97_to_address(service, *coordinate, language).await;
        info!(
            "Processing coordinate {}/{}: {} → {}",
            i + 1,
            total,
            coordinate,
            resolved.address
        );
        results.push(resolved);
    }

    results
}
