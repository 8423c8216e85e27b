//! TWD97 to WGS84 coordinate conversion for twd97geo.
//!
//! TWD97 is Taiwan's national grid: a Transverse Mercator projection of the
//! GRS80/WGS84 ellipsoid centred on 121°E with a 0.9999 scale factor and a
//! 250 km false easting. This module inverts that projection with the
//! closed-form Krüger series, turning grid easting/northing (metres) into
//! latitude/longitude in decimal degrees.
//!
//! The series is a local expansion around the central meridian. It is accurate
//! to a few centimetres across Taiwan and nearby waters, and degrades
//! steadily the further a point lies from 121°E. Out-of-range input is not
//! clamped; it simply produces a less accurate answer.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Semi-major axis of the reference ellipsoid in metres.
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// Semi-minor axis of the reference ellipsoid in metres.
pub const SEMI_MINOR_AXIS: f64 = 6_356_752.314_245;

/// Longitude of the TWD97 central meridian in degrees.
pub const CENTRAL_MERIDIAN_DEGREES: f64 = 121.0;

/// Scale factor on the central meridian.
pub const SCALE_FACTOR: f64 = 0.9999;

/// False easting in metres.
pub const FALSE_EASTING: f64 = 250_000.0;

/// False northing in metres.
pub const FALSE_NORTHING: f64 = 0.0;

/// A point on the TWD97 grid (easting and northing in metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarCoordinate {
    /// Easting, false easting included
    pub x: f64,
    /// Northing, false northing included
    pub y: f64,
}

/// A latitude/longitude pair in decimal degrees on WGS84
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl PlanarCoordinate {
    /// The sample point used in the documentation and as the CLI example.
    pub const SAMPLE: PlanarCoordinate = PlanarCoordinate {
        x: 174_458.0,
        y: 2_525_824.0,
    };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true when both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Converts this grid point to WGS84 latitude/longitude.
    pub fn to_wgs84(&self) -> GeographicCoordinate {
        twd97_to_wgs84(self.x, self.y)
    }
}

impl fmt::Display for PlanarCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl fmt::Display for GeographicCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Converts TWD97 grid coordinates to WGS84 latitude/longitude.
///
/// `x` is the easting and `y` the northing, both in metres with the TWD97
/// false origin already applied. The computation is pure closed-form
/// arithmetic: the same input always yields the same output, and non-finite
/// input propagates as NaN rather than being reported.
pub fn twd97_to_wgs84(x: f64, y: f64) -> GeographicCoordinate {
    let a = SEMI_MAJOR_AXIS;
    let b = SEMI_MINOR_AXIS;
    let k0 = SCALE_FACTOR;
    let long_0 = CENTRAL_MERIDIAN_DEGREES * PI / 180.0;

    // First eccentricity
    let e = (1.0 - b.powi(2) / a.powi(2)).sqrt();

    let x = x - FALSE_EASTING;
    let y = y - FALSE_NORTHING;

    // Meridional arc and rectifying latitude
    let m = y / k0;
    let mu = m / (a * (1.0 - e.powi(2) / 4.0 - 3.0 * e.powi(4) / 64.0 - 5.0 * e.powi(6) / 256.0));
    let e1 = (1.0 - (1.0 - e.powi(2)).sqrt()) / (1.0 + (1.0 - e.powi(2)).sqrt());

    let j1 = 3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0;
    let j2 = 21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0;
    let j3 = 151.0 * e1.powi(3) / 96.0;
    let j4 = 1097.0 * e1.powi(4) / 512.0;

    // Footpoint latitude
    let fp = mu
        + j1 * (2.0 * mu).sin()
        + j2 * (4.0 * mu).sin()
        + j3 * (6.0 * mu).sin()
        + j4 * (8.0 * mu).sin();

    let e2 = (e * a / b).powi(2);
    let c1 = (e2 * fp.cos()).powi(2);
    let t1 = fp.tan().powi(2);
    let r1 = a * (1.0 - e.powi(2)) / (1.0 - e.powi(2) * fp.sin().powi(2)).powf(1.5);
    let n1 = a / (1.0 - e.powi(2) * fp.sin().powi(2)).sqrt();
    let d = x / (n1 * k0);

    let q1 = n1 * fp.tan() / r1;
    let q2 = d.powi(2) / 2.0;
    let q3 = (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * e2) * d.powi(4) / 24.0;
    let q4 = (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2) - 3.0 * c1.powi(2) - 252.0 * e2)
        * d.powi(6)
        / 720.0;
    let lat = fp - q1 * (q2 - q3 + q4);

    let q5 = d;
    let q6 = (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0;
    let q7 = (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * e2 + 24.0 * t1.powi(2))
        * d.powi(5)
        / 120.0;
    let lon = long_0 + (q5 - q6 + q7) / fp.cos();

    GeographicCoordinate {
        latitude: lat * 180.0 / PI,
        longitude: lon * 180.0 / PI,
    }
}
