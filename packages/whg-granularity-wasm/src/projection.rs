//! Spherical azimuthal equidistant projection.
//!
//! Buffers are computed in metres on a plane tangent at the centre of the
//! geometry's bounding box. Distances measured from that centre are exact on
//! the sphere, so a buffered point comes back as a true geodesic disk.

use geo_types::Coord;
use std::f64::consts::PI;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

const TO_RAD: f64 = PI / 180.0;
const TO_DEG: f64 = 180.0 / PI;

#[derive(Debug, Clone, Copy)]
pub struct AzimuthalEquidistant {
    /// Centre longitude in radians
    lon0: f64,
    /// Centre latitude in radians
    lat0: f64,
    sin_lat0: f64,
    cos_lat0: f64,
}

impl AzimuthalEquidistant {
    /// Projection centred on `centre` (x = longitude, y = latitude, degrees).
    pub fn new(centre: Coord<f64>) -> Self {
        let lat0 = centre.y.clamp(-90.0, 90.0) * TO_RAD;
        Self {
            lon0: centre.x * TO_RAD,
            lat0,
            sin_lat0: lat0.sin(),
            cos_lat0: lat0.cos(),
        }
    }

    /// Geographic degrees to plane metres.
    pub fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let lat = c.y * TO_RAD;
        let dlon = c.x * TO_RAD - self.lon0;
        let (sin_lat, cos_lat) = lat.sin_cos();

        let cos_c = (self.sin_lat0 * sin_lat + self.cos_lat0 * cos_lat * dlon.cos()).clamp(-1.0, 1.0);
        let c_ang = cos_c.acos();
        // k -> 1 as the angular distance goes to zero
        let k = if c_ang.abs() < 1e-12 { 1.0 } else { c_ang / c_ang.sin() };

        Coord {
            x: EARTH_RADIUS_M * k * cos_lat * dlon.sin(),
            y: EARTH_RADIUS_M * k * (self.cos_lat0 * sin_lat - self.sin_lat0 * cos_lat * dlon.cos()),
        }
    }

    /// Plane metres back to geographic degrees.
    pub fn inverse(&self, p: Coord<f64>) -> Coord<f64> {
        let rho = p.x.hypot(p.y);
        if rho < 1e-9 {
            return Coord { x: self.lon0 * TO_DEG, y: self.lat0 * TO_DEG };
        }
        let c_ang = rho / EARTH_RADIUS_M;
        let (sin_c, cos_c) = c_ang.sin_cos();

        let lat = (cos_c * self.sin_lat0 + p.y * sin_c * self.cos_lat0 / rho).clamp(-1.0, 1.0).asin();
        let lon = self.lon0
            + (p.x * sin_c).atan2(rho * self.cos_lat0 * cos_c - p.y * self.sin_lat0 * sin_c);

        Coord { x: lon * TO_DEG, y: lat * TO_DEG }
    }
}

/// Great-circle distance in metres between two lon/lat coordinates.
pub fn haversine_m(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dlat = (b.y - a.y) * TO_RAD;
    let dlon = (b.x - a.x) * TO_RAD;
    let h = (dlat / 2.0).sin().powi(2)
        + (a.y * TO_RAD).cos() * (b.y * TO_RAD).cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
