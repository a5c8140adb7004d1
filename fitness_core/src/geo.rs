//! Great-circle distance between coordinates.

use crate::Coordinate;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let to_rad = |deg: f64| deg.to_radians();
    let dlat = to_rad(b.latitude - a.latitude);
    let dlon = to_rad(b.longitude - a.longitude);
    let h = (dlat / 2.0).sin().powi(2)
        + to_rad(a.latitude).cos() * to_rad(b.latitude).cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Sum of consecutive distances over an ordered list of coordinates
pub fn path_length<'a, I>(coords: I) -> f64
where
    I: IntoIterator<Item = &'a Coordinate>,
{
    let mut total = 0.0;
    let mut prev: Option<&Coordinate> = None;
    for c in coords {
        if let Some(p) = prev {
            total += haversine_distance(p, c);
        }
        prev = Some(c);
    }
    total
}
