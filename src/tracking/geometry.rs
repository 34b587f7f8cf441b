use super::Position;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two positions in meters (haversine).
pub fn distance_meters(a: Position, b: Position) -> f64 {
    let phi1 = a.x.to_radians();
    let phi2 = b.x.to_radians();
    let delta_phi = (b.x - a.x).to_radians();
    let delta_lambda = (b.y - a.y).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

fn ccw(a: Position, b: Position, c: Position) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// True when segment p1-p2 properly crosses p3-p4.
///
/// Exactly collinear configurations report false, including overlapping
/// collinear segments and degenerate (zero-length) segments.
pub fn segments_intersect(p1: Position, p2: Position, p3: Position, p4: Position) -> bool {
    ccw(p1, p3, p4) != ccw(p2, p3, p4) && ccw(p1, p2, p3) != ccw(p1, p2, p4)
}

/// Moves a position by a local north/east offset in meters.
pub fn offset_meters(origin: Position, north_m: f64, east_m: f64) -> Position {
    let d_lat = (north_m / EARTH_RADIUS_M).to_degrees();
    let d_lon = (east_m / (EARTH_RADIUS_M * origin.x.to_radians().cos())).to_degrees();
    Position::new(origin.x + d_lat, origin.y + d_lon)
}
