//! Point-in-polygon geometry for report routing.
//!
//! Pure functions, no state:
//! - `point_in_ring`: horizontal-ray crossing parity for one ring
//! - `point_in_polygon`: inside the outer ring and inside no hole ring
//!
//! Rings may repeat their first point as an explicit closing point or leave
//! the closing edge implicit; both forms are accepted everywhere.

use serde::{Deserialize, Serialize};

/// A geographic coordinate, WGS84 longitude/latitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// A closed sequence of points bounding a simple region.
pub type Ring = Vec<GeoPoint>;

/// A polygon with optional holes.
///
/// `rings[0]` is the outer boundary; every following ring cuts a hole out
/// of it. A point is inside the polygon iff it is inside the outer ring and
/// inside none of the holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("ring has {got} distinct vertices, at least 3 required")]
    InvalidRing { got: usize },

    #[error("polygon has no rings")]
    EmptyPolygon,
}

impl Polygon {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    /// Reject malformed polygons early, before any membership test runs.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.rings.is_empty() {
            return Err(GeometryError::EmptyPolygon);
        }
        for ring in &self.rings {
            let got = vertex_count(ring);
            if got < 3 {
                return Err(GeometryError::InvalidRing { got });
            }
        }
        Ok(())
    }
}

/// Number of vertices participating in edges, with an explicit closing
/// duplicate dropped.
fn vertex_count(ring: &Ring) -> usize {
    match ring.split_last() {
        Some((last, rest)) if rest.len() > 1 && Some(last) == rest.first() => rest.len(),
        _ => ring.len(),
    }
}

/// Ray-casting membership test against a single ring.
///
/// Casts a horizontal ray from `point` towards +∞ along the longitude axis
/// and counts crossings of edges that strictly straddle the point's
/// latitude; an odd count means inside. Deterministic for simple convex and
/// concave rings, undefined for self-intersecting ones (caller error).
///
/// A point exactly on an edge gets whatever the strict inequalities yield;
/// there is deliberately no epsilon handling.
pub fn point_in_ring(point: GeoPoint, ring: &Ring) -> Result<bool, GeometryError> {
    let n = vertex_count(ring);
    if n < 3 {
        return Err(GeometryError::InvalidRing { got: n });
    }

    let x = point.longitude;
    let y = point.latitude;

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);

        // Edge must strictly straddle the point's latitude; the division is
        // safe because (yi > y) != (yj > y) implies yi != yj.
        if (yi > y) != (yj > y) {
            let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    Ok(inside)
}

/// Membership test against a polygon with holes.
pub fn point_in_polygon(point: GeoPoint, polygon: &Polygon) -> Result<bool, GeometryError> {
    let (outer, holes) = polygon
        .rings
        .split_first()
        .ok_or(GeometryError::EmptyPolygon)?;

    if !point_in_ring(point, outer)? {
        return Ok(false);
    }

    for hole in holes {
        if point_in_ring(point, hole)? {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(longitude: f64, latitude: f64) -> GeoPoint {
        GeoPoint::new(longitude, latitude)
    }

    /// The 10x10 square used throughout the routing tests.
    fn square() -> Ring {
        vec![p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)]
    }

    #[test]
    fn test_point_inside_square() {
        assert!(point_in_ring(p(5.0, 5.0), &square()).unwrap());
    }

    #[test]
    fn test_point_outside_square() {
        assert!(!point_in_ring(p(15.0, 15.0), &square()).unwrap());
        assert!(!point_in_ring(p(-1.0, 5.0), &square()).unwrap());
    }

    #[test]
    fn test_point_far_outside_bounding_box() {
        assert!(!point_in_ring(p(1000.0, -1000.0), &square()).unwrap());
    }

    #[test]
    fn test_explicitly_closed_ring_matches_implicit() {
        let mut closed = square();
        closed.push(closed[0]);

        for probe in [p(5.0, 5.0), p(15.0, 15.0), p(0.5, 9.5)] {
            assert_eq!(
                point_in_ring(probe, &square()).unwrap(),
                point_in_ring(probe, &closed).unwrap(),
            );
        }
    }

    #[test]
    fn test_concave_ring() {
        // U-shape: the notch between the prongs is outside.
        let ring = vec![
            p(0.0, 0.0),
            p(10.0, 0.0),
            p(10.0, 10.0),
            p(6.0, 10.0),
            p(6.0, 2.0),
            p(4.0, 2.0),
            p(4.0, 10.0),
            p(0.0, 10.0),
        ];

        assert!(point_in_ring(p(2.0, 5.0), &ring).unwrap());
        assert!(point_in_ring(p(8.0, 5.0), &ring).unwrap());
        assert!(!point_in_ring(p(5.0, 5.0), &ring).unwrap());
        assert!(point_in_ring(p(5.0, 1.0), &ring).unwrap());
    }

    #[test]
    fn test_winding_direction_is_irrelevant() {
        let mut reversed = square();
        reversed.reverse();

        for probe in [p(5.0, 5.0), p(15.0, 15.0), p(9.9, 0.1)] {
            assert_eq!(
                point_in_ring(probe, &square()).unwrap(),
                point_in_ring(probe, &reversed).unwrap(),
            );
        }
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let two_points = vec![p(0.0, 0.0), p(1.0, 1.0)];
        assert!(matches!(
            point_in_ring(p(0.5, 0.5), &two_points),
            Err(GeometryError::InvalidRing { got: 2 })
        ));

        // A "triangle" that is really a closed segment.
        let closed_segment = vec![p(0.0, 0.0), p(1.0, 1.0), p(0.0, 0.0)];
        assert!(matches!(
            point_in_ring(p(0.5, 0.5), &closed_segment),
            Err(GeometryError::InvalidRing { got: 2 })
        ));
    }

    #[test]
    fn test_polygon_without_rings_rejected() {
        let polygon = Polygon::default();
        assert!(matches!(
            point_in_polygon(p(0.0, 0.0), &polygon),
            Err(GeometryError::EmptyPolygon)
        ));
        assert!(polygon.validate().is_err());
    }

    #[test]
    fn test_polygon_with_hole() {
        let hole = vec![p(4.0, 4.0), p(4.0, 6.0), p(6.0, 6.0), p(6.0, 4.0)];
        let polygon = Polygon::new(vec![square(), hole]);

        // Inside the outer ring but inside the hole: excluded.
        assert!(!point_in_polygon(p(5.0, 5.0), &polygon).unwrap());
        // Inside the outer ring, outside the hole: included.
        assert!(point_in_polygon(p(2.0, 2.0), &polygon).unwrap());
        // Outside everything.
        assert!(!point_in_polygon(p(15.0, 15.0), &polygon).unwrap());
    }

    #[test]
    fn test_polygon_validate_reports_bad_hole() {
        let polygon = Polygon::new(vec![square(), vec![p(0.0, 0.0)]]);
        assert!(matches!(
            polygon.validate(),
            Err(GeometryError::InvalidRing { got: 1 })
        ));
    }

    /// Pins the (unspecified) membership of a point exactly on an edge so a
    /// behavior change is caught. With strict inequalities, a point on the
    /// lower horizontal edge of the square counts as inside.
    #[test]
    fn test_edge_point_behavior_is_stable() {
        assert!(point_in_ring(p(5.0, 0.0), &square()).unwrap());
    }
}
