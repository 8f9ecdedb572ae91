use serde::{Deserialize, Serialize};

/// Geographic coordinates in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Haversine distance in kilometers between two points.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

/// A closed polygon over geographic coordinates. Vertices are taken in order;
/// the closing edge back to the first vertex is implicit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPolygon {
    pub vertices: Vec<GeoPoint>,
}

impl GeoPolygon {
    pub fn new(vertices: Vec<GeoPoint>) -> Self {
        Self { vertices }
    }

    /// Ray-casting containment test. Points on an edge count as inside often
    /// enough for drop-zone purposes; degenerate polygons contain nothing.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.vertices.len() - 1;
        for i in 0..self.vertices.len() {
            let a = &self.vertices[i];
            let b = &self.vertices[j];
            let crosses = (a.latitude > point.latitude) != (b.latitude > point.latitude);
            if crosses {
                let intersect_lng = (b.longitude - a.longitude)
                    * (point.latitude - a.latitude)
                    / (b.latitude - a.latitude)
                    + a.longitude;
                if point.longitude < intersect_lng {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_same_point_is_zero() {
        let p = GeoPoint::new(40.7128, -74.0060);
        assert!((p.distance_km(&p) - 0.0).abs() < 0.001);
    }

    #[test]
    fn distance_nyc_to_la() {
        let nyc = GeoPoint::new(40.7128, -74.0060);
        let la = GeoPoint::new(34.0522, -118.2437);
        let dist = nyc.distance_km(&la);
        // NYC to LA is ~3944 km
        assert!((dist - 3944.0).abs() < 50.0);
    }

    fn square() -> GeoPolygon {
        GeoPolygon::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(10.0, 0.0),
        ])
    }

    #[test]
    fn polygon_contains_interior_point() {
        assert!(square().contains(&GeoPoint::new(5.0, 5.0)));
    }

    #[test]
    fn polygon_excludes_exterior_point() {
        assert!(!square().contains(&GeoPoint::new(15.0, 5.0)));
        assert!(!square().contains(&GeoPoint::new(-1.0, -1.0)));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = GeoPolygon::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]);
        assert!(!line.contains(&GeoPoint::new(0.5, 0.5)));
    }

    #[test]
    fn concave_polygon_respects_notch() {
        // L-shape: the notch at the upper right is outside.
        let l_shape = GeoPolygon::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(5.0, 10.0),
            GeoPoint::new(5.0, 5.0),
            GeoPoint::new(10.0, 5.0),
            GeoPoint::new(10.0, 0.0),
        ]);
        assert!(l_shape.contains(&GeoPoint::new(2.0, 2.0)));
        assert!(!l_shape.contains(&GeoPoint::new(8.0, 8.0)));
    }
}
