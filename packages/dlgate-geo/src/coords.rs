//! Static bounding-box test for "is this coordinate in mainland China".
//!
//! Coarse by design: one outer box covering the mainland, minus explicit
//! exclusion boxes for Hong Kong, Macau and Taiwan. Points inside an
//! exclusion box classify as non-mainland.

struct BoundingBox {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
}

impl BoundingBox {
    const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude > self.lat_min
            && latitude < self.lat_max
            && longitude > self.lon_min
            && longitude < self.lon_max
    }
}

const MAINLAND: BoundingBox = BoundingBox::new(18.0, 54.0, 73.0, 136.0);

const HONG_KONG: BoundingBox = BoundingBox::new(21.5, 22.9, 113.8, 114.6);
const MACAU: BoundingBox = BoundingBox::new(22.0, 22.4, 113.3, 113.7);
const TAIWAN: BoundingBox = BoundingBox::new(21.8, 25.3, 120.0, 121.9);

const EXCLUSIONS: [BoundingBox; 3] = [HONG_KONG, MACAU, TAIWAN];

pub fn is_coordinate_in_mainland(latitude: f64, longitude: f64) -> bool {
    if !(MAINLAND.lat_min..=MAINLAND.lat_max).contains(&latitude) {
        return false;
    }
    if !(MAINLAND.lon_min..=MAINLAND.lon_max).contains(&longitude) {
        return false;
    }
    !EXCLUSIONS
        .iter()
        .any(|region| region.contains(latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainland_points() {
        // Beijing, Shanghai, Urumqi
        assert!(is_coordinate_in_mainland(39.9, 116.4));
        assert!(is_coordinate_in_mainland(31.2, 121.5));
        assert!(is_coordinate_in_mainland(43.8, 87.6));
    }

    #[test]
    fn test_exclusion_boxes() {
        // Hong Kong, Macau, Taipei: inside the outer box, excluded.
        assert!(!is_coordinate_in_mainland(22.3, 114.2));
        assert!(!is_coordinate_in_mainland(22.2, 113.5));
        assert!(!is_coordinate_in_mainland(25.0, 121.5));
    }

    #[test]
    fn test_outside_outer_box() {
        // Tokyo, Sydney, London
        assert!(!is_coordinate_in_mainland(35.7, 139.7));
        assert!(!is_coordinate_in_mainland(-33.9, 151.2));
        assert!(!is_coordinate_in_mainland(51.5, -0.1));
        // Latitude inside, longitude out.
        assert!(!is_coordinate_in_mainland(40.0, 140.0));
    }
}
