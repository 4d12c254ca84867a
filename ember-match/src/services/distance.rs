/// Mean Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance in miles between two lat/lng points (degrees), via haversine.
pub fn distance_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Slack added to the radius so points exactly on it stay inside the box.
const BOUNDS_SLACK_MILES: f64 = 0.5;

/// Lat/lng rectangle enclosing every point within a radius of a center.
/// `longitude` is `None` when the circle reaches a pole or crosses the
/// antimeridian; only the latitude band applies then.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub longitude: Option<(f64, f64)>,
}

impl GeoBounds {
    pub fn around(lat: f64, lng: f64, radius_miles: f64) -> Self {
        let angular = (radius_miles + BOUNDS_SLACK_MILES) / EARTH_RADIUS_MILES;
        let d_lat = angular.to_degrees();
        let min_latitude = lat - d_lat;
        let max_latitude = lat + d_lat;

        let longitude = if min_latitude <= -90.0 || max_latitude >= 90.0 {
            None
        } else {
            let ratio = angular.sin() / lat.to_radians().cos();
            if ratio >= 1.0 {
                None
            } else {
                let d_lng = ratio.asin().to_degrees();
                let (min_lng, max_lng) = (lng - d_lng, lng + d_lng);
                (min_lng >= -180.0 && max_lng <= 180.0).then_some((min_lng, max_lng))
            }
        };

        Self {
            min_latitude: min_latitude.max(-90.0),
            max_latitude: max_latitude.min(90.0),
            longitude,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if lat < self.min_latitude || lat > self.max_latitude {
            return false;
        }
        self.longitude.map_or(true, |(min, max)| lng >= min && lng <= max)
    }
}

/// Rounds to one decimal place for display.
pub fn round_tenth(miles: f64) -> f64 {
    (miles * 10.0).round() / 10.0
}
