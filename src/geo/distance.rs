/// 地球半径（公里）
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine 公式计算两点间球面距离（公里）
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let d1 = distance_km(37.7749, -122.4194, 34.0522, -118.2437);
        let d2 = distance_km(34.0522, -118.2437, 37.7749, -122.4194);
        assert!((d1 - d2).abs() < 1e-9);
        // 旧金山到洛杉矶约 559 公里
        assert!(d1 > 540.0 && d1 < 580.0);
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert!(distance_km(48.8566, 2.3522, 48.8566, 2.3522).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = distance_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.19).abs() < 0.05);
    }
}
