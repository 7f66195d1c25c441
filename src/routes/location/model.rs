use serde::{Deserialize, Serialize};

/// 定位上报请求。经纬度必填，缺失时在边界处拒绝
#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub battery_level: Option<f64>,
    pub location_method: Option<String>,
    pub movement_state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateLocationResponse {
    pub geohash: String,
    pub in_privacy_zone: bool,
    pub ghost_mode: bool,
}
