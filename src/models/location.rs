use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// 位置记录内嵌的采样点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// 用户当前位置记录（locations/{userId}，覆盖写入，不保留历史）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub user_id: String,
    pub location: LocationPoint,
    pub geohash: String,
    #[serde(default = "default_movement_state")]
    pub movement_state: String,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default = "default_location_method")]
    pub location_method: String,
    pub last_updated: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub in_privacy_zone: bool,
    #[serde(default)]
    pub privacy_zone_id: Option<String>,
}

fn default_movement_state() -> String {
    "stationary".to_string()
}

fn default_location_method() -> String {
    "gps".to_string()
}

/// 边界校验后的定位上报，贯穿整个写入路径的不可变值
#[derive(Debug, Clone)]
pub struct LocationUpdate {
    pub coordinate: Coordinate,
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub battery_level: Option<f64>,
    pub location_method: String,
    pub movement_state: String,
}

/// 空间索引条目（geo_index/{bucket}/users/{userId}）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIndexEntry {
    pub user_id: String,
    pub geohash: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub mood_temperature: String,
}

/// 实时位置流的一行（live_locations/{userId}，短生命周期）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveLocation {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub geohash: String,
    pub updated_at: DateTime<Utc>,
}
