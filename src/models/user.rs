use serde::{Deserialize, Serialize};

use super::Coordinate;
use crate::geo;

/// 公开资料（users_public），索引条目的冗余字段来源
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default = "default_mood")]
    pub mood_temperature: String,
}

fn default_mood() -> String {
    "neutral".to_string()
}

/// 私有资料（users_private）。文档可能只含部分字段，全部走默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivateProfile {
    #[serde(default)]
    pub current_geo_index_path: Option<String>,
    #[serde(default)]
    pub privacy_settings: PrivacySettings,
    #[serde(default)]
    pub connections: Connections,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_active: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacySettings {
    #[serde(default)]
    pub ghost_mode: bool,
    #[serde(default)]
    pub privacy_zones: Vec<PrivacyZone>,
}

impl PrivacySettings {
    /// 返回包含该坐标的第一个隐私区域
    pub fn zone_containing(&self, coordinate: Coordinate) -> Option<&PrivacyZone> {
        self.privacy_zones.iter().find(|zone| {
            let meters = geo::distance_km(
                coordinate.latitude,
                coordinate.longitude,
                zone.center.latitude,
                zone.center.longitude,
            ) * 1000.0;
            meters <= zone.radius_meters
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyZone {
    pub zone_id: String,
    pub name: String,
    pub center: Coordinate,
    pub radius_meters: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connections {
    #[serde(default)]
    pub blocked_by: Vec<String>,
}

/// 写入索引条目的展示字段，避免查询结果二次取资料
#[derive(Debug, Clone)]
pub struct DenormalizedFields {
    pub display_name: String,
    pub profile_image_url: String,
    pub mood_temperature: String,
}

impl From<&PublicProfile> for DenormalizedFields {
    fn from(profile: &PublicProfile) -> Self {
        Self {
            display_name: profile.display_name.clone(),
            profile_image_url: profile.photo_url.clone(),
            mood_temperature: profile.mood_temperature.clone(),
        }
    }
}
