use serde::Deserialize;

/// 隐私设置更新请求，缺省字段保持原值
#[derive(Debug, Deserialize)]
pub struct UpdatePrivacyRequest {
    pub ghost_mode: Option<bool>,
    pub privacy_zones: Option<Vec<PrivacyZoneInput>>,
}

#[derive(Debug, Deserialize)]
pub struct PrivacyZoneInput {
    pub zone_id: Option<String>,
    pub name: String,
    pub center: ZoneCenterInput,
    pub radius_meters: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneCenterInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
