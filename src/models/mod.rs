mod location;
mod user;

pub use location::{GeoIndexEntry, LiveLocation, LocationPoint, LocationRecord, LocationUpdate};
pub use user::{
    Connections, DenormalizedFields, PrivacySettings, PrivacyZone, PrivateProfile, PublicProfile,
};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 经过边界校验的坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::InvalidArgument(
                "纬度必须在-90到90之间".to_string(),
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::InvalidArgument(
                "经度必须在-180到180之间".to_string(),
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}
