use thiserror::Error;

use crate::geo::GeohashError;
use crate::store::StoreError;

/// 核心层错误分类，由各 handler 统一映射为响应
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated request")]
    Unauthenticated,

    #[error("user profile not found: {0}")]
    UserProfileNotFound(String),

    #[error("invalid stored geohash: {0}")]
    InvalidGeohash(#[from] GeohashError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
