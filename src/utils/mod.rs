use axum::Json;
use axum::http::StatusCode;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;
use crate::store::StoreError;

/// 通用的API响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 错误码，0表示成功
    pub code: i32,
    /// 错误消息，成功时为"success"
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub exp: i64,    // 过期时间
    pub iat: i64,    // 签发时间
}

/// 校验身份令牌。令牌签发由身份服务负责，这里只做验签
pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

/// 把核心层错误映射为状态码加响应体
pub fn app_error_to_response<T>(err: AppError) -> (StatusCode, Json<ApiResponse<T>>) {
    match err {
        AppError::InvalidArgument(msg) => (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::INVALID_ARGUMENT, msg),
        ),
        AppError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::UNAUTHENTICATED, "未认证的请求".to_string()),
        ),
        AppError::UserProfileNotFound(user_id) => {
            tracing::warn!("user profile missing: {}", user_id);
            (
                StatusCode::NOT_FOUND,
                error_to_api_response(
                    error_codes::PROFILE_NOT_FOUND,
                    "用户资料不存在".to_string(),
                ),
            )
        }
        AppError::InvalidGeohash(e) => {
            // 存储里出现坏 geohash 属于数据完整性故障
            tracing::error!("invalid stored geohash: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::DATA_INTEGRITY, "位置索引数据异常".to_string()),
            )
        }
        AppError::Store(StoreError::Unavailable(reason)) => {
            tracing::error!("backing store unavailable: {}", reason);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                error_to_api_response(
                    error_codes::STORE_UNAVAILABLE,
                    "存储服务暂不可用".to_string(),
                ),
            )
        }
        AppError::Store(e) => {
            tracing::error!("store operation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string()),
            )
        }
    }
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_ARGUMENT: i32 = 1000;
    pub const UNAUTHENTICATED: i32 = 1001;
    pub const PROFILE_NOT_FOUND: i32 = 1002;
    pub const RATE_LIMIT: i32 = 1005;
    pub const DATA_INTEGRITY: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_UNAVAILABLE: i32 = 5001;
}
