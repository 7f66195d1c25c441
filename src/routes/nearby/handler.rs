use axum::{
    Extension,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use crate::index::query::{DEFAULT_LIMIT, ProximityQuery};
use crate::models::Coordinate;
use crate::utils::{
    Claims, app_error_to_response, error_codes, error_to_api_response, success_to_api_response,
};

use super::model::{LiveNearbyResponse, NearbyResponse};

// 默认查询半径（公里）
const DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius_km: Option<f64>,
    limit: Option<usize>,
}

fn validated_center(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Coordinate, crate::error::AppError> {
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(crate::error::AppError::InvalidArgument(
            "缺少latitude或longitude参数".to_string(),
        ));
    };
    Coordinate::new(latitude, longitude)
}

#[axum::debug_handler]
pub async fn query_nearby(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NearbyQuery>,
) -> impl IntoResponse {
    let center = match validated_center(query.latitude, query.longitude) {
        Ok(center) => center,
        Err(e) => return app_error_to_response(e),
    };

    let radius_km = query.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !(radius_km > 0.0) || radius_km > state.config.max_query_radius_km {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::INVALID_ARGUMENT,
                format!(
                    "半径必须大于0且不超过{}公里",
                    state.config.max_query_radius_km
                ),
            ),
        );
    }

    // 最多返回50条记录
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(DEFAULT_LIMIT);

    match ProximityQuery::find_nearby(&state.store, &claims.sub, center, radius_km, limit).await {
        Ok(users) => (
            StatusCode::OK,
            success_to_api_response(NearbyResponse {
                count: users.len(),
                users,
            }),
        ),
        Err(e) => {
            tracing::error!("查找附近用户错误: {:?}", e);
            app_error_to_response(e)
        }
    }
}

#[axum::debug_handler]
pub async fn live_nearby(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NearbyQuery>,
) -> impl IntoResponse {
    let center = match validated_center(query.latitude, query.longitude) {
        Ok(center) => center,
        Err(e) => return app_error_to_response(e),
    };

    let radius_km = query.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !(radius_km > 0.0) || radius_km > state.config.max_query_radius_km {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::INVALID_ARGUMENT,
                format!(
                    "半径必须大于0且不超过{}公里",
                    state.config.max_query_radius_km
                ),
            ),
        );
    }

    match ProximityQuery::find_nearby_live(&state.store, &claims.sub, center, radius_km).await {
        Ok(users) => (
            StatusCode::OK,
            success_to_api_response(LiveNearbyResponse {
                count: users.len(),
                users,
            }),
        ),
        Err(e) => {
            tracing::error!("查询实时位置流错误: {:?}", e);
            app_error_to_response(e)
        }
    }
}
