use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::index::GeoIndexOperations;
use crate::models::{Coordinate, LocationUpdate};
use crate::utils::{
    Claims, app_error_to_response, error_codes, error_to_api_response, success_to_api_response,
};

use super::model::{UpdateLocationRequest, UpdateLocationResponse};

#[axum::debug_handler]
pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateLocationRequest>,
) -> impl IntoResponse {
    // 边界校验一次，之后整条链路只见类型化的值
    let (Some(latitude), Some(longitude)) = (req.latitude, req.longitude) else {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::INVALID_ARGUMENT,
                "缺少latitude或longitude参数".to_string(),
            ),
        );
    };
    let coordinate = match Coordinate::new(latitude, longitude) {
        Ok(coordinate) => coordinate,
        Err(e) => return app_error_to_response(e),
    };

    let update = LocationUpdate {
        coordinate,
        accuracy: req.accuracy.unwrap_or(0.0),
        altitude: req.altitude,
        heading: req.heading,
        speed: req.speed,
        battery_level: req.battery_level,
        location_method: req.location_method.unwrap_or_else(|| "gps".to_string()),
        movement_state: req
            .movement_state
            .unwrap_or_else(|| "stationary".to_string()),
    };

    match GeoIndexOperations::record_location(&state.store, &claims.sub, &update).await {
        Ok(outcome) => (
            StatusCode::OK,
            success_to_api_response(UpdateLocationResponse {
                geohash: outcome.geohash,
                in_privacy_zone: outcome.in_privacy_zone,
                ghost_mode: outcome.ghost_mode,
            }),
        ),
        Err(e) => {
            tracing::error!("更新用户位置失败: {:?}", e);
            app_error_to_response(e)
        }
    }
}
