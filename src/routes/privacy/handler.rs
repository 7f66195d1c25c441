use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::AppState;
use crate::index::GeoIndexOperations;
use crate::models::{Coordinate, PrivacyZone};
use crate::utils::{
    Claims, app_error_to_response, error_codes, error_to_api_response, success_to_api_response,
};

use super::model::UpdatePrivacyRequest;

#[axum::debug_handler]
pub async fn update_privacy_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePrivacyRequest>,
) -> impl IntoResponse {
    // 校验隐私区域，缺失的 zone_id 由服务端补发
    let zones = match req.privacy_zones {
        Some(inputs) => {
            let mut zones = Vec::with_capacity(inputs.len());
            for input in inputs {
                if input.name.trim().is_empty() {
                    return (
                        StatusCode::BAD_REQUEST,
                        error_to_api_response(
                            error_codes::INVALID_ARGUMENT,
                            "隐私区域名称不能为空".to_string(),
                        ),
                    );
                }
                let (Some(latitude), Some(longitude)) =
                    (input.center.latitude, input.center.longitude)
                else {
                    return (
                        StatusCode::BAD_REQUEST,
                        error_to_api_response(
                            error_codes::INVALID_ARGUMENT,
                            "隐私区域中心缺少经纬度".to_string(),
                        ),
                    );
                };
                let center = match Coordinate::new(latitude, longitude) {
                    Ok(center) => center,
                    Err(e) => return app_error_to_response(e),
                };
                let radius_meters = input.radius_meters.unwrap_or(0.0);
                if !(radius_meters > 0.0) {
                    return (
                        StatusCode::BAD_REQUEST,
                        error_to_api_response(
                            error_codes::INVALID_ARGUMENT,
                            "隐私区域半径必须大于0".to_string(),
                        ),
                    );
                }

                zones.push(PrivacyZone {
                    zone_id: input
                        .zone_id
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    name: input.name,
                    center,
                    radius_meters,
                });
            }
            Some(zones)
        }
        None => None,
    };

    match GeoIndexOperations::update_privacy(&state.store, &claims.sub, req.ghost_mode, zones).await
    {
        Ok(settings) => (StatusCode::OK, success_to_api_response(settings)),
        Err(e) => {
            tracing::error!("更新隐私设置失败: {:?}", e);
            app_error_to_response(e)
        }
    }
}
