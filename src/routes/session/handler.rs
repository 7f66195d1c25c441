use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};

use crate::AppState;
use crate::index::GeoIndexOperations;
use crate::utils::{Claims, app_error_to_response, success_to_api_response};

use super::model::SignOutResponse;

#[axum::debug_handler]
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match GeoIndexOperations::sign_out(&state.store, &claims.sub).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(SignOutResponse {
                message: "已退出登录".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!("退出登录失败: {:?}", e);
            app_error_to_response(e)
        }
    }
}
