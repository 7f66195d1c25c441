use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub message: String,
}
