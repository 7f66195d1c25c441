use serde::Serialize;

use crate::index::query::{LiveNearbyUser, NearbyUser};

#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub users: Vec<NearbyUser>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct LiveNearbyResponse {
    pub users: Vec<LiveNearbyUser>,
    pub count: usize,
}
