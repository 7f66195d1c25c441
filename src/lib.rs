use std::sync::Arc;

use config::Config;
use store::DocumentStore;

pub mod config;
pub mod error;
pub mod geo;
pub mod index;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Config,
}
