mod handler;
mod model;

pub use handler::{live_nearby, query_nearby};
