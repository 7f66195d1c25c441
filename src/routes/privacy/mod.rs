mod handler;
mod model;

pub use handler::update_privacy_settings;
