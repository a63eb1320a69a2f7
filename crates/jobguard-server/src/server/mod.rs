pub mod app;
pub mod error;
pub mod render;
pub mod routes;

pub use app::*;
pub use error::ApiError;
