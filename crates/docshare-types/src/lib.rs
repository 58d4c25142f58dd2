pub mod api;
pub mod models;

pub use api::ApiResponse;
pub use models::BlockReference;
