#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod routes;

pub use config::ServerArgs;
pub use error::ApiError;
pub use routes::router;
