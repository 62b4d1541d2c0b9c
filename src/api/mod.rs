pub mod client;
pub mod models;
pub mod resources;
pub mod transport;

pub use client::{ApiError, Gateway};
