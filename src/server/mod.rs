mod api;
mod download;
pub mod dto;
pub mod response;
mod router;
mod simple;
mod upload;
pub mod validation;

pub use router::{AppState, create_router};
pub use simple::normalize_name;
