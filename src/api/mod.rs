//! HTTP surface for TVM's five wire methods (spec §6): request/response
//! DTOs, handlers, router assembly, and the server bootstrap, following
//! the teacher's `api::{handlers, routes, server}` split.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, AppState};
pub use server::start_api_server;
