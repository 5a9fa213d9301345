//! Error handling.
//!
//! Two layers, mirroring the split the teacher draws between
//! `errors::FlowplaneError` (infrastructure) and `auth::models::AuthError`
//! (domain boundary):
//!
//! - [`TvmError`] / [`Result`]: configuration, storage, I/O, serialization.
//! - [`VendingError`]: the six wire codes the C5 `VendingMachine` returns.

pub mod types;
pub mod vending;

pub use types::{Result, TvmError};
pub use vending::VendingError;
