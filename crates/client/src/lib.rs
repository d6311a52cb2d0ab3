//! HTTP client for the generation gateway.
//!
//! Wraps the gateway's REST surface (reference-image upload, batch
//! submission, batch/job status, account and model queries) using
//! [`reqwest`], and defines the wire DTOs the gateway expects.

pub mod api;
pub mod wire;

pub use api::{ApiError, GatewayApi};
