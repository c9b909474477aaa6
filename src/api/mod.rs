//! Mix REST API access
//!
//! One request per call: a bearer token from the session's token store, a
//! JSON or multipart payload, and either the parsed response or a typed error.

pub mod client;
pub mod constants;
pub mod error;
pub mod response;

pub use client::{MixClient, RequestBody};
pub use error::ApiError;
