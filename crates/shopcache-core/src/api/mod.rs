//! REST API client module for the inventory back end.
//!
//! This module provides the `ApiClient` for fetching catalog, inventory and
//! dashboard data. Requests carry a bearer token obtained from the
//! `/auth/login` endpoint.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResponse};
pub use error::ApiError;
