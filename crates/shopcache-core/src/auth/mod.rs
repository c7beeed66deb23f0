//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: Token-based session management with automatic expiry
//! - `PreloadMarker`: the "already preloaded this session" hint
//! - `CredentialStore`: Secure OS-level credential storage via keyring
//!
//! Sessions are persisted to the cache directory and expire after 12 hours.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{PreloadMarker, Session, SessionData};
