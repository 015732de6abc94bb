//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: bearer-token session persisted to disk with a fixed expiry
//! - `CredentialStore`: OS keychain storage for remembered passwords
//!
//! Tokens expire after 60 minutes; an expired session on disk is ignored.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
