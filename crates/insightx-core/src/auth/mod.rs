//! Session credentials for the InsightX client.
//!
//! This module provides:
//! - `TokenStore`: access token, refresh token and user profile for the
//!   current session, kept in session-scoped `SessionStorage`
//! - `token`: expiry introspection of JWT access tokens
//! - `ExpiryWatcher`: periodic check that ends the session once the access
//!   token has expired
//!
//! Nothing here persists beyond the process; the default storage is memory.

pub mod store;
pub mod token;
pub mod watcher;

pub use store::{
    MemoryStorage, SessionEndReason, SessionEvent, SessionStorage, StorageError, TokenStore,
};
pub use watcher::ExpiryWatcher;
