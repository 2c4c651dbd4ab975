//! # Error Handling
//!
//! Error types for the chatmirror sync core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Caller Errors                                                     │
//! │  │   ├── NotFound          - Referenced chat/message absent            │
//! │  │   ├── InvalidState      - Operation not valid for current state     │
//! │  │   └── Unauthenticated   - Operation requires a signed-in user       │
//! │  │                                                                      │
//! │  ├── Mirror Errors                                                     │
//! │  │   ├── Transport         - Network/store failure from the mirror     │
//! │  │   └── Corrupted         - Chunk blob failed integrity check         │
//! │  │                                                                      │
//! │  └── Local Errors                                                      │
//! │      ├── Database          - SQLite failure in the Local Store         │
//! │      └── Serialization     - serde encode/decode failure               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//!
//! The local write path is the source of truth. Once a local write has
//! succeeded, a mirror failure must never surface to the caller: mutating
//! mirror operations catch [`Error::Transport`] at the call site and log
//! it. Read operations (fetch, restore) propagate, because their callers
//! need to know the pull failed.

use thiserror::Error;

/// Result type alias for chatmirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sync core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Referenced chat or message does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation is not valid for the record's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Operation requires a signed-in user
    #[error("Not authenticated. Sign in before syncing or restoring.")]
    Unauthenticated,

    // ========================================================================
    // Mirror Errors
    // ========================================================================
    /// Network or store failure reported by the Mirror Store
    #[error("Mirror transport failure: {0}")]
    Transport(String),

    /// Chunk blob failed its integrity check during reassembly
    #[error("Data corruption detected: {0}")]
    Corrupted(String),

    // ========================================================================
    // Local Errors
    // ========================================================================
    /// SQLite failure in the Local Store
    #[error("Database error: {0}")]
    Database(String),

    /// serde encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Check whether this error came from the mirror transport.
    ///
    /// Transport errors on the local-write-then-mirror path are swallowed
    /// and logged rather than propagated; everything else is a programming
    /// or local-storage error and must surface.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
