//! # ChatMirror
//!
//! A local-first sync core for chat history: the on-device store is
//! authoritative, and an optional cloud mirror carries a best-effort
//! projection for backup and restore.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CHATMIRROR MODULES                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   application write                                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌─────────────┐ always  ┌─────────────┐                                │
//! │  │ Sync Router │───────► │ Local Store │   (authoritative, SQLite)      │
//! │  │             │         └─────────────┘                                │
//! │  │ incognito?  │                ▲                                       │
//! │  └──────┬──────┘                │ writes revived copies                 │
//! │         │ no                    │                                       │
//! │         ▼                ┌──────┴──────────┐                            │
//! │  ┌─────────────┐         │     Restore     │                            │
//! │  │Cloud Mirror │◄────────│  Orchestrator   │  (LWW by updated_at,       │
//! │  │   Engine    │  pulls  └─────────────────┘   ties favor local)        │
//! │  │             │                                                        │
//! │  │ - upserts   │         ┌─────────────────┐                            │
//! │  │ - chunking  │◄────────│ Initial Upload  │  (one-shot full push)      │
//! │  │ - deletes   │  pushes └─────────────────┘                            │
//! │  └──────┬──────┘                                                        │
//! │         ▼                                                               │
//! │  ┌─────────────┐                                                        │
//! │  │ Mirror Store│   (cloud projection; never authoritative)              │
//! │  └─────────────┘                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`model`] - Local records and their cloud projections
//! - [`store`] - The authoritative on-device store (SQLite)
//! - [`mirror`] - The Mirror Store trait and in-process implementation
//! - [`sync`] - Router, engine, restore, upload, chunking
//! - [`auth`] - Identity seam consumed by the sync core
//! - [`settings`] - Sync toggle and last-sync bookkeeping
//!
//! ## Privacy Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PRIVACY ROUTING                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Incognito chats and local-only messages never leave the device:       │
//! │  the router refuses them, the engine refuses them again, and the       │
//! │  full-upload scan filters them. The only way out is the explicit,      │
//! │  one-way "move to cloud" transition.                                   │
//! │                                                                         │
//! │  Everything cloud-bound additionally requires the sync-enabled         │
//! │  predicate: a signed-in user AND the user's sync toggle, re-read       │
//! │  at every operation.                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod auth;
pub mod error;
pub mod mirror;
pub mod model;
pub mod settings;
pub mod store;
pub mod sync;
/// Wall-clock helpers shared by every timestamping site.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use error::{Error, Result};
pub use model::{Chat, ChatRole, CloudChat, CloudChatSummary, CloudMessage, Message};
pub use sync::{
    CloudMirrorEngine, InitialUploader, RestoreOptions, RestoreOrchestrator, RestoreResult,
    SyncRouter, UploadStats,
};

// ============================================================================
// CORE INSTANCE
// ============================================================================

use std::sync::Arc;

use auth::AuthProvider;
use mirror::MirrorStore;
use settings::SettingsStore;
use store::LocalStore;

/// Wires the sync core's collaborators together.
///
/// Pure dependency injection: the embedding application owns the
/// instance and its lifetime, and nothing here is process-global. Tests
/// build one per case.
pub struct SyncCore {
    local: Arc<dyn LocalStore>,
    engine: Arc<CloudMirrorEngine>,
    router: Arc<SyncRouter>,
}

impl SyncCore {
    /// Assemble the core from its four seams
    pub fn new(
        local: Arc<dyn LocalStore>,
        mirror: Arc<dyn MirrorStore>,
        auth: Arc<dyn AuthProvider>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let engine = Arc::new(CloudMirrorEngine::new(mirror, auth, settings));
        let router = Arc::new(SyncRouter::new(local.clone(), engine.clone()));
        Self {
            local,
            engine,
            router,
        }
    }

    /// The authoritative on-device store
    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    /// The mirror operation set
    pub fn engine(&self) -> &Arc<CloudMirrorEngine> {
        &self.engine
    }

    /// The per-write routing decision point
    pub fn router(&self) -> &Arc<SyncRouter> {
        &self.router
    }

    /// A fresh restore batch runner (each batch carries its own cancel
    /// flag)
    pub fn restore(&self) -> RestoreOrchestrator {
        RestoreOrchestrator::new(self.local.clone(), self.engine.clone())
    }
}
