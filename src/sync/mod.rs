//! # Sync Core
//!
//! The four cooperating pieces that keep the Local Store and the Mirror
//! Store in agreement without ever making the cloud authoritative:
//!
//! - [`router`] decides, per local write, whether the record is mirrored
//! - [`engine`] is the stateless operation set over the Mirror Store
//! - [`restore`] pulls cloud chats back with last-write-wins resolution
//! - [`upload`] is the one-shot full push run when sync is first enabled
//! - [`chunking`] splits long message bodies for document-size limits

pub mod chunking;
pub mod engine;
pub mod restore;
pub mod router;
pub mod upload;

pub use chunking::{split_text, SplitText, CHUNK_PART_MAX_BYTES, TEXT_HEAD_MAX_BYTES};
pub use engine::CloudMirrorEngine;
pub use restore::{
    ChatRestoreReport, RestoreOptions, RestoreOrchestrator, RestoreResult, RestoreStatus,
};
pub use router::SyncRouter;
pub use upload::{InitialUploader, UploadStats};
