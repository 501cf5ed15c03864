//! Core domain logic for Notepy.
//! This crate is the single source of truth for note invariants; the CLI and
//! HTTP crates are thin adapters over [`NoteStore`].

pub mod config;
pub mod export;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod store;

pub use config::{
    AppConfig, ConfigError, ContentLayout, LoggingConfig, NotesConfig, ResourcePaths,
    ResourceStatus, ServerConfig,
};
pub use export::{ExportEnvelope, ExportFormat};
pub use logging::{init_logging, logging_status};
pub use model::note::{FormatError, Note, NoteId, NoteRecord, NoteUpdate};
pub use store::error::{EntryError, StoreError, StoreResult};
pub use store::note_store::{ImportReport, NoteDraft, NoteFilter, NoteStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
