//! canvas-sync: keep a plain-text task list and a collaborative canvas in step.
//!
//! The crate is the reconciliation core behind the `canvas-sync` CLI:
//!
//! - **Document model** - typed canvas nodes, a markup parser and renderer
//! - **Normalization** - canonical text and whitespace-insensitive comparison keys
//! - **Diff** - unified line diffs between canonical texts
//! - **Stores** - the remote document capability plus in-memory and directory backends
//! - **Engine** - check / push / pull with a single confirmation gate before any write
//!
//! # Quick Start
//!
//! ```rust
//! use canvas_sync::{MarkupParser, canonical_text};
//!
//! let doc = MarkupParser::parse("<h1>Tasks</h1><ul><li class=\"checked\">Buy milk</li></ul>")
//!     .unwrap();
//! assert_eq!(canonical_text(&doc), "# Tasks\n\n- [x] Buy milk");
//! ```
//!
//! # Features
//!
//! - `dirstore` - Enables the directory-backed remote store (default)

// Canvas document model, markup parser, and renderer
pub mod doc;

// Canonical text and comparison keys
pub mod normalize;

// Unified line diff
pub mod diff;

// Remote document capability and stores
pub mod store;

// Local file collaborator
pub mod filesync;

// Project registry
pub mod config;

// Reconciliation engine
pub mod sync;

// Re-export doc types
pub use doc::{MarkupParseError, MarkupParser, Node, StructuredDocument, render_markup};

// Re-export normalization
pub use normalize::{ComparisonKey, canonical_text, comparison_key, has_differences, local_canonical};

// Re-export diff types
pub use diff::{Diff, DiffLine, Hunk};

// Re-export store types
pub use store::{
    Destination, DestinationPage, MemoryStore, Pages, RemoteDocumentStore, StoreError,
};

#[cfg(feature = "dirstore")]
pub use store::DirectoryStore;

pub use config::{ConfigError, ProjectConfig, SyncConfig};
pub use filesync::{FsLocalText, LocalText};
pub use sync::{
    Action, DocumentFetcher, Outcome, PendingWrite, Phase, Plan, ReconciliationEngine,
    SyncDirection, SyncError,
};
