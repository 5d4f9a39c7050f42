//! Reconciliation engine.
//!
//! One invocation walks `Fetching -> Normalizing -> Comparing` and ends in
//! `NoOp`, or parks a [`PendingWrite`] awaiting confirmation. A pending write
//! is consumed by [`ReconciliationEngine::apply`], so a plan can produce at
//! most one write. There is no version check between comparing and writing:
//! an edit made elsewhere in that window is overwritten.

use crate::config::{ConfigError, SyncConfig};
use crate::diff::Diff;
use crate::doc::{MarkupParser, StructuredDocument};
use crate::filesync::LocalText;
use crate::normalize::{canonical_text, has_differences, local_canonical};
use crate::store::{RemoteDocumentStore, StoreError};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDirection {
    /// Local file is the source of truth.
    Push,
    /// Remote canvas is the source of truth.
    Pull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Check,
    Push,
    Pull,
}

impl Action {
    pub fn direction(self) -> Option<SyncDirection> {
        match self {
            Action::Check => None,
            Action::Push => Some(SyncDirection::Push),
            Action::Pull => Some(SyncDirection::Pull),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Check => "check",
            Action::Push => "push",
            Action::Pull => "pull",
        })
    }
}

/// States of one invocation. `NoOp`, `Aborted`, `Done` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Normalizing,
    Comparing,
    NoOp,
    AwaitingConfirmation,
    Aborted,
    Writing,
    Done,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to read canvas {document_id}: {source}")]
    RemoteFetch {
        document_id: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to update canvas {document_id}: {source}")]
    RemoteWrite {
        document_id: String,
        #[source]
        source: StoreError,
    },
    #[error("local file {}: {source}", path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("project '{0}' has no canvas id")]
    UnresolvedCanvas(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    fn local(path: &Path, source: io::Error) -> Self {
        SyncError::LocalFile {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A write that has been compared and is waiting for a yes/no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    direction: SyncDirection,
    document_id: String,
    local_path: PathBuf,
    payload: String,
    diff: Diff,
}

impl PendingWrite {
    pub fn direction(&self) -> SyncDirection {
        self.direction
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    /// Exact text that will be written.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    InSync,
    Report(Diff),
    Pending(PendingWrite),
}

impl Plan {
    pub fn phase(&self) -> Phase {
        match self {
            Plan::InSync | Plan::Report(_) => Phase::NoOp,
            Plan::Pending(_) => Phase::AwaitingConfirmation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    InSync,
    Reported { diff: Diff },
    Aborted,
    Pushed { document_id: String },
    Pulled { path: PathBuf },
}

impl Outcome {
    pub fn phase(&self) -> Phase {
        match self {
            Outcome::InSync | Outcome::Reported { .. } => Phase::NoOp,
            Outcome::Aborted => Phase::Aborted,
            Outcome::Pushed { .. } | Outcome::Pulled { .. } => Phase::Done,
        }
    }
}

/// Fetches a canvas and parses it. Unparsable markup degrades to an empty
/// document so a push can still establish the canvas from scratch.
#[derive(Debug)]
pub struct DocumentFetcher<S> {
    store: S,
}

impl<S: RemoteDocumentStore> DocumentFetcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetch(&self, document_id: &str) -> Result<StructuredDocument, SyncError> {
        let markup = self
            .store
            .fetch(document_id)
            .map_err(|source| SyncError::RemoteFetch {
                document_id: document_id.to_string(),
                source,
            })?;
        match MarkupParser::parse(&markup) {
            Ok(doc) => Ok(doc),
            Err(err) => {
                warn!(document_id, error = %err, "canvas markup is malformed, treating it as empty");
                Ok(StructuredDocument::new())
            }
        }
    }
}

#[derive(Debug)]
pub struct ReconciliationEngine<S, L> {
    config: SyncConfig,
    fetcher: DocumentFetcher<S>,
    local: L,
}

impl<S: RemoteDocumentStore, L: LocalText> ReconciliationEngine<S, L> {
    pub fn new(config: SyncConfig, store: S, local: L) -> Self {
        Self {
            config,
            fetcher: DocumentFetcher::new(store),
            local,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.fetcher.store()
    }

    /// Fetches both sides and compares them. Never writes.
    pub fn plan(&self, project: &str, action: Action) -> Result<Plan, SyncError> {
        let result = self.plan_inner(project, action);
        match &result {
            Ok(plan) => debug!(project, %action, phase = ?plan.phase(), "compared"),
            Err(err) => debug!(project, %action, phase = ?Phase::Failed, error = %err),
        }
        result
    }

    fn plan_inner(&self, project: &str, action: Action) -> Result<Plan, SyncError> {
        let settings = self.config.project(project)?;
        let document_id = settings
            .canvas_id
            .clone()
            .ok_or_else(|| SyncError::UnresolvedCanvas(project.to_string()))?;
        let local_path = settings.local_path.clone();

        debug!(project, phase = ?Phase::Fetching, document_id = %document_id);
        let remote_doc = self.fetcher.fetch(&document_id)?;
        let local_raw = self
            .local
            .read_text(&local_path)
            .map_err(|source| SyncError::local(&local_path, source))?;

        debug!(project, phase = ?Phase::Normalizing, nodes = remote_doc.len());
        let remote = canonical_text(&remote_doc);
        let local = local_canonical(&local_raw);

        debug!(project, phase = ?Phase::Comparing);
        if !has_differences(&local, &remote) {
            return Ok(Plan::InSync);
        }

        let remote_label = format!("canvas ({document_id})");
        let local_label = format!("local ({})", local_path.display());
        let plan = match action.direction() {
            None => Plan::Report(Diff::between(remote_label, local_label, &remote, &local)),
            Some(SyncDirection::Push) => Plan::Pending(PendingWrite {
                direction: SyncDirection::Push,
                diff: Diff::between(remote_label, local_label, &remote, &local),
                document_id,
                local_path,
                payload: local,
            }),
            Some(SyncDirection::Pull) => Plan::Pending(PendingWrite {
                direction: SyncDirection::Pull,
                diff: Diff::between(local_label, remote_label, &local, &remote),
                document_id,
                local_path,
                payload: remote,
            }),
        };
        Ok(plan)
    }

    /// Issues the pending write when `confirmed`, otherwise nothing.
    pub fn apply(&self, pending: PendingWrite, confirmed: bool) -> Result<Outcome, SyncError> {
        if !confirmed {
            info!(document_id = %pending.document_id, phase = ?Phase::Aborted, "write declined");
            return Ok(Outcome::Aborted);
        }

        debug!(document_id = %pending.document_id, phase = ?Phase::Writing, direction = ?pending.direction);
        let outcome = match pending.direction {
            SyncDirection::Push => self
                .fetcher
                .store()
                .replace(&pending.document_id, &pending.payload)
                .map(|()| Outcome::Pushed {
                    document_id: pending.document_id.clone(),
                })
                .map_err(|source| SyncError::RemoteWrite {
                    document_id: pending.document_id.clone(),
                    source,
                }),
            SyncDirection::Pull => self
                .local
                .write_text(&pending.local_path, &pending.payload)
                .map(|()| Outcome::Pulled {
                    path: pending.local_path.clone(),
                })
                .map_err(|source| SyncError::local(&pending.local_path, source)),
        };

        match &outcome {
            Ok(done) => info!(document_id = %pending.document_id, phase = ?done.phase(), "write complete"),
            Err(err) => warn!(document_id = %pending.document_id, phase = ?Phase::Failed, error = %err),
        }
        outcome
    }

    /// Plans and, for push/pull with differences, asks `confirm` before
    /// writing. `force` answers yes without asking; comparison still runs.
    pub fn run<F>(
        &self,
        project: &str,
        action: Action,
        force: bool,
        confirm: F,
    ) -> Result<Outcome, SyncError>
    where
        F: FnOnce(&Diff) -> bool,
    {
        match self.plan(project, action)? {
            Plan::InSync => Ok(Outcome::InSync),
            Plan::Report(diff) => Ok(Outcome::Reported { diff }),
            Plan::Pending(pending) => {
                let confirmed = force || confirm(pending.diff());
                self.apply(pending, confirmed)
            }
        }
    }
}
