//! Project registry.
//!
//! Maps project names to the canvas they sync with and the local task list
//! that mirrors it. Loaded from a JSON file; relative paths are taken
//! relative to the file's directory.

use crate::store::{RemoteDocumentStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "canvas-sync.json";
const DEFAULT_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_id: Option<String>,
    /// Destination the canvas is attached to; used to find the canvas when
    /// `canvas_id` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_store")]
    pub store: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

fn default_store() -> PathBuf {
    PathBuf::from("canvases")
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown project '{name}' (known: {known})")]
    UnknownProject { name: String, known: String },
    #[error("no project given and the registry has {0} projects")]
    AmbiguousProject(usize),
    #[error("project '{0}' has neither canvas_id nor channel")]
    NoTarget(String),
    #[error("channel '{0}' not found")]
    UnknownChannel(String),
    #[error("channel '{0}' has no canvas")]
    NoCanvas(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            page_size: DEFAULT_PAGE_SIZE,
            projects: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, name: &str, project: ProjectConfig) -> Self {
        self.projects.insert(name.to_string(), project);
        self
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&text, base)
    }

    pub fn from_json(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: SyncConfig = serde_json::from_str(text)?;
        config.store = base_dir.join(&config.store);
        for (name, project) in &mut config.projects {
            if project.canvas_id.is_none() && project.channel.is_none() {
                return Err(ConfigError::NoTarget(name.clone()));
            }
            project.local_path = base_dir.join(&project.local_path);
        }
        Ok(config)
    }

    pub fn project(&self, name: &str) -> Result<&ProjectConfig, ConfigError> {
        self.projects
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProject {
                name: name.to_string(),
                known: self.known_projects(),
            })
    }

    /// The explicitly named project, or the only one in the registry.
    pub fn select_project<'a>(&'a self, name: Option<&'a str>) -> Result<&'a str, ConfigError> {
        match name {
            Some(name) => self.project(name).map(|_| name),
            None if self.projects.len() == 1 => Ok(self
                .projects
                .keys()
                .next()
                .map(String::as_str)
                .unwrap_or_default()),
            None => Err(ConfigError::AmbiguousProject(self.projects.len())),
        }
    }

    /// Fills in the canvas id of a channel-only project from the store.
    pub fn resolve_canvas<S: RemoteDocumentStore + ?Sized>(
        &mut self,
        name: &str,
        store: &S,
    ) -> Result<String, ConfigError> {
        let project = self.project(name)?;
        if let Some(canvas_id) = &project.canvas_id {
            return Ok(canvas_id.clone());
        }
        let Some(channel) = project.channel.clone() else {
            return Err(ConfigError::NoTarget(name.to_string()));
        };
        let destination = store
            .resolve_destination(&channel)?
            .ok_or_else(|| ConfigError::UnknownChannel(channel.clone()))?;
        let canvas_id = store
            .document_for(&destination)?
            .ok_or(ConfigError::NoCanvas(channel))?;
        if let Some(project) = self.projects.get_mut(name) {
            project.canvas_id = Some(canvas_id.clone());
        }
        Ok(canvas_id)
    }

    fn known_projects(&self) -> String {
        self.projects.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    const SAMPLE: &str = r##"{
        "store": "remote",
        "projects": {
            "my-project": {
                "canvas_id": "F0XXXXXXXXXX",
                "local_path": "projects/my-project/TODO.md",
                "channel": "proj-my-project"
            },
            "side": { "channel": "#side", "local_path": "side.md" }
        }
    }"##;

    #[test]
    fn test_load_resolves_paths_against_config_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, SAMPLE).unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.store, dir.path().join("remote"));
        assert_eq!(config.page_size, 200);
        let project = config.project("my-project").unwrap();
        assert_eq!(project.canvas_id.as_deref(), Some("F0XXXXXXXXXX"));
        assert_eq!(
            project.local_path,
            dir.path().join("projects/my-project/TODO.md")
        );
        let side = config.project("side").unwrap();
        assert_eq!(side.channel.as_deref(), Some("#side"));
        assert_eq!(side.canvas_id, None);
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            SyncConfig::load(dir.path().join("absent.json")),
            Err(ConfigError::Read { .. })
        ));
        assert!(matches!(
            SyncConfig::from_json("{ not json", dir.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_project_without_target_is_rejected() {
        let text = r#"{ "projects": { "p": { "local_path": "x.md" } } }"#;
        assert!(matches!(
            SyncConfig::from_json(text, Path::new("")),
            Err(ConfigError::NoTarget(name)) if name == "p"
        ));
    }

    #[test]
    fn test_select_project() {
        let config = SyncConfig::from_json(SAMPLE, Path::new("")).unwrap();
        assert_eq!(config.select_project(Some("side")).unwrap(), "side");
        assert!(matches!(
            config.select_project(None),
            Err(ConfigError::AmbiguousProject(2))
        ));
        let err = config.select_project(Some("nope")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown project 'nope' (known: my-project, side)"
        );

        let single = SyncConfig::new().with_project(
            "only",
            ProjectConfig {
                canvas_id: Some("F1".into()),
                channel: None,
                local_path: "a.md".into(),
            },
        );
        assert_eq!(single.select_project(None).unwrap(), "only");
    }

    #[test]
    fn test_resolve_canvas_through_channel() {
        let mut config = SyncConfig::from_json(SAMPLE, Path::new("")).unwrap();
        let store = MemoryStore::new()
            .with_destination("C42", "side")
            .with_attachment("C42", "F777");

        assert_eq!(config.resolve_canvas("side", &store).unwrap(), "F777");
        assert_eq!(
            config.project("side").unwrap().canvas_id.as_deref(),
            Some("F777")
        );
        assert_eq!(
            config.resolve_canvas("my-project", &store).unwrap(),
            "F0XXXXXXXXXX"
        );
    }

    #[test]
    fn test_resolve_canvas_reports_missing_channel_or_canvas() {
        let mut config = SyncConfig::from_json(SAMPLE, Path::new("")).unwrap();
        let empty = MemoryStore::new();
        assert!(matches!(
            config.resolve_canvas("side", &empty),
            Err(ConfigError::UnknownChannel(_))
        ));

        let bare = MemoryStore::new().with_destination("C42", "side");
        assert!(matches!(
            config.resolve_canvas("side", &bare),
            Err(ConfigError::NoCanvas(_))
        ));
    }
}
