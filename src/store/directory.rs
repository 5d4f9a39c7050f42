use super::{Destination, DestinationPage, RemoteDocumentStore, StoreError, page_of};
use crate::doc::{StructuredDocument, render_markup};
use crate::filesync::write_atomic;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MARKUP_EXTENSION: &str = "html";
const DEFAULT_PAGE_SIZE: usize = 200;

/// Canvases kept on disk as `<root>/<channel>/<document_id>.html`.
/// Channel directories are the destinations.
#[derive(Debug)]
pub struct DirectoryStore {
    pub root: PathBuf,
    page_size: usize,
}

impl DirectoryStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StoreError::MissingRoot(root));
        }
        Ok(Self {
            root,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Markup files in the store, sorted by path.
    pub fn documents(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == MARKUP_EXTENSION)
            })
            .map(|e| e.path().to_path_buf())
    }

    fn channels(&self) -> Vec<Destination> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .map(|name| Destination {
                id: name.clone(),
                name,
            })
            .collect()
    }

    fn document_path(&self, document_id: &str) -> Option<PathBuf> {
        if !is_valid_id(document_id) {
            return None;
        }
        self.documents()
            .find(|path| path.file_stem().is_some_and(|stem| stem == document_id))
    }

    fn channel_dir(&self, destination_id: &str) -> Option<PathBuf> {
        if !is_valid_id(destination_id) {
            return None;
        }
        let dir = self.root.join(destination_id);
        dir.is_dir().then_some(dir)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

impl RemoteDocumentStore for DirectoryStore {
    fn fetch(&self, document_id: &str) -> Result<String, StoreError> {
        let path = self
            .document_path(document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
        Ok(fs::read_to_string(path)?)
    }

    fn replace(&self, document_id: &str, canonical_text: &str) -> Result<(), StoreError> {
        let path = self
            .document_path(document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
        let markup = render_markup(&StructuredDocument::from_canonical(canonical_text));
        write_atomic(&path, markup.as_bytes())?;
        Ok(())
    }

    fn list_destinations(&self, cursor: Option<&str>) -> Result<DestinationPage, StoreError> {
        page_of(&self.channels(), cursor, self.page_size)
    }

    fn document_for(&self, destination_id: &str) -> Result<Option<String>, StoreError> {
        let Some(dir) = self.channel_dir(destination_id) else {
            return Ok(None);
        };
        let first = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == MARKUP_EXTENSION)
            })
            .find_map(|e| {
                e.path()
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            });
        Ok(first)
    }

    fn create(&self, destination_id: &str, canonical_text: &str) -> Result<String, StoreError> {
        let dir = self
            .channel_dir(destination_id)
            .ok_or_else(|| StoreError::UnknownDestination(destination_id.to_string()))?;
        let mut serial = self.documents().count();
        let document_id = loop {
            serial += 1;
            let candidate = format!("F{serial:08}");
            if self.document_path(&candidate).is_none() {
                break candidate;
            }
        };
        let path = dir.join(format!("{document_id}.{MARKUP_EXTENSION}"));
        let markup = render_markup(&StructuredDocument::from_canonical(canonical_text));
        write_atomic(&path, markup.as_bytes())?;
        Ok(document_id)
    }
}
