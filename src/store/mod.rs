//! Remote document capability.
//!
//! The store owns transport and persistence of canvases. The reconciliation
//! core only fetches markup, replaces a canvas with canonical text, and (for
//! the surrounding tools) looks up destinations a canvas can live in.

use std::io;
use std::iter::FusedIterator;
use std::path::PathBuf;

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "dirstore")]
mod directory;
#[cfg(feature = "dirstore")]
pub use directory::DirectoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("destination not found: {0}")]
    UnknownDestination(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid page cursor: {0}")]
    InvalidCursor(String),
    #[error("store root does not exist: {}", .0.display())]
    MissingRoot(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A place a canvas can be attached to, such as a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationPage {
    pub destinations: Vec<Destination>,
    /// Continuation token; `None` or empty ends the listing.
    pub next_cursor: Option<String>,
}

pub trait RemoteDocumentStore {
    /// Raw markup of the canvas.
    fn fetch(&self, document_id: &str) -> Result<String, StoreError>;

    /// Replaces the whole canvas with canonical text in a single call.
    fn replace(&self, document_id: &str, canonical_text: &str) -> Result<(), StoreError>;

    fn list_destinations(&self, cursor: Option<&str>) -> Result<DestinationPage, StoreError>;

    /// First canvas attached to a destination.
    fn document_for(&self, destination_id: &str) -> Result<Option<String>, StoreError>;

    /// Creates a canvas attached to a destination and returns its id.
    fn create(&self, destination_id: &str, canonical_text: &str) -> Result<String, StoreError>;

    fn destinations(&self) -> Pages<'_, Self> {
        Pages::new(self)
    }

    /// Resolves a destination name (with or without a leading `#`) or a
    /// literal destination id.
    fn resolve_destination(&self, name: &str) -> Result<Option<String>, StoreError> {
        let name = name.trim_start_matches('#');
        if looks_like_destination_id(name) {
            return Ok(Some(name.to_string()));
        }
        for page in self.destinations() {
            if let Some(found) = page?.destinations.into_iter().find(|d| d.name == name) {
                return Ok(Some(found.id));
            }
        }
        Ok(None)
    }
}

impl<S: RemoteDocumentStore + ?Sized> RemoteDocumentStore for &S {
    fn fetch(&self, document_id: &str) -> Result<String, StoreError> {
        (**self).fetch(document_id)
    }

    fn replace(&self, document_id: &str, canonical_text: &str) -> Result<(), StoreError> {
        (**self).replace(document_id, canonical_text)
    }

    fn list_destinations(&self, cursor: Option<&str>) -> Result<DestinationPage, StoreError> {
        (**self).list_destinations(cursor)
    }

    fn document_for(&self, destination_id: &str) -> Result<Option<String>, StoreError> {
        (**self).document_for(destination_id)
    }

    fn create(&self, destination_id: &str, canonical_text: &str) -> Result<String, StoreError> {
        (**self).create(destination_id, canonical_text)
    }
}

/// Destination ids are a `C` followed by upper-case letters and digits.
pub fn looks_like_destination_id(value: &str) -> bool {
    value.len() > 1
        && value.starts_with('C')
        && value[1..]
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Lazy listing of destination pages. Stops after the page without a
/// continuation cursor, or after the first error. Calling
/// [`RemoteDocumentStore::destinations`] again restarts from the first page.
pub struct Pages<'a, S: ?Sized> {
    store: &'a S,
    cursor: Option<String>,
    finished: bool,
}

impl<'a, S: RemoteDocumentStore + ?Sized> Pages<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            cursor: None,
            finished: false,
        }
    }
}

impl<S: RemoteDocumentStore + ?Sized> Iterator for Pages<'_, S> {
    type Item = Result<DestinationPage, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.store.list_destinations(self.cursor.as_deref()) {
            Ok(page) => {
                self.cursor = page.next_cursor.clone().filter(|c| !c.is_empty());
                self.finished = self.cursor.is_none();
                Some(Ok(page))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl<S: RemoteDocumentStore + ?Sized> FusedIterator for Pages<'_, S> {}

/// Cursor-offset slicing shared by the bundled stores.
pub(crate) fn page_of(
    destinations: &[Destination],
    cursor: Option<&str>,
    page_size: usize,
) -> Result<DestinationPage, StoreError> {
    let start = match cursor {
        None => 0,
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|&offset| offset <= destinations.len())
            .ok_or_else(|| StoreError::InvalidCursor(raw.to_string()))?,
    };
    let end = (start + page_size.max(1)).min(destinations.len());
    let next_cursor = (end < destinations.len()).then(|| end.to_string());
    Ok(DestinationPage {
        destinations: destinations[start..end].to_vec(),
        next_cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_channels(count: usize, page_size: usize) -> MemoryStore {
        let mut store = MemoryStore::new().with_page_size(page_size);
        for index in 0..count {
            store = store.with_destination(&format!("C{index:04}"), &format!("chan-{index}"));
        }
        store
    }

    #[test]
    fn test_pages_stop_when_cursor_runs_out() {
        let store = store_with_channels(5, 2);
        let pages: Vec<_> = store.destinations().collect::<Result<_, _>>().unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].destinations.len(), 1);
        assert_eq!(pages[2].next_cursor, None);
        assert_eq!(store.list_calls(), 3);
    }

    #[test]
    fn test_pages_are_lazy_and_restartable() {
        let store = store_with_channels(6, 2);
        let first = store.destinations().next().unwrap().unwrap();
        assert_eq!(first.destinations[0].name, "chan-0");
        assert_eq!(store.list_calls(), 1);

        let again = store.destinations().next().unwrap().unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_empty_cursor_ends_listing() {
        struct EmptyCursor;
        impl RemoteDocumentStore for EmptyCursor {
            fn fetch(&self, id: &str) -> Result<String, StoreError> {
                Err(StoreError::NotFound(id.into()))
            }
            fn replace(&self, id: &str, _: &str) -> Result<(), StoreError> {
                Err(StoreError::NotFound(id.into()))
            }
            fn list_destinations(&self, _: Option<&str>) -> Result<DestinationPage, StoreError> {
                Ok(DestinationPage {
                    destinations: vec![],
                    next_cursor: Some(String::new()),
                })
            }
            fn document_for(&self, _: &str) -> Result<Option<String>, StoreError> {
                Ok(None)
            }
            fn create(&self, id: &str, _: &str) -> Result<String, StoreError> {
                Err(StoreError::UnknownDestination(id.into()))
            }
        }
        assert_eq!(EmptyCursor.destinations().count(), 1);
        assert_eq!(EmptyCursor.resolve_destination("general").unwrap(), None);
    }

    #[test]
    fn test_listing_stops_after_error() {
        let store = store_with_channels(3, 1).with_list_failure("rate limited");
        let results: Vec<_> = store.destinations().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_resolve_destination_scans_pages() {
        let store = store_with_channels(7, 3);
        assert_eq!(
            store.resolve_destination("#chan-5").unwrap(),
            Some("C0005".to_string())
        );
        assert_eq!(store.list_calls(), 2);
        assert_eq!(store.resolve_destination("missing").unwrap(), None);
    }

    #[test]
    fn test_resolve_destination_accepts_literal_ids() {
        let store = store_with_channels(1, 10);
        assert_eq!(
            store.resolve_destination("C0ABC123").unwrap(),
            Some("C0ABC123".to_string())
        );
        assert_eq!(store.list_calls(), 0);
        // Lower-case names that happen to start with C are names.
        assert_eq!(store.resolve_destination("Cats").unwrap(), None);
    }

    #[test]
    fn test_destination_id_shape() {
        assert!(looks_like_destination_id("C123"));
        assert!(!looks_like_destination_id("C"));
        assert!(!looks_like_destination_id("general"));
        assert!(!looks_like_destination_id("C12-3"));
    }

    #[test]
    fn test_invalid_cursor_is_rejected() {
        let store = store_with_channels(2, 1);
        assert!(matches!(
            store.list_destinations(Some("nope")),
            Err(StoreError::InvalidCursor(_))
        ));
        assert!(matches!(
            store.list_destinations(Some("9")),
            Err(StoreError::InvalidCursor(_))
        ));
    }
}
