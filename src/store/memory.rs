use super::{Destination, DestinationPage, RemoteDocumentStore, StoreError, page_of};
use crate::doc::{StructuredDocument, render_markup};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

const DEFAULT_PAGE_SIZE: usize = 200;

/// In-process store. Canvases are held as markup; writes are recorded so
/// callers can check exactly what was sent.
#[derive(Debug)]
pub struct MemoryStore {
    documents: RefCell<BTreeMap<String, String>>,
    destinations: Vec<Destination>,
    attachments: RefCell<BTreeMap<String, Vec<String>>>,
    writes: RefCell<Vec<(String, String)>>,
    list_calls: Cell<usize>,
    created: Cell<usize>,
    page_size: usize,
    fetch_failure: Option<String>,
    write_failure: Option<String>,
    list_failure: Option<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RefCell::new(BTreeMap::new()),
            destinations: Vec::new(),
            attachments: RefCell::new(BTreeMap::new()),
            writes: RefCell::new(Vec::new()),
            list_calls: Cell::new(0),
            created: Cell::new(0),
            page_size: DEFAULT_PAGE_SIZE,
            fetch_failure: None,
            write_failure: None,
            list_failure: None,
        }
    }

    pub fn with_document(self, document_id: &str, markup: &str) -> Self {
        self.documents
            .borrow_mut()
            .insert(document_id.to_string(), markup.to_string());
        self
    }

    pub fn with_destination(mut self, id: &str, name: &str) -> Self {
        self.destinations.push(Destination {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_attachment(self, destination_id: &str, document_id: &str) -> Self {
        self.attachments
            .borrow_mut()
            .entry(destination_id.to_string())
            .or_default()
            .push(document_id.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_fetch_failure(mut self, reason: &str) -> Self {
        self.fetch_failure = Some(reason.to_string());
        self
    }

    pub fn with_write_failure(mut self, reason: &str) -> Self {
        self.write_failure = Some(reason.to_string());
        self
    }

    pub fn with_list_failure(mut self, reason: &str) -> Self {
        self.list_failure = Some(reason.to_string());
        self
    }

    /// Current markup of a canvas.
    pub fn markup(&self, document_id: &str) -> Option<String> {
        self.documents.borrow().get(document_id).cloned()
    }

    /// Every `replace` call as `(document_id, canonical_text)`, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.borrow().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }
}

impl RemoteDocumentStore for MemoryStore {
    fn fetch(&self, document_id: &str) -> Result<String, StoreError> {
        if let Some(reason) = &self.fetch_failure {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        self.markup(document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))
    }

    fn replace(&self, document_id: &str, canonical_text: &str) -> Result<(), StoreError> {
        self.writes
            .borrow_mut()
            .push((document_id.to_string(), canonical_text.to_string()));
        if let Some(reason) = &self.write_failure {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        let mut documents = self.documents.borrow_mut();
        let Some(markup) = documents.get_mut(document_id) else {
            return Err(StoreError::NotFound(document_id.to_string()));
        };
        *markup = render_markup(&StructuredDocument::from_canonical(canonical_text));
        Ok(())
    }

    fn list_destinations(&self, cursor: Option<&str>) -> Result<DestinationPage, StoreError> {
        self.list_calls.set(self.list_calls.get() + 1);
        if let Some(reason) = &self.list_failure {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        page_of(&self.destinations, cursor, self.page_size)
    }

    fn document_for(&self, destination_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .attachments
            .borrow()
            .get(destination_id)
            .and_then(|documents| documents.first().cloned()))
    }

    fn create(&self, destination_id: &str, canonical_text: &str) -> Result<String, StoreError> {
        if !self.destinations.iter().any(|d| d.id == destination_id) {
            return Err(StoreError::UnknownDestination(destination_id.to_string()));
        }
        let mut documents = self.documents.borrow_mut();
        let mut serial = self.created.get();
        let document_id = loop {
            serial += 1;
            let candidate = format!("F{serial:08}");
            if !documents.contains_key(&candidate) {
                break candidate;
            }
        };
        self.created.set(serial);
        documents.insert(
            document_id.clone(),
            render_markup(&StructuredDocument::from_canonical(canonical_text)),
        );
        self.attachments
            .borrow_mut()
            .entry(destination_id.to_string())
            .or_default()
            .push(document_id.clone());
        Ok(document_id)
    }
}
