use designwire_registry::{IdRegistry, RegistryConfig};
use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::handle::DocumentHandle;

/// Lifecycle of one document source on the engine side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Never seen.
    Unknown,
    /// A factory id is reserved but no factory has reached the engine.
    Allocated,
    /// The engine holds the factory.
    Registered,
    /// The engine shows the document.
    Opened,
}

/// Factory ids of one workspace's document sources.
#[derive(Debug, Default)]
pub struct DocumentFactoryManager {
    factories: IdRegistry<DocumentHandle, DocumentState>,
}

impl DocumentFactoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            factories: IdRegistry::with_config(config),
        }
    }

    /// The factory id of `document`, reserving one on first sight.
    pub fn id_of(&mut self, document: DocumentHandle) -> Result<u16> {
        if let Ok(id) = self.factories.id_of(&document) {
            return Ok(id);
        }
        let id = self.factories.add(document, DocumentState::Allocated)?;
        trace!(%document, id, "factory id allocated");
        Ok(id)
    }

    /// The factory id of `document` if one was reserved.
    pub fn get_id(&self, document: DocumentHandle) -> Option<u16> {
        self.factories.id_of(&document).ok()
    }

    pub fn state(&self, document: DocumentHandle) -> DocumentState {
        self.factories
            .info(&document)
            .copied()
            .unwrap_or(DocumentState::Unknown)
    }

    /// Whether the engine already holds the factory.
    pub fn is_registered(&self, document: DocumentHandle) -> bool {
        matches!(
            self.state(document),
            DocumentState::Registered | DocumentState::Opened
        )
    }

    pub fn mark_registered(&mut self, document: DocumentHandle) {
        if let Some(state) = self.factories.info_mut(&document) {
            if *state == DocumentState::Allocated {
                *state = DocumentState::Registered;
            }
        }
    }

    pub fn mark_opened(&mut self, document: DocumentHandle) {
        if let Some(state) = self.factories.info_mut(&document) {
            *state = DocumentState::Opened;
        }
    }

    /// Forget `document`, freeing its factory id.
    pub fn unregister(&mut self, document: DocumentHandle) -> Option<u16> {
        self.factories.remove(&document).map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn reset(&mut self) {
        self.factories.clear();
    }
}
