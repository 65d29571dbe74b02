use std::sync::Arc;

use designwire_frame::AmfWriter;
use designwire_registry::{IdRegistry, RegistryConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::handle::LibraryHandle;
use crate::model::{FileLocator, FileRef};

/// A compiled library as the engine loads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub handle: LibraryHandle,
    pub path: String,
    pub file: FileRef,
    /// Pre-encoded inheriting-styles table, written verbatim.
    #[serde(default)]
    pub inheriting_styles: Option<Vec<u8>>,
    /// Pre-encoded default style sheet, written verbatim.
    #[serde(default)]
    pub default_styles: Option<Vec<u8>>,
}

/// How the engine maps a library set onto application domains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationDomainCreationPolicy {
    #[default]
    One = 0,
    Multiple = 1,
}

/// Position of an item inside its library set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub usize);

#[derive(Debug, Clone)]
pub struct LibrarySetItem {
    pub library: Arc<Library>,
    pub filtered: bool,
    /// Items of the same set that must load first.
    pub parents: Vec<ItemId>,
}

/// An asset embedded from one of the set's items.
#[derive(Debug, Clone)]
pub struct LibrarySetEmbedItem {
    pub owner: ItemId,
    pub path: String,
}

/// A resolved collection of libraries forming one engine-side domain.
///
/// Items form a load-order DAG through [`ItemId`]s; a parent must be added
/// before the items depending on it, so every edge points backwards.
#[derive(Debug, Clone)]
pub struct LibrarySet {
    id: String,
    parent: Option<Arc<LibrarySet>>,
    policy: ApplicationDomainCreationPolicy,
    items: Vec<LibrarySetItem>,
    embed_items: Vec<LibrarySetEmbedItem>,
}

impl LibrarySet {
    pub fn new(id: impl Into<String>, policy: ApplicationDomainCreationPolicy) -> Self {
        Self {
            id: id.into(),
            parent: None,
            policy,
            items: Vec::new(),
            embed_items: Vec::new(),
        }
    }

    /// Inherit the application domain of `parent`.
    pub fn with_parent(mut self, parent: Arc<LibrarySet>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn add_item(
        &mut self,
        library: Arc<Library>,
        filtered: bool,
        parents: &[ItemId],
    ) -> Result<ItemId> {
        for parent in parents {
            self.check_item(*parent)?;
        }
        self.items.push(LibrarySetItem {
            library,
            filtered,
            parents: parents.to_vec(),
        });
        Ok(ItemId(self.items.len() - 1))
    }

    pub fn add_embed_item(&mut self, owner: ItemId, path: impl Into<String>) -> Result<()> {
        self.check_item(owner)?;
        self.embed_items.push(LibrarySetEmbedItem {
            owner,
            path: path.into(),
        });
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<&LibrarySet> {
        self.parent.as_deref()
    }

    pub fn policy(&self) -> ApplicationDomainCreationPolicy {
        self.policy
    }

    pub fn items(&self) -> &[LibrarySetItem] {
        &self.items
    }

    pub fn embed_items(&self) -> &[LibrarySetEmbedItem] {
        &self.embed_items
    }

    fn check_item(&self, item: ItemId) -> Result<()> {
        if item.0 >= self.items.len() {
            return Err(ClientError::UnknownLibrarySetItem {
                set: self.id.clone(),
                index: item.0,
            });
        }
        Ok(())
    }
}

/// Global library ids, assigned on first sight across all library sets.
#[derive(Debug, Default)]
pub struct LibraryManager {
    registry: IdRegistry<LibraryHandle, ()>,
}

impl LibraryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            registry: IdRegistry::with_config(config),
        }
    }

    pub fn is_registered(&self, library: &Library) -> bool {
        self.registry.contains(&library.handle)
    }

    pub fn add(&mut self, library: &Library) -> Result<u16> {
        Ok(self.registry.add(library.handle, ())?)
    }

    pub fn id_of(&self, library: &Library) -> Result<u16> {
        Ok(self.registry.id_of(&library.handle)?)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn reset(&mut self) {
        self.registry.clear();
    }

    /// Encode the body of a registerLibrarySet message.
    ///
    /// Libraries first seen here get their id and full payload; known ones
    /// only their id. Ids assigned by a write that fails are released again.
    pub fn write_set(&mut self, set: &LibrarySet, out: &mut AmfWriter) -> Result<()> {
        let mut added = Vec::new();
        let result = self.write_set_inner(set, out, &mut added);
        if result.is_err() {
            for handle in &added {
                self.registry.remove(handle);
            }
        }
        result
    }

    fn write_set_inner(
        &mut self,
        set: &LibrarySet,
        out: &mut AmfWriter,
        added: &mut Vec<LibraryHandle>,
    ) -> Result<()> {
        out.write_utf(set.id())?;
        match set.parent() {
            None => out.write_byte(0),
            Some(parent) => out.write_utf(parent.id())?,
        }
        out.write_byte(set.policy() as u8);

        out.write_count("library set item count", set.items().len())?;
        for item in set.items() {
            let library = &item.library;
            let registered = self.is_registered(library);
            out.write_flag_array(&[item.filtered, registered])?;

            if registered {
                out.write_short(self.id_of(library)?);
            } else {
                let id = self.add(library)?;
                added.push(library.handle);
                debug!(library = %library.handle, id, path = %library.path, "library registered");
                out.write_short(id);
                out.write_utf(&library.path)?;
                library.file.write_to(out)?;
                match &library.inheriting_styles {
                    None => out.write_short(0),
                    Some(table) => out.write_bytes(table),
                }
                match &library.default_styles {
                    None => out.write_byte(0),
                    Some(styles) => {
                        out.write_byte(1);
                        out.write_bytes(styles);
                    }
                }
            }

            out.write_count("library set parent count", item.parents.len())?;
            for parent in &item.parents {
                out.write_count("library set parent index", parent.0)?;
            }
        }

        out.write_count("library set embed count", set.embed_items().len())?;
        for embed in set.embed_items() {
            out.write_count("library set embed index", embed.owner.0)?;
            out.write_utf(&embed.path)?;
        }
        Ok(())
    }
}
