//! Stateful protocol encoder for an out-of-process designer engine.
//!
//! The host keeps rich model objects (workspaces, units, document sources,
//! libraries) and refers to them here through opaque handles. [`Client`]
//! turns host state transitions into framed binary messages and maintains
//! the handle ↔ wire id mappings the engine relies on.
//!
//! Every public encoder operation either commits its message or rolls it
//! back; content failures (a document that does not compile, a generator
//! that throws) are collected in a [`ProblemsHolder`] instead of aborting
//! unrelated work.

pub mod client;
pub mod documents;
pub mod error;
pub mod handle;
pub mod host;
pub mod library;
pub mod method;
pub mod model;
pub mod problems;

pub use client::{Client, ClientConfig, MessageRecord, WorkspaceInfo};
pub use documents::{DocumentFactoryManager, DocumentState};
pub use error::{ClientError, Result};
pub use handle::{DocumentHandle, LibraryHandle, UnitHandle, WorkspaceHandle};
pub use host::{
    AssetClassGenerator, DocumentFactoryWriter, FactoryContext, Host, LibrarySetInitializer,
    ProblemReporter, UnsavedDocuments,
};
pub use library::{
    ApplicationDomainCreationPolicy, ItemId, Library, LibraryManager, LibrarySet,
    LibrarySetEmbedItem, LibrarySetItem,
};
pub use method::{AssetPool, ClientMethod, METHOD_CLASS};
pub use model::{
    DocumentSource, FileLocator, FileRef, LocalStyleHolder, RequiredAssetsInfo, UnitInfo,
    WindowBounds, Workspace,
};
pub use problems::{Problem, ProblemsHolder};
