//! Collaborators the host application supplies.
//!
//! The encoder does not know how to compile a document, which libraries a
//! unit needs or how to generate placeholder asset classes. It asks the
//! host through these traits; each returns content faults as a
//! [`Problem`] rather than aborting.

use designwire_frame::AmfWriter;
use designwire_registry::{StringRegistry, StringWriter};

use crate::client::Client;
use crate::documents::DocumentFactoryManager;
use crate::handle::{DocumentHandle, UnitHandle, WorkspaceHandle};
use crate::method::ClientMethod;
use crate::model::{DocumentSource, RequiredAssetsInfo};
use crate::problems::{Problem, ProblemsHolder};

/// What a [`DocumentFactoryWriter`] may touch while serializing one document.
pub struct FactoryContext<'a> {
    out: &'a mut AmfWriter,
    strings: &'a mut StringRegistry,
    string_writer: &'a mut StringWriter,
    factories: &'a mut DocumentFactoryManager,
    problems: &'a mut ProblemsHolder,
    required_assets: &'a mut RequiredAssetsInfo,
}

impl<'a> FactoryContext<'a> {
    pub(crate) fn new(
        out: &'a mut AmfWriter,
        strings: &'a mut StringRegistry,
        string_writer: &'a mut StringWriter,
        factories: &'a mut DocumentFactoryManager,
        problems: &'a mut ProblemsHolder,
        required_assets: &'a mut RequiredAssetsInfo,
    ) -> Self {
        Self {
            out,
            strings,
            string_writer,
            factories,
            problems,
            required_assets,
        }
    }

    /// Payload buffer of the factory being written.
    pub fn out(&mut self) -> &mut AmfWriter {
        &mut *self.out
    }

    /// Id of a shared string constant; new strings travel with the factory.
    pub fn intern(&mut self, value: &str) -> Result<u16, Problem> {
        Ok(self.strings.intern(value, &mut *self.string_writer)?)
    }

    /// Intern `value` and write its id.
    pub fn write_string_ref(&mut self, value: &str) -> Result<(), Problem> {
        let id = self.intern(value)?;
        self.out.write_short(id);
        Ok(())
    }

    /// Factory id of a referenced document in the same workspace, reserving
    /// one if needed. Return the document from `write_factory` so it gets
    /// registered.
    pub fn factory_id(&mut self, document: DocumentHandle) -> Result<u16, Problem> {
        Ok(self.factories.id_of(document)?)
    }

    pub fn is_registered(&self, document: DocumentHandle) -> bool {
        self.factories.is_registered(document)
    }

    /// Record a non-fatal problem and keep writing.
    pub fn report(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    /// Accumulator for the placeholder asset classes this document needs.
    pub fn required_assets(&mut self) -> &mut RequiredAssetsInfo {
        &mut *self.required_assets
    }
}

/// Serializes a document source into a factory payload.
pub trait DocumentFactoryWriter {
    /// Write the payload of `document` into `cx`. Returns the referenced
    /// document sources whose factories must reach the engine first.
    fn write_factory(
        &mut self,
        document: &DocumentSource,
        cx: &mut FactoryContext<'_>,
    ) -> Result<Vec<DocumentSource>, Problem>;
}

/// Generates code for placeholder asset classes.
pub trait AssetClassGenerator {
    /// Append `count` generated classes for `method` to `out`. `defined` is
    /// what the workspace declared when its unit was registered.
    fn generate(
        &mut self,
        method: ClientMethod,
        count: u16,
        defined: Option<&RequiredAssetsInfo>,
        out: &mut AmfWriter,
    ) -> Result<(), Problem>;
}

/// Resolves and registers the library sets of a unit, then the unit itself.
pub trait LibrarySetInitializer {
    fn init_library_sets(
        &mut self,
        client: &mut Client,
        unit: UnitHandle,
        problems: &mut ProblemsHolder,
    ) -> Result<(), Problem>;
}

/// Surfaces collected problems to the user.
pub trait ProblemReporter {
    /// Called only with a non-empty holder.
    fn report(&mut self, workspace: WorkspaceHandle, problems: &ProblemsHolder);
}

/// Knows which documents have unsaved edits in the host.
pub trait UnsavedDocuments {
    fn has_unsaved_changes(&self, document: &DocumentSource) -> bool;
}

/// Everything the encoder needs from the host application.
pub trait Host:
    DocumentFactoryWriter + AssetClassGenerator + LibrarySetInitializer + ProblemReporter + UnsavedDocuments
{
}

impl<T> Host for T where
    T: DocumentFactoryWriter
        + AssetClassGenerator
        + LibrarySetInitializer
        + ProblemReporter
        + UnsavedDocuments
{
}
