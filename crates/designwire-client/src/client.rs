use std::collections::{HashSet, VecDeque};

use designwire_frame::{AmfWriter, BlockWriter, FrameError, SuspendedFrame, DEFAULT_BUFFER_CAPACITY};
use designwire_registry::{IdRegistry, RegistryConfig, StringRegistry, StringWriter};
use designwire_transport::{Transport, TransportSlot};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::documents::{DocumentFactoryManager, DocumentState};
use crate::error::{ClientError, Result};
use crate::handle::{UnitHandle, WorkspaceHandle};
use crate::host::{AssetClassGenerator, FactoryContext, Host};
use crate::library::{LibraryManager, LibrarySet};
use crate::method::{AssetPool, ClientMethod};
use crate::model::{DocumentSource, FileLocator, RequiredAssetsInfo, UnitInfo, WindowBounds, Workspace};
use crate::problems::{Problem, ProblemsHolder};

/// Construction-time settings of a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Initial capacity of the outgoing buffer.
    pub initial_buffer_capacity: usize,
    /// Capacity of every registry the client owns.
    pub registry: RegistryConfig,
    /// Record a [`MessageRecord`] per committed message.
    pub journal: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            registry: RegistryConfig::default(),
            journal: false,
        }
    }
}

/// One committed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub method: ClientMethod,
    pub len: usize,
}

/// Bookkeeping attached to a registered workspace.
#[derive(Debug, Default)]
pub struct WorkspaceInfo {
    factories: DocumentFactoryManager,
    defined_assets: Option<RequiredAssetsInfo>,
}

impl WorkspaceInfo {
    fn new(config: RegistryConfig) -> Self {
        Self {
            factories: DocumentFactoryManager::with_config(config),
            defined_assets: None,
        }
    }

    pub fn factories(&self) -> &DocumentFactoryManager {
        &self.factories
    }

    /// Asset classes declared by the most recent unit registration.
    pub fn defined_assets(&self) -> Option<&RequiredAssetsInfo> {
        self.defined_assets.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FactoryKind {
    Register,
    Update,
}

impl FactoryKind {
    fn method(self) -> ClientMethod {
        match self {
            Self::Register => ClientMethod::RegisterDocumentFactory,
            Self::Update => ClientMethod::UpdateDocumentFactory,
        }
    }
}

/// A factory message waiting for the factories it references.
struct PendingFactory {
    kind: FactoryKind,
    document: DocumentSource,
    workspace: WorkspaceHandle,
    unit_id: u16,
    factory_id: u16,
    frame: SuspendedFrame,
    payload: AmfWriter,
    references: VecDeque<DocumentSource>,
}

/// Protocol encoder for one engine connection.
///
/// Owns the outgoing buffer and every registry whose ids appear on the wire.
/// Each operation writes one framed message (or a dependency-ordered batch)
/// and either commits it or leaves the buffer exactly as it found it.
pub struct Client {
    block: BlockWriter,
    strings: StringRegistry,
    session: StringWriter,
    units: IdRegistry<UnitHandle, UnitInfo>,
    workspaces: IdRegistry<WorkspaceHandle, WorkspaceInfo>,
    libraries: LibraryManager,
    config: ClientConfig,
    journal: Vec<MessageRecord>,
}

impl Client {
    /// A client with no transport attached yet; see [`set_out`](Self::set_out).
    pub fn new(config: ClientConfig) -> Self {
        Self::with_slot(config, TransportSlot::new())
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self::with_slot(config, TransportSlot::with_transport(transport))
    }

    pub fn with_slot(config: ClientConfig, slot: TransportSlot) -> Self {
        Self {
            block: BlockWriter::with_capacity(slot, config.initial_buffer_capacity),
            strings: StringRegistry::with_config(config.registry),
            session: StringWriter::new(),
            units: IdRegistry::with_config(config.registry),
            workspaces: IdRegistry::with_config(config.registry).cascading(),
            libraries: LibraryManager::with_config(config.registry),
            journal: Vec::new(),
            config,
        }
    }

    /// Replace the transport committed messages are flushed to.
    pub fn set_out(&mut self, transport: impl Transport + 'static) {
        self.block.set_out(Box::new(transport));
    }

    /// A handle that can drop the transport from any thread, discarding
    /// whatever was not flushed yet.
    pub fn close_handle(&self) -> TransportSlot {
        self.block.slot().clone()
    }

    /// Send committed messages to the transport.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.block.flush()?)
    }

    /// Drop all connection state: buffered bytes, the message journal, every
    /// registry and the transport. Unflushed messages are lost.
    pub fn close(&mut self) -> Result<()> {
        self.block.reset();
        self.journal.clear();
        self.units.clear();
        self.workspaces.clear();
        self.libraries.reset();
        self.strings.clear();
        self.session.reset();
        self.block.slot().close_without_flush()?;
        info!("client closed");
        Ok(())
    }

    /// Committed bytes not flushed yet.
    pub fn pending(&self) -> &[u8] {
        self.block.pending()
    }

    pub fn journal(&self) -> &[MessageRecord] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<MessageRecord> {
        std::mem::take(&mut self.journal)
    }

    // Registries

    /// Assign a wire id to a workspace before it is opened.
    pub fn register_workspace(&mut self, workspace: WorkspaceHandle) -> Result<u16> {
        let id = self
            .workspaces
            .add(workspace, WorkspaceInfo::new(self.config.registry))?;
        debug!(%workspace, id, "workspace registered");
        Ok(id)
    }

    pub fn is_workspace_registered(&self, workspace: WorkspaceHandle) -> bool {
        self.workspaces.contains(&workspace)
    }

    pub fn is_unit_registered(&self, unit: UnitHandle) -> bool {
        self.units.contains(&unit)
    }

    pub fn workspace(&self, id: u16) -> Result<WorkspaceHandle> {
        Ok(self.workspaces.element_of(id)?)
    }

    pub fn unit(&self, id: u16) -> Result<UnitHandle> {
        Ok(self.units.element_of(id)?)
    }

    pub fn workspace_id(&self, workspace: WorkspaceHandle) -> Result<u16> {
        self.workspaces
            .id_of(&workspace)
            .map_err(|_| ClientError::WorkspaceNotRegistered(workspace))
    }

    pub fn unit_id(&self, unit: UnitHandle) -> Result<u16> {
        self.units
            .id_of(&unit)
            .map_err(|_| ClientError::UnitNotRegistered(unit))
    }

    pub fn workspace_info(&self, workspace: WorkspaceHandle) -> Option<&WorkspaceInfo> {
        self.workspaces.info(&workspace)
    }

    pub fn unit_info(&self, unit: UnitHandle) -> Option<&UnitInfo> {
        self.units.info(&unit)
    }

    pub fn registered_workspaces(&self) -> impl Iterator<Item = (u16, WorkspaceHandle)> + '_ {
        self.workspaces.iter().map(|(id, workspace, _)| (id, *workspace))
    }

    pub fn registered_units(&self) -> impl Iterator<Item = (u16, UnitHandle)> + '_ {
        self.units.iter().map(|(id, unit, _)| (id, *unit))
    }

    pub fn libraries(&self) -> &LibraryManager {
        &self.libraries
    }

    pub fn strings(&self) -> &StringRegistry {
        &self.strings
    }

    /// Intern a string outside any factory; it is sent with the next unit
    /// registration or string registry update.
    pub fn intern(&mut self, value: &str) -> Result<u16> {
        Ok(self.strings.intern(value, &mut self.session)?)
    }

    /// Engine-side state of a document's factory.
    pub fn document_state(&self, document: &DocumentSource) -> DocumentState {
        self.locate(document.unit)
            .ok()
            .and_then(|(_, workspace)| self.workspaces.info(&workspace))
            .map_or(DocumentState::Unknown, |info| {
                info.factories.state(document.handle)
            })
    }

    /// Forget a workspace and the units it owns. Closing the last workspace
    /// forgets every unit.
    pub fn unregister_workspace(&mut self, workspace: WorkspaceHandle) {
        if let Some((id, mut info)) = self.workspaces.remove(&workspace) {
            info.factories.reset();
            debug!(%workspace, id, "workspace unregistered");
        }
        if self.workspaces.is_cascading() && self.workspaces.is_empty() {
            self.units.clear();
        } else {
            self.units.retain(|_, unit| unit.workspace != workspace);
        }
    }

    pub fn unregister_unit(&mut self, unit: UnitHandle) -> bool {
        self.units.remove(&unit).is_some()
    }

    // Messages

    pub fn open_workspace(&mut self, workspace: &Workspace) -> Result<()> {
        let id = self.workspace_id(workspace.handle)?;
        self.message(ClientMethod::OpenWorkspace, |this| {
            let out = this.out()?;
            out.write_short(id);
            out.write_utf(&workspace.name)?;
            WindowBounds::write_optional(workspace.window_bounds.as_ref(), out);
            Ok(())
        })?;
        self.flush()?;
        info!(workspace = %workspace.handle, id, name = %workspace.name, "workspace opened");
        Ok(())
    }

    /// Tell the engine a workspace closed. Local bookkeeping is dropped even
    /// when the message cannot be sent.
    pub fn close_workspace(&mut self, workspace: WorkspaceHandle) -> Result<()> {
        let result = self.send_close_workspace(workspace);
        self.unregister_workspace(workspace);
        result
    }

    fn send_close_workspace(&mut self, workspace: WorkspaceHandle) -> Result<()> {
        let id = self.workspace_id(workspace)?;
        self.message(ClientMethod::CloseWorkspace, |this| {
            this.out()?.write_short(id);
            Ok(())
        })?;
        self.flush()?;
        info!(%workspace, id, "workspace closed");
        Ok(())
    }

    pub fn register_library_set(&mut self, set: &LibrarySet) -> Result<()> {
        self.message(ClientMethod::RegisterLibrarySet, |this| {
            let out = this.block.frame()?;
            this.libraries.write_set(set, out)
        })?;
        debug!(set = set.id(), items = set.items().len(), "library set registered");
        Ok(())
    }

    /// Register a unit of a registered workspace. Strings interned since the
    /// last update ride along; `required` becomes the workspace's defined
    /// asset classes.
    pub fn register_unit<S: AsRef<str>>(
        &mut self,
        unit: UnitInfo,
        library_set_ids: &[S],
        required: Option<&RequiredAssetsInfo>,
    ) -> Result<u16> {
        let handle = unit.handle;
        let workspace = unit.workspace;
        let workspace_id = self.workspace_id(workspace)?;

        let mut assigned = None;
        let result = self.message(ClientMethod::RegisterUnit, |this| {
            let out = this.block.frame()?;
            match required {
                None => {
                    out.write_short(0);
                    out.write_short(0);
                }
                Some(assets) => {
                    out.write_count("imageCount", assets.image_count)?;
                    out.write_count("swfCount", assets.swf_count)?;
                }
            }
            this.session
                .write_to_if_started(out, &ClientMethod::UpdateStringRegistry.header())?;

            let id = this.units.add(handle, unit)?;
            assigned = Some(id);
            out.write_short(id);
            out.write_short(workspace_id);
            out.write_string_array(library_set_ids)?;

            let holders = this
                .units
                .info(&handle)
                .map(|info| info.local_style_holders.as_slice())
                .unwrap_or_default();
            out.write_count("local style holder count", holders.len())?;
            for holder in holders {
                holder.write_to(out)?;
            }
            Ok(())
        });

        if let Err(err) = result {
            if assigned.is_some() {
                self.units.remove(&handle);
            }
            return Err(err);
        }

        if let Some(assets) = required {
            if let Some(info) = self.workspaces.info_mut(&workspace) {
                info.defined_assets = Some(*assets);
            }
        }
        self.session.reset();
        let id = self.unit_id(handle)?;
        debug!(unit = %handle, id, %workspace, "unit registered");
        Ok(id)
    }

    /// Open a document, discarding problems and asset requirements.
    pub fn open_document(&mut self, host: &mut dyn Host, document: &DocumentSource) -> Result<bool> {
        self.open_document_with(
            host,
            document,
            false,
            &mut ProblemsHolder::new(),
            &mut RequiredAssetsInfo::default(),
        )
    }

    /// Open a document, registering its factory (and the factories it
    /// references) first if needed.
    ///
    /// A registered document with unsaved edits is updated in place instead
    /// and no openDocument message is sent. Returns `false` when the factory
    /// could not be registered; the reasons are in `problems`, which are
    /// reported to the host whenever non-empty.
    pub fn open_document_with(
        &mut self,
        host: &mut dyn Host,
        document: &DocumentSource,
        notify: bool,
        problems: &mut ProblemsHolder,
        required: &mut RequiredAssetsInfo,
    ) -> Result<bool> {
        let (_, workspace) = self.locate(document.unit)?;
        if self.factories(workspace)?.is_registered(document.handle)
            && host.has_unsaved_changes(document)
        {
            self.update_document_factory(host, document)?;
            return Ok(true);
        }

        let Some(factory_id) =
            self.register_document_factory_if_need(host, document, false, problems, required)?
        else {
            self.report_problems(host, workspace, problems);
            return Ok(false);
        };

        if required.image_count > 0 {
            self.fill_asset_class_pool(&mut *host, document.unit, AssetPool::Image, required.image_count, problems)?;
        }
        if required.swf_count > 0 {
            self.fill_asset_class_pool(&mut *host, document.unit, AssetPool::Swf, required.swf_count, problems)?;
        }
        self.report_problems(host, workspace, problems);

        let unit_id = self.unit_id(document.unit)?;
        self.message(ClientMethod::OpenDocument, |this| {
            let out = this.out()?;
            out.write_short(unit_id);
            out.write_short(factory_id);
            out.write_bool(notify);
            Ok(())
        })?;
        self.factories_mut(workspace)?.mark_opened(document.handle);
        self.flush()?;
        info!(document = %document.handle, factory_id, "document opened");
        Ok(true)
    }

    /// Re-send the factory of a registered document. Problems go straight to
    /// the host's reporter. Returns whether the update was committed.
    pub fn update_document_factory(&mut self, host: &mut dyn Host, document: &DocumentSource) -> Result<bool> {
        let (_, workspace) = self.locate(document.unit)?;
        let mut problems = ProblemsHolder::new();
        let mut required = RequiredAssetsInfo::default();
        let updated = self
            .run_factory_batch(host, FactoryKind::Update, document, &mut problems, &mut required)?
            .is_some();
        self.report_problems(host, workspace, &problems);
        Ok(updated)
    }

    /// Register the factory of `document` unless the engine already has it
    /// (`force` skips that check). Returns the factory id, or `None` when a
    /// content problem prevented registration.
    pub fn register_document_factory_if_need(
        &mut self,
        host: &mut dyn Host,
        document: &DocumentSource,
        force: bool,
        problems: &mut ProblemsHolder,
        required: &mut RequiredAssetsInfo,
    ) -> Result<Option<u16>> {
        if !force {
            if let Some(id) = self.registered_factory_id(document) {
                trace!(document = %document.handle, id, "factory already registered");
                return Ok(Some(id));
            }
        }
        self.run_factory_batch(host, FactoryKind::Register, document, problems, required)
    }

    /// Force-register the factories of documents referenced from `unit`.
    /// Stops at the first document that cannot be registered.
    pub fn register_document_references(
        &mut self,
        host: &mut dyn Host,
        references: &[DocumentSource],
        unit: UnitHandle,
        problems: &mut ProblemsHolder,
        required: &mut RequiredAssetsInfo,
    ) -> Result<bool> {
        for reference in references {
            self.ensure_unit_registered(host, unit, reference.unit, problems);
            if self
                .register_document_factory_if_need(host, reference, true, problems, required)?
                .is_none()
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Ask the engine to prepare `count` placeholder asset classes for a
    /// unit. A generator failure is recorded in `problems` and nothing is
    /// sent.
    pub fn fill_asset_class_pool<G: AssetClassGenerator + ?Sized>(
        &mut self,
        generator: &mut G,
        unit: UnitHandle,
        pool: AssetPool,
        count: usize,
        problems: &mut ProblemsHolder,
    ) -> Result<()> {
        let method = pool.method();
        let (unit_id, workspace) = self.locate(unit)?;
        let count = u16::try_from(count).map_err(|_| FrameError::ShortOverflow {
            field: "asset class count",
            value: count,
        })?;
        let defined = self
            .workspaces
            .info(&workspace)
            .and_then(|info| info.defined_assets);

        self.block.begin()?;
        let generated = match self.block.frame() {
            Err(err) => Err(Problem::from(err)),
            Ok(out) => {
                out.write_bytes(&method.header());
                out.write_short(unit_id);
                out.write_short(count);
                generator.generate(method, count, defined.as_ref(), out)
            }
        };
        match generated {
            Ok(()) => {
                let len = self.block.end()?;
                self.record(method, len);
            }
            Err(problem) => {
                let discarded = self.block.rollback()?;
                warn!(%method, discarded, %problem, "asset class generation failed");
                problems.push(problem);
            }
        }
        Ok(())
    }

    /// Signal that an external inline style source was qualified. Not flushed.
    pub fn qualify_external_inline_style_source(&mut self) -> Result<()> {
        self.message(ClientMethod::QualifyExternalInlineStyleSource, |_| Ok(()))?;
        Ok(())
    }

    /// Send the whole string table, replacing whatever the engine holds.
    pub fn init_string_registry(&mut self) -> Result<()> {
        self.message(ClientMethod::InitStringRegistry, |this| {
            let out = this.block.frame()?;
            this.strings.write_to(out)?;
            Ok(())
        })?;
        self.session.reset();
        Ok(())
    }

    /// Send strings interned since the last update as a message of their own.
    pub fn update_string_registry(&mut self) -> Result<()> {
        self.message(ClientMethod::UpdateStringRegistry, |this| {
            let out = this.block.frame()?;
            this.session.write_to(out)?;
            Ok(())
        })?;
        self.session.reset();
        Ok(())
    }

    // Framing

    /// Write one message: header, then `body`. Commits on success and rolls
    /// back on any error.
    fn message(
        &mut self,
        method: ClientMethod,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<usize> {
        self.block.begin()?;
        let result = self.write_header(method).and_then(|()| body(self));
        self.finish(method, result)
    }

    fn write_header(&mut self, method: ClientMethod) -> Result<()> {
        self.out()?.write_bytes(&method.header());
        Ok(())
    }

    fn finish(&mut self, method: ClientMethod, result: Result<()>) -> Result<usize> {
        match result {
            Ok(()) => {
                let len = self.block.end()?;
                self.record(method, len);
                Ok(len)
            }
            Err(err) => {
                if let Ok(discarded) = self.block.rollback() {
                    warn!(%method, discarded, error = %err, "message rolled back");
                }
                Err(err)
            }
        }
    }

    fn record(&mut self, method: ClientMethod, len: usize) {
        debug!(%method, len, "message committed");
        if self.config.journal {
            self.journal.push(MessageRecord { method, len });
        }
    }

    fn out(&mut self) -> Result<&mut AmfWriter> {
        Ok(self.block.frame()?)
    }

    fn report_problems(&self, host: &mut dyn Host, workspace: WorkspaceHandle, problems: &ProblemsHolder) {
        if problems.is_empty() {
            return;
        }
        warn!(%workspace, count = problems.len(), "reporting problems");
        host.report(workspace, problems);
    }

    // Document factories

    fn locate(&self, unit: UnitHandle) -> Result<(u16, WorkspaceHandle)> {
        let id = self.unit_id(unit)?;
        let workspace = self
            .units
            .info(&unit)
            .map(|info| info.workspace)
            .ok_or(ClientError::UnitNotRegistered(unit))?;
        Ok((id, workspace))
    }

    fn factories(&self, workspace: WorkspaceHandle) -> Result<&DocumentFactoryManager> {
        self.workspaces
            .info(&workspace)
            .map(|info| &info.factories)
            .ok_or(ClientError::WorkspaceNotRegistered(workspace))
    }

    fn factories_mut(&mut self, workspace: WorkspaceHandle) -> Result<&mut DocumentFactoryManager> {
        self.workspaces
            .info_mut(&workspace)
            .map(|info| &mut info.factories)
            .ok_or(ClientError::WorkspaceNotRegistered(workspace))
    }

    fn registered_factory_id(&self, document: &DocumentSource) -> Option<u16> {
        let (_, workspace) = self.locate(document.unit).ok()?;
        let factories = self.factories(workspace).ok()?;
        if !factories.is_registered(document.handle) {
            return None;
        }
        factories.get_id(document.handle)
    }

    /// Let the host register a unit that a referenced document lives in.
    fn ensure_unit_registered(
        &mut self,
        host: &mut dyn Host,
        requesting: UnitHandle,
        unit: UnitHandle,
        problems: &mut ProblemsHolder,
    ) {
        if unit == requesting || self.units.contains(&unit) {
            return;
        }
        debug!(%unit, %requesting, "initializing library sets of referenced unit");
        if let Err(problem) = host.init_library_sets(self, unit, problems) {
            warn!(%unit, %problem, "library set initialization failed");
            problems.push(problem);
        }
    }

    /// Run one factory batch with the session's pending strings. Strings of
    /// abandoned frames go back to the session and are sent on their own.
    fn run_factory_batch(
        &mut self,
        host: &mut dyn Host,
        kind: FactoryKind,
        document: &DocumentSource,
        problems: &mut ProblemsHolder,
        required: &mut RequiredAssetsInfo,
    ) -> Result<Option<u16>> {
        let mut strings = std::mem::take(&mut self.session);
        let result = self.factory_batch(host, kind, document, &mut strings, problems, required);
        strings.absorb(&mut self.session);
        self.session = strings;

        if matches!(result, Ok(None)) && self.session.is_started() {
            self.update_string_registry()?;
        }
        result
    }

    /// Register `document` and, depth first, every document its factory
    /// references. A factory is committed only after the factories it
    /// references, so the engine never sees a dangling reference. Each
    /// document is written at most once per batch, which also ends cycles.
    fn factory_batch(
        &mut self,
        host: &mut dyn Host,
        kind: FactoryKind,
        document: &DocumentSource,
        strings: &mut StringWriter,
        problems: &mut ProblemsHolder,
        required: &mut RequiredAssetsInfo,
    ) -> Result<Option<u16>> {
        let Some(root) = self.begin_factory(host, kind, document, strings, problems, required)? else {
            return Ok(None);
        };
        let root_id = root.factory_id;
        let mut visited = HashSet::from([document.handle]);
        let mut stack = vec![root];

        while let Some(top) = stack.last_mut() {
            let Some(reference) = top.references.pop_front() else {
                if let Some(done) = stack.pop() {
                    self.complete_factory(done, strings)?;
                }
                continue;
            };
            if !visited.insert(reference.handle) {
                trace!(document = %reference.handle, "reference already in batch");
                continue;
            }

            let requesting = top.document.unit;
            self.ensure_unit_registered(host, requesting, reference.unit, problems);
            match self.begin_factory(host, FactoryKind::Register, &reference, strings, problems, required)? {
                Some(pending) => stack.push(pending),
                None => {
                    warn!(
                        document = %reference.handle,
                        abandoned = stack.len(),
                        "referenced factory failed, batch abandoned"
                    );
                    return Ok(None);
                }
            }
        }
        Ok(Some(root_id))
    }

    /// Open a factory frame, let the host write the payload and park the
    /// frame until its references are committed.
    fn begin_factory(
        &mut self,
        host: &mut dyn Host,
        kind: FactoryKind,
        document: &DocumentSource,
        strings: &mut StringWriter,
        problems: &mut ProblemsHolder,
        required: &mut RequiredAssetsInfo,
    ) -> Result<Option<PendingFactory>> {
        let (unit_id, workspace, factory_id) = match self.reserve_factory(kind, document) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(document = %document.handle, error = %err, "cannot address factory");
                problems.push(Problem::from(err).with_source(&document.file));
                return Ok(None);
            }
        };

        self.block.begin()?;
        let mut payload = AmfWriter::new();
        let written = match self.write_factory_head(kind, unit_id, factory_id, document) {
            Err(err) => Err(Problem::from(err)),
            Ok(()) => match self.workspaces.info_mut(&workspace) {
                None => Err(Problem::from(ClientError::WorkspaceNotRegistered(workspace))),
                Some(info) => {
                    let mut cx = FactoryContext::new(
                        &mut payload,
                        &mut self.strings,
                        strings,
                        &mut info.factories,
                        problems,
                        required,
                    );
                    host.write_factory(document, &mut cx)
                }
            },
        };

        match written {
            Ok(references) => {
                let frame = self.block.suspend()?;
                Ok(Some(PendingFactory {
                    kind,
                    document: document.clone(),
                    workspace,
                    unit_id,
                    factory_id,
                    frame,
                    payload,
                    references: references.into(),
                }))
            }
            Err(problem) => {
                let discarded = self.block.rollback()?;
                warn!(document = %document.handle, discarded, %problem, "factory rolled back");
                problems.push(problem.with_source(&document.file));
                Ok(None)
            }
        }
    }

    fn reserve_factory(&mut self, kind: FactoryKind, document: &DocumentSource) -> Result<(u16, WorkspaceHandle, u16)> {
        let (unit_id, workspace) = self.locate(document.unit)?;
        let factories = self.factories_mut(workspace)?;
        let factory_id = match kind {
            FactoryKind::Register => factories.id_of(document.handle)?,
            // An allocated id is not enough: the engine must hold the factory.
            FactoryKind::Update => factories
                .get_id(document.handle)
                .filter(|_| factories.is_registered(document.handle))
                .ok_or(ClientError::DocumentNotRegistered(document.handle))?,
        };
        Ok((unit_id, workspace, factory_id))
    }

    fn write_factory_head(
        &mut self,
        kind: FactoryKind,
        unit_id: u16,
        factory_id: u16,
        document: &DocumentSource,
    ) -> Result<()> {
        let out = self.out()?;
        out.write_bytes(&kind.method().header());
        out.write_short(unit_id);
        out.write_short(factory_id);
        if kind == FactoryKind::Register {
            document.file.write_to(out)?;
            out.write_utf(&document.class_name)?;
        }
        Ok(())
    }

    /// Resume a parked factory and commit it with every string interned so
    /// far in the batch.
    fn complete_factory(&mut self, done: PendingFactory, strings: &mut StringWriter) -> Result<()> {
        let PendingFactory {
            kind,
            document,
            workspace,
            unit_id,
            factory_id,
            frame,
            payload,
            ..
        } = done;
        let method = kind.method();

        self.block.resume(frame)?;
        let result = self.out().and_then(|out| {
            strings.write_to(out)?;
            out.write_bytes(payload.as_bytes());
            if kind == FactoryKind::Update {
                out.write_bytes(&ClientMethod::UpdateDocuments.header());
                out.write_short(unit_id);
                out.write_short(factory_id);
            }
            Ok(())
        });
        self.finish(method, result)?;
        strings.reset();

        self.factories_mut(workspace)?.mark_registered(document.handle);
        debug!(document = %document.handle, factory_id, %method, "factory committed");
        Ok(())
    }
}
