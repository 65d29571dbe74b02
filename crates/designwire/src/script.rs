//! JSON session scripts replayed by `designwire encode`.
//!
//! A script declares the host model up front (workspaces, library sets,
//! units, documents with canned factory payloads) and then lists the steps
//! to replay against the encoder. [`ScriptHost`] answers the encoder's
//! collaborator calls from the declared model.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use designwire::client::{
    ApplicationDomainCreationPolicy, AssetClassGenerator, Client, ClientMethod, DocumentFactoryWriter,
    DocumentHandle, DocumentSource, FactoryContext, ItemId, Library, LibrarySet, LibrarySetInitializer,
    LocalStyleHolder, Problem, ProblemReporter, ProblemsHolder, RequiredAssetsInfo, UnitHandle, UnitInfo,
    UnsavedDocuments, Workspace, WorkspaceHandle,
};
use designwire::frame::AmfWriter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::exit::{client_error, io_error, script_error, CliError, CliResult, DATA_INVALID};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(default)]
    pub library_sets: Vec<LibrarySetDecl>,
    #[serde(default)]
    pub units: Vec<UnitDecl>,
    #[serde(default)]
    pub documents: Vec<DocumentDecl>,
    /// When set, every asset class generation fails with this message.
    #[serde(default)]
    pub fail_generator: Option<String>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
        Self::parse(&text).map_err(|err| CliError::new(err.code, format!("{}: {}", path.display(), err.message)))
    }

    pub fn parse(text: &str) -> CliResult<Self> {
        serde_json::from_str(text).map_err(|err| script_error("invalid session script", err))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibrarySetDecl {
    pub id: String,
    /// Id of a set declared earlier in the script.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub policy: ApplicationDomainCreationPolicy,
    #[serde(default)]
    pub items: Vec<ItemDecl>,
    #[serde(default)]
    pub embeds: Vec<EmbedDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDecl {
    pub library: Library,
    #[serde(default)]
    pub filtered: bool,
    /// Indices of earlier items of the same set.
    #[serde(default)]
    pub parents: Vec<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbedDecl {
    pub owner: usize,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitDecl {
    pub handle: UnitHandle,
    pub workspace: WorkspaceHandle,
    #[serde(default)]
    pub library_sets: Vec<String>,
    #[serde(default)]
    pub local_style_holders: Vec<LocalStyleHolder>,
    /// Asset classes the workspace declares when this unit registers.
    #[serde(default)]
    pub defined_assets: Option<RequiredAssetsInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDecl {
    #[serde(flatten)]
    pub source: DocumentSource,
    /// String constants the factory refers to, interned in order.
    #[serde(default)]
    pub strings: Vec<String>,
    /// Canned factory body, written as UTF-8 bytes after the string refs.
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub references: Vec<DocumentHandle>,
    #[serde(default)]
    pub assets: RequiredAssetsInfo,
    /// When set, writing this factory fails with the message.
    #[serde(default)]
    pub fail: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Register the workspace if needed, then open it.
    OpenWorkspace { workspace: WorkspaceHandle },
    CloseWorkspace { workspace: WorkspaceHandle },
    RegisterLibrarySet { set: String },
    /// Register the unit's library sets, then the unit.
    RegisterUnit { unit: UnitHandle },
    OpenDocument {
        document: DocumentHandle,
        #[serde(default)]
        notify: bool,
    },
    UpdateDocument { document: DocumentHandle },
    /// From now on the host reports unsaved edits for the document.
    MarkUnsaved { document: DocumentHandle },
    QualifyExternalInlineStyleSource,
    InitStringRegistry,
    UpdateStringRegistry,
    Flush,
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::OpenWorkspace { .. } => "open_workspace",
            Step::CloseWorkspace { .. } => "close_workspace",
            Step::RegisterLibrarySet { .. } => "register_library_set",
            Step::RegisterUnit { .. } => "register_unit",
            Step::OpenDocument { .. } => "open_document",
            Step::UpdateDocument { .. } => "update_document",
            Step::MarkUnsaved { .. } => "mark_unsaved",
            Step::QualifyExternalInlineStyleSource => "qualify_external_inline_style_source",
            Step::InitStringRegistry => "init_string_registry",
            Step::UpdateStringRegistry => "update_string_registry",
            Step::Flush => "flush",
        }
    }
}

/// A problem batch the encoder handed to the host's reporter.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedProblem {
    pub workspace: WorkspaceHandle,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Host collaborators backed by a [`Script`].
pub struct ScriptHost {
    workspaces: HashMap<WorkspaceHandle, Workspace>,
    sets: HashMap<String, Arc<LibrarySet>>,
    units: HashMap<UnitHandle, UnitDecl>,
    documents: HashMap<DocumentHandle, DocumentDecl>,
    registered_sets: HashSet<String>,
    unsaved: HashSet<DocumentHandle>,
    fail_generator: Option<String>,
    reported: Vec<ReportedProblem>,
}

impl ScriptHost {
    pub fn new(script: &Script) -> CliResult<Self> {
        let mut sets: HashMap<String, Arc<LibrarySet>> = HashMap::new();
        for decl in &script.library_sets {
            let set = build_library_set(decl, &sets)?;
            sets.insert(decl.id.clone(), Arc::new(set));
        }

        Ok(Self {
            workspaces: script
                .workspaces
                .iter()
                .map(|workspace| (workspace.handle, workspace.clone()))
                .collect(),
            sets,
            units: script.units.iter().map(|unit| (unit.handle, unit.clone())).collect(),
            documents: script
                .documents
                .iter()
                .map(|document| (document.source.handle, document.clone()))
                .collect(),
            registered_sets: HashSet::new(),
            unsaved: HashSet::new(),
            fail_generator: script.fail_generator.clone(),
            reported: Vec::new(),
        })
    }

    pub fn workspace(&self, handle: WorkspaceHandle) -> CliResult<&Workspace> {
        self.workspaces
            .get(&handle)
            .ok_or_else(|| undeclared(&handle.to_string()))
    }

    pub fn document(&self, handle: DocumentHandle) -> CliResult<DocumentSource> {
        self.documents
            .get(&handle)
            .map(|decl| decl.source.clone())
            .ok_or_else(|| undeclared(&handle.to_string()))
    }

    pub fn mark_unsaved(&mut self, document: DocumentHandle) {
        self.unsaved.insert(document);
    }

    pub fn take_reported(&mut self) -> Vec<ReportedProblem> {
        std::mem::take(&mut self.reported)
    }

    /// Send `id` and its ancestors, outermost first, unless already sent.
    pub fn register_library_set(&mut self, client: &mut Client, id: &str) -> CliResult<()> {
        let set = self
            .sets
            .get(id)
            .cloned()
            .ok_or_else(|| undeclared(&format!("library set {id:?}")))?;
        let mut chain = Vec::new();
        let mut next = Some(set.as_ref());
        while let Some(set) = next {
            chain.push(set);
            next = set.parent();
        }
        for set in chain.into_iter().rev() {
            if self.registered_sets.contains(set.id()) {
                continue;
            }
            client
                .register_library_set(set)
                .map_err(|err| client_error(&format!("register library set {:?}", set.id()), err))?;
            self.registered_sets.insert(set.id().to_owned());
        }
        Ok(())
    }

    /// Register the library sets of `unit`, then the unit itself.
    pub fn register_unit(&mut self, client: &mut Client, unit: UnitHandle) -> CliResult<u16> {
        let decl = self
            .units
            .get(&unit)
            .cloned()
            .ok_or_else(|| undeclared(&unit.to_string()))?;
        for id in &decl.library_sets {
            self.register_library_set(client, id)?;
        }
        let info = UnitInfo {
            handle: decl.handle,
            workspace: decl.workspace,
            local_style_holders: decl.local_style_holders,
        };
        client
            .register_unit(info, &decl.library_sets, decl.defined_assets.as_ref())
            .map_err(|err| client_error(&format!("register {unit}"), err))
    }
}

fn build_library_set(decl: &LibrarySetDecl, known: &HashMap<String, Arc<LibrarySet>>) -> CliResult<LibrarySet> {
    let mut set = LibrarySet::new(decl.id.clone(), decl.policy);
    if let Some(parent) = &decl.parent {
        let parent = known.get(parent).cloned().ok_or_else(|| {
            CliError::new(
                DATA_INVALID,
                format!("library set {:?}: parent {parent:?} must be declared before it", decl.id),
            )
        })?;
        set = set.with_parent(parent);
    }

    let context = format!("library set {:?}", decl.id);
    for item in &decl.items {
        let parents: Vec<ItemId> = item.parents.iter().copied().map(ItemId).collect();
        set.add_item(Arc::new(item.library.clone()), item.filtered, &parents)
            .map_err(|err| client_error(&context, err))?;
    }
    for embed in &decl.embeds {
        set.add_embed_item(ItemId(embed.owner), embed.path.clone())
            .map_err(|err| client_error(&context, err))?;
    }
    Ok(set)
}

fn undeclared(what: &str) -> CliError {
    CliError::new(DATA_INVALID, format!("{what} is not declared in the script"))
}

impl DocumentFactoryWriter for ScriptHost {
    fn write_factory(
        &mut self,
        document: &DocumentSource,
        cx: &mut FactoryContext<'_>,
    ) -> Result<Vec<DocumentSource>, Problem> {
        let decl = self
            .documents
            .get(&document.handle)
            .ok_or_else(|| Problem::new(format!("{} is not declared in the script", document.handle)))?;

        for value in &decl.strings {
            cx.write_string_ref(value)?;
        }
        if let Some(message) = &decl.fail {
            return Err(Problem::new(message.clone()));
        }
        cx.out().write_bytes(decl.payload.as_bytes());
        cx.required_assets().merge(&decl.assets);

        let mut references = Vec::with_capacity(decl.references.len());
        for handle in &decl.references {
            match self.documents.get(handle) {
                Some(referenced) => references.push(referenced.source.clone()),
                None => cx.report(
                    Problem::new(format!("unresolved reference to {handle}")).with_source(&document.file),
                ),
            }
        }
        debug!(document = %document.handle, references = references.len(), "factory written");
        Ok(references)
    }
}

impl AssetClassGenerator for ScriptHost {
    fn generate(
        &mut self,
        method: ClientMethod,
        count: u16,
        defined: Option<&RequiredAssetsInfo>,
        out: &mut AmfWriter,
    ) -> Result<(), Problem> {
        if let Some(message) = &self.fail_generator {
            return Err(Problem::new(message.clone()));
        }
        let (prefix, first) = match method {
            ClientMethod::FillSwfClassPool => ("SwfAsset", defined.map_or(0, |assets| assets.swf_count)),
            _ => ("ImageAsset", defined.map_or(0, |assets| assets.image_count)),
        };
        for index in first..first + usize::from(count) {
            out.write_utf(&format!("{prefix}{index}"))?;
        }
        Ok(())
    }
}

impl LibrarySetInitializer for ScriptHost {
    fn init_library_sets(
        &mut self,
        client: &mut Client,
        unit: UnitHandle,
        _problems: &mut ProblemsHolder,
    ) -> Result<(), Problem> {
        self.register_unit(client, unit)
            .map(|_| ())
            .map_err(|err| Problem::new(err.message))
    }
}

impl ProblemReporter for ScriptHost {
    fn report(&mut self, workspace: WorkspaceHandle, problems: &ProblemsHolder) {
        for problem in problems {
            warn!(%workspace, "{problem}");
            self.reported.push(ReportedProblem {
                workspace,
                message: problem.message.clone(),
                source: problem.source.as_ref().map(|file| file.presentable_url.clone()),
            });
        }
    }
}

impl UnsavedDocuments for ScriptHost {
    fn has_unsaved_changes(&self, document: &DocumentSource) -> bool {
        self.unsaved.contains(&document.handle)
    }
}
