#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use designwire_client::{
    AssetClassGenerator, Client, ClientConfig, ClientMethod, DocumentFactoryWriter,
    DocumentHandle, DocumentSource, FactoryContext, FileRef, LibrarySetInitializer, MessageRecord,
    Problem, ProblemReporter, ProblemsHolder, RequiredAssetsInfo, UnitHandle, UnitInfo,
    UnsavedDocuments, WorkspaceHandle,
};
use designwire_frame::AmfWriter;
use designwire_transport::MemoryTransport;

/// Host whose answers are set up by each test.
#[derive(Default)]
pub struct ScriptedHost {
    pub payloads: HashMap<DocumentHandle, Vec<u8>>,
    pub strings: HashMap<DocumentHandle, Vec<String>>,
    pub references: HashMap<DocumentHandle, Vec<DocumentSource>>,
    pub assets: HashMap<DocumentHandle, RequiredAssetsInfo>,
    pub failing: HashSet<DocumentHandle>,
    pub unsaved: HashSet<DocumentHandle>,
    pub failing_generator: bool,
    /// Units `init_library_sets` may register.
    pub known_units: HashMap<UnitHandle, UnitInfo>,

    pub written: Vec<DocumentHandle>,
    pub initialized: Vec<UnitHandle>,
    pub reported: Vec<(WorkspaceHandle, Vec<Problem>)>,
}

impl DocumentFactoryWriter for ScriptedHost {
    fn write_factory(
        &mut self,
        document: &DocumentSource,
        cx: &mut FactoryContext<'_>,
    ) -> Result<Vec<DocumentSource>, Problem> {
        self.written.push(document.handle);
        for value in self.strings.get(&document.handle).cloned().unwrap_or_default() {
            cx.write_string_ref(&value)?;
        }
        if self.failing.contains(&document.handle) {
            cx.out().write_bytes(b"partial");
            return Err(Problem::new("cannot compile document"));
        }
        if let Some(payload) = self.payloads.get(&document.handle) {
            cx.out().write_bytes(payload);
        }
        if let Some(assets) = self.assets.get(&document.handle) {
            cx.required_assets().merge(assets);
        }
        Ok(self
            .references
            .get(&document.handle)
            .cloned()
            .unwrap_or_default())
    }
}

impl AssetClassGenerator for ScriptedHost {
    fn generate(
        &mut self,
        _method: ClientMethod,
        count: u16,
        _defined: Option<&RequiredAssetsInfo>,
        out: &mut AmfWriter,
    ) -> Result<(), Problem> {
        out.write_bytes(&vec![0xAB; usize::from(count)]);
        if self.failing_generator {
            return Err(Problem::new("generator failed"));
        }
        Ok(())
    }
}

impl LibrarySetInitializer for ScriptedHost {
    fn init_library_sets(
        &mut self,
        client: &mut Client,
        unit: UnitHandle,
        _problems: &mut ProblemsHolder,
    ) -> Result<(), Problem> {
        self.initialized.push(unit);
        let info = self
            .known_units
            .get(&unit)
            .cloned()
            .ok_or_else(|| Problem::new(format!("no libraries for {unit}")))?;
        client.register_unit(info, &["ls"], None)?;
        Ok(())
    }
}

impl ProblemReporter for ScriptedHost {
    fn report(&mut self, workspace: WorkspaceHandle, problems: &ProblemsHolder) {
        self.reported
            .push((workspace, problems.iter().cloned().collect()));
    }
}

impl UnsavedDocuments for ScriptedHost {
    fn has_unsaved_changes(&self, document: &DocumentSource) -> bool {
        self.unsaved.contains(&document.handle)
    }
}

pub fn client() -> (Client, MemoryTransport) {
    let memory = MemoryTransport::new();
    let config = ClientConfig {
        journal: true,
        ..ClientConfig::default()
    };
    (Client::with_transport(config, memory.clone()), memory)
}

/// A client with workspace 1 and unit 1 registered and the journal cleared.
pub fn session() -> (Client, MemoryTransport) {
    let (mut client, memory) = client();
    client
        .register_workspace(WorkspaceHandle(1))
        .expect("workspace should register");
    client
        .register_unit(UnitInfo::new(UnitHandle(1), WorkspaceHandle(1)), &["ls"], None)
        .expect("unit should register");
    client.flush().expect("flush should succeed");
    client.take_journal();
    (client, memory)
}

pub fn document(raw: u64, unit: u64) -> DocumentSource {
    DocumentSource {
        handle: DocumentHandle(raw),
        unit: UnitHandle(unit),
        file: FileRef::new(format!("file:///src/Doc{raw}.mxml"), format!("Doc{raw}.mxml")),
        class_name: format!("views.Doc{raw}"),
    }
}

pub fn methods(journal: &[MessageRecord]) -> Vec<ClientMethod> {
    journal.iter().map(|record| record.method).collect()
}

/// Cut a byte stream into messages using the journal's lengths.
pub fn split<'a>(bytes: &'a [u8], journal: &[MessageRecord]) -> Vec<&'a [u8]> {
    let mut rest = bytes;
    let mut messages = Vec::new();
    for record in journal {
        let (message, tail) = rest.split_at(record.len);
        messages.push(message);
        rest = tail;
    }
    assert!(rest.is_empty(), "stream longer than journal");
    messages
}
