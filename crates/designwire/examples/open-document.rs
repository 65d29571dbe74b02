//! Open one document against an in-memory engine and dump the stream.
//!
//! Run with: `cargo run -p designwire --example open-document`

use designwire::client::{
    AssetClassGenerator, Client, ClientConfig, ClientMethod, DocumentFactoryWriter, DocumentHandle,
    DocumentSource, FactoryContext, FileRef, LibrarySetInitializer, Problem, ProblemReporter,
    ProblemsHolder, RequiredAssetsInfo, UnitHandle, UnitInfo, UnsavedDocuments, Workspace,
    WorkspaceHandle,
};
use designwire::frame::AmfWriter;
use designwire::transport::MemoryTransport;

struct Host;

impl DocumentFactoryWriter for Host {
    fn write_factory(
        &mut self,
        _document: &DocumentSource,
        cx: &mut FactoryContext<'_>,
    ) -> Result<Vec<DocumentSource>, Problem> {
        cx.write_string_ref("label")?;
        cx.out().write_utf("Hello")?;
        Ok(Vec::new())
    }
}

impl AssetClassGenerator for Host {
    fn generate(
        &mut self,
        _method: ClientMethod,
        _count: u16,
        _defined: Option<&RequiredAssetsInfo>,
        _out: &mut AmfWriter,
    ) -> Result<(), Problem> {
        Ok(())
    }
}

impl LibrarySetInitializer for Host {
    fn init_library_sets(
        &mut self,
        _client: &mut Client,
        unit: UnitHandle,
        _problems: &mut ProblemsHolder,
    ) -> Result<(), Problem> {
        Err(Problem::new(format!("{unit} has no library sets")))
    }
}

impl ProblemReporter for Host {
    fn report(&mut self, workspace: WorkspaceHandle, problems: &ProblemsHolder) {
        for problem in problems {
            eprintln!("{workspace}: {problem}");
        }
    }
}

impl UnsavedDocuments for Host {
    fn has_unsaved_changes(&self, _document: &DocumentSource) -> bool {
        false
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let memory = MemoryTransport::new();
    let mut client = Client::with_transport(
        ClientConfig {
            journal: true,
            ..ClientConfig::default()
        },
        memory.clone(),
    );

    let workspace = Workspace {
        handle: WorkspaceHandle(1),
        name: "demo".to_string(),
        window_bounds: None,
    };
    client.register_workspace(workspace.handle)?;
    client.open_workspace(&workspace)?;
    client.register_unit(UnitInfo::new(UnitHandle(1), workspace.handle), &["framework"], None)?;

    let document = DocumentSource {
        handle: DocumentHandle(1),
        unit: UnitHandle(1),
        file: FileRef::new("file:///src/Main.mxml", "src/Main.mxml"),
        class_name: "Main".to_string(),
    };
    client.open_document(&mut Host, &document)?;

    for record in client.journal() {
        println!("{:<28} {:>4} bytes", record.method, record.len);
    }
    let stream = memory.flushed();
    let hex: Vec<String> = stream.iter().map(|byte| format!("{byte:02x}")).collect();
    println!("{}", hex.join(" "));
    Ok(())
}
