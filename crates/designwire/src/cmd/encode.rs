use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use designwire::client::{Client, ClientConfig, ClientError, ProblemsHolder, RequiredAssetsInfo};
use designwire::transport::{MemoryTransport, StreamTransport};
use tracing::{debug, info, warn};

use crate::cmd::EncodeArgs;
use crate::exit::{client_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_raw, print_report, DocumentOutcome, EncodeReport, OutputFormat};
use crate::script::{Script, ScriptHost, Step};

enum Sink {
    Memory(MemoryTransport),
    File(String),
    Socket(String),
}

impl Sink {
    fn describe(&self) -> String {
        match self {
            Sink::Memory(_) => "memory".to_string(),
            Sink::File(path) => format!("file {path}"),
            Sink::Socket(path) => format!("socket {path}"),
        }
    }
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let script = Script::load(&args.script)?;
    let mut host = ScriptHost::new(&script)?;

    let mut config = ClientConfig {
        journal: true,
        ..ClientConfig::default()
    };
    if let Some(capacity) = args.buffer_capacity {
        config.initial_buffer_capacity = capacity;
    }
    let (mut client, sink) = connect(config, &args)?;
    info!(script = %args.script.display(), steps = script.steps.len(), sink = %sink.describe(), "replaying session");

    let mut documents = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        debug!(step = index, op = step.op(), "step");
        if let Some(outcome) = replay(&mut client, &mut host, index, step)? {
            if !outcome.ok {
                warn!(step = index, document = %outcome.document, "document not committed");
            }
            documents.push(outcome);
        }
    }
    client
        .flush()
        .map_err(|err| client_error("final flush", err))?;

    let messages = client.take_journal();
    let report = EncodeReport {
        sink: sink.describe(),
        steps: script.steps.len(),
        bytes: messages.iter().map(|record| record.len).sum(),
        messages,
        documents,
        problems: host.take_reported(),
    };

    match (format, &sink) {
        (OutputFormat::Raw, Sink::Memory(memory)) => print_raw(&memory.flushed()),
        (OutputFormat::Raw, _) => warn!("raw output needs the in-memory sink; the stream went to {}", report.sink),
        _ => print_report(&report, format),
    }
    Ok(SUCCESS)
}

fn connect(config: ClientConfig, args: &EncodeArgs) -> CliResult<(Client, Sink)> {
    if let Some(path) = &args.out {
        let file = File::create(path).map_err(|err| io_error(&format!("create {}", path.display()), err))?;
        let client = Client::with_transport(config, StreamTransport::new(BufWriter::new(file)));
        return Ok((client, Sink::File(path.display().to_string())));
    }
    if let Some(path) = &args.socket {
        let client = Client::with_transport(config, accept_engine(path)?);
        return Ok((client, Sink::Socket(path.display().to_string())));
    }
    let memory = MemoryTransport::new();
    let client = Client::with_transport(config, memory.clone());
    Ok((client, Sink::Memory(memory)))
}

#[cfg(unix)]
fn accept_engine(path: &Path) -> CliResult<designwire::transport::EngineConnection> {
    use crate::exit::transport_error;
    use designwire::transport::EngineListener;

    let context = format!("listen on {}", path.display());
    let listener = EngineListener::bind(path).map_err(|err| transport_error(&context, err))?;
    listener.accept().map_err(|err| transport_error(&context, err))
}

#[cfg(not(unix))]
fn accept_engine(path: &Path) -> CliResult<MemoryTransport> {
    Err(CliError::new(
        crate::exit::USAGE,
        format!("--socket {} needs Unix domain sockets", path.display()),
    ))
}

/// Apply one script step. Document steps return their outcome.
fn replay(
    client: &mut Client,
    host: &mut ScriptHost,
    index: usize,
    step: &Step,
) -> CliResult<Option<DocumentOutcome>> {
    let context = format!("step {index} ({})", step.op());
    let fail = |err: ClientError| client_error(&context, err);
    let scoped = |err: CliError| CliError::new(err.code, format!("{context}: {}", err.message));

    match step {
        Step::OpenWorkspace { workspace } => {
            let workspace = host.workspace(*workspace).map_err(scoped)?.clone();
            if !client.is_workspace_registered(workspace.handle) {
                client.register_workspace(workspace.handle).map_err(fail)?;
            }
            client.open_workspace(&workspace).map_err(fail)?;
        }
        Step::CloseWorkspace { workspace } => client.close_workspace(*workspace).map_err(fail)?,
        Step::RegisterLibrarySet { set } => host.register_library_set(client, set).map_err(scoped)?,
        Step::RegisterUnit { unit } => {
            host.register_unit(client, *unit).map_err(scoped)?;
        }
        Step::OpenDocument { document, notify } => {
            let source = host.document(*document).map_err(scoped)?;
            let ok = client
                .open_document_with(
                    host,
                    &source,
                    *notify,
                    &mut ProblemsHolder::new(),
                    &mut RequiredAssetsInfo::default(),
                )
                .map_err(fail)?;
            return Ok(Some(DocumentOutcome {
                step: index,
                document: *document,
                op: step.op(),
                ok,
            }));
        }
        Step::UpdateDocument { document } => {
            let source = host.document(*document).map_err(scoped)?;
            let ok = client.update_document_factory(host, &source).map_err(fail)?;
            return Ok(Some(DocumentOutcome {
                step: index,
                document: *document,
                op: step.op(),
                ok,
            }));
        }
        Step::MarkUnsaved { document } => host.mark_unsaved(*document),
        Step::QualifyExternalInlineStyleSource => {
            client.qualify_external_inline_style_source().map_err(fail)?
        }
        Step::InitStringRegistry => client.init_string_registry().map_err(fail)?,
        Step::UpdateStringRegistry => client.update_string_registry().map_err(fail)?,
        Step::Flush => client.flush().map_err(fail)?,
    }
    Ok(None)
}
