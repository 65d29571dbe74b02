use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use designwire::client::{DocumentHandle, MessageRecord};
use serde::Serialize;

use crate::script::ReportedProblem;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// The encoded stream itself (in-memory sink only).
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Result of opening or updating one document.
#[derive(Debug, Serialize)]
pub struct DocumentOutcome {
    pub step: usize,
    pub document: DocumentHandle,
    pub op: &'static str,
    pub ok: bool,
}

/// Summary of one `encode` run.
#[derive(Debug, Serialize)]
pub struct EncodeReport {
    pub sink: String,
    pub steps: usize,
    pub bytes: usize,
    pub messages: Vec<MessageRecord>,
    pub documents: Vec<DocumentOutcome>,
    pub problems: Vec<ReportedProblem>,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_report(report: &EncodeReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "METHOD", "OPCODE", "BYTES"]);
            for (index, record) in report.messages.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    record.method.to_string(),
                    record.method.opcode().to_string(),
                    record.len.to_string(),
                ]);
            }
            println!("{table}");

            if !report.problems.is_empty() {
                let mut problems = Table::new();
                problems
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["WORKSPACE", "SOURCE", "PROBLEM"]);
                for problem in &report.problems {
                    problems.add_row(vec![
                        problem.workspace.to_string(),
                        problem.source.clone().unwrap_or_default(),
                        problem.message.clone(),
                    ]);
                }
                println!("{problems}");
            }
            println!("{}", summary(report));
        }
        OutputFormat::Pretty => {
            for record in &report.messages {
                println!("{:<34} op={:<2} {} bytes", record.method, record.method.opcode(), record.len);
            }
            for outcome in &report.documents {
                let state = if outcome.ok { "ok" } else { "failed" };
                println!("step {} {} {}: {state}", outcome.step, outcome.op, outcome.document);
            }
            for problem in &report.problems {
                match &problem.source {
                    Some(source) => println!("problem [{}] {source}: {}", problem.workspace, problem.message),
                    None => println!("problem [{}] {}", problem.workspace, problem.message),
                }
            }
            println!("{}", summary(report));
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn summary(report: &EncodeReport) -> String {
    format!(
        "{} steps, {} messages, {} bytes to {}",
        report.steps,
        report.messages.len(),
        report.bytes,
        report.sink
    )
}
