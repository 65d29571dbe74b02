use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON session script and encode the engine stream.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Session script (JSON).
    pub script: PathBuf,
    /// Write the encoded stream to this file.
    #[arg(long, value_name = "FILE", conflicts_with = "socket")]
    pub out: Option<PathBuf>,
    /// Bind this Unix socket and stream to the first engine that connects.
    #[arg(long, value_name = "PATH", conflicts_with = "out")]
    pub socket: Option<PathBuf>,
    /// Initial capacity of the outgoing buffer in bytes.
    #[arg(long, value_name = "BYTES")]
    pub buffer_capacity: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
