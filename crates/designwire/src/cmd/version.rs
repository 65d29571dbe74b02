use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    rustc: &'static str,
    git_hash: &'static str,
}

impl VersionInfo {
    fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("DESIGNWIRE_BUILD_TARGET").unwrap_or("unknown"),
            profile: option_env!("DESIGNWIRE_BUILD_PROFILE").unwrap_or("unknown"),
            rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        }
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let info = VersionInfo::current();
    if matches!(format, OutputFormat::Json) {
        print_json(&info);
        return Ok(SUCCESS);
    }
    if !args.extended {
        println!("{} {}", info.name, info.version);
        return Ok(SUCCESS);
    }

    println!("name: {}", info.name);
    println!("version: {}", info.version);
    println!("target: {}", info.target);
    println!("profile: {}", info.profile);
    println!("rustc: {}", info.rustc);
    println!("git_hash: {}", info.git_hash);
    println!("unix_socket: {}", cfg!(unix));
    Ok(SUCCESS)
}
