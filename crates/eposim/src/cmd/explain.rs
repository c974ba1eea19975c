use eposim_device::codes;
use serde::Serialize;

use crate::cmd::ExplainArgs;
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{hex32, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct ExplainOutput {
    code: String,
    known: bool,
    description: &'static str,
}

pub fn run(args: ExplainArgs, format: OutputFormat) -> CliResult<i32> {
    let known = codes::lookup(args.code).is_some();
    let out = ExplainOutput {
        code: hex32(args.code),
        known,
        description: codes::describe(args.code),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{}: {}", out.code, out.description);
        }
    }

    Ok(if known { SUCCESS } else { DATA_INVALID })
}
