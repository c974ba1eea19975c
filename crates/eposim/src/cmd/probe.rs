use eposim_node::{Master, MasterConfig, MasterError};
use serde::Serialize;

use crate::cmd::{parse_duration, ProbeArgs};
use crate::exit::{master_error, CliResult, FAILURE, SUCCESS};
use crate::output::{hex32, print_json, table, OutputFormat};

#[derive(Debug, Serialize)]
struct NodeReport {
    node: u8,
    present: bool,
    serial: Option<String>,
    error: Option<String>,
    description: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ProbeOutput {
    endpoint: String,
    nodes: Vec<NodeReport>,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout, false)?;
    let mut master = Master::connect(&args.endpoint, MasterConfig::with_timeout(timeout))
        .map_err(|err| master_error("connect failed", err))?;

    let mut reports = Vec::with_capacity(args.nodes.len());
    for &node in &args.nodes {
        let report = match master.probe(node) {
            Ok(serial) => NodeReport {
                node,
                present: true,
                serial: Some(hex32(serial)),
                error: None,
                description: None,
            },
            Err(MasterError::Device { code }) => NodeReport {
                node,
                present: false,
                serial: None,
                error: Some(hex32(code)),
                description: Some(eposim_device::describe(code)),
            },
            Err(err) => return Err(master_error(&format!("probe of node {node} failed"), err)),
        };
        reports.push(report);
    }

    let any_present = reports.iter().any(|r| r.present);
    print_probe(
        &ProbeOutput {
            endpoint: args.endpoint.to_string(),
            nodes: reports,
        },
        format,
    );

    Ok(if any_present { SUCCESS } else { FAILURE })
}

fn print_probe(out: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut t = table(["NODE", "SERIAL", "STATUS"]);
            for r in &out.nodes {
                t.add_row(vec![
                    r.node.to_string(),
                    r.serial.clone().unwrap_or_else(|| "-".to_string()),
                    r.description.unwrap_or("present").to_string(),
                ]);
            }
            println!("{t}");
        }
        OutputFormat::Pretty => {
            println!("Nodes on {}:", out.endpoint);
            for r in &out.nodes {
                match (&r.serial, &r.error) {
                    (Some(serial), _) => println!("  {:>3}  serial {serial}", r.node),
                    (None, Some(error)) => println!(
                        "  {:>3}  {error} {}",
                        r.node,
                        r.description.unwrap_or_default()
                    ),
                    (None, None) => println!("  {:>3}  absent", r.node),
                }
            }
        }
    }
}
