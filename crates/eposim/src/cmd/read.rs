use eposim_device::{registers, ObjectAddress};
use eposim_node::{Master, MasterConfig};
use serde::Serialize;

use crate::cmd::{parse_duration, ObjectArgs, ReadArgs};
use crate::exit::{master_error, CliResult, SUCCESS};
use crate::output::{hex16, hex32, print_json, table, OutputFormat};

#[derive(Debug, Serialize)]
pub(crate) struct ObjectOutput {
    pub node: u8,
    pub index: String,
    pub subindex: u8,
    pub name: Option<&'static str>,
    pub value: u32,
    pub value_hex: String,
}

impl ObjectOutput {
    pub(crate) fn new(node: u8, address: ObjectAddress, value: u32) -> Self {
        Self {
            node,
            index: hex16(address.index),
            subindex: address.subindex,
            name: registers::name(address),
            value,
            value_hex: hex32(value),
        }
    }
}

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let mut master = connect(&args.object)?;
    let address = ObjectAddress::new(args.object.index, args.object.subindex);

    let value = master
        .read_object(args.object.node, address)
        .map_err(|err| master_error("read failed", err))?;

    print_object(&ObjectOutput::new(args.object.node, address, value), format);
    Ok(SUCCESS)
}

pub(crate) fn connect(args: &ObjectArgs) -> CliResult<Master<eposim_transport::SerialStream>> {
    let timeout = parse_duration(&args.timeout, false)?;
    Master::connect(&args.endpoint, MasterConfig::with_timeout(timeout))
        .map_err(|err| master_error("connect failed", err))
}

pub(crate) fn print_object(out: &ObjectOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut t = table(["NODE", "OBJECT", "NAME", "VALUE"]);
            t.add_row(vec![
                out.node.to_string(),
                format!("{}[{}]", out.index, out.subindex),
                out.name.unwrap_or("-").to_string(),
                format!("{} ({})", out.value_hex, out.value),
            ]);
            println!("{t}");
        }
        OutputFormat::Pretty => {
            println!(
                "node {} {}[{}] = {} ({})",
                out.node, out.index, out.subindex, out.value_hex, out.value
            );
        }
    }
}
