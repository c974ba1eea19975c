use eposim_device::ObjectAddress;

use crate::cmd::read::{connect, print_object, ObjectOutput};
use crate::cmd::WriteArgs;
use crate::exit::{master_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let mut master = connect(&args.object)?;
    let address = ObjectAddress::new(args.object.index, args.object.subindex);

    master
        .write_object(args.object.node, address, args.value)
        .map_err(|err| master_error("write failed", err))?;

    print_object(
        &ObjectOutput::new(args.object.node, address, args.value),
        format,
    );
    Ok(SUCCESS)
}
