use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("eposim {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: eposim");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("EPOSIM_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: node={}, cli=true", cfg!(feature = "node"));
    println!(
        "defaults: response_delay={:?}, master_timeout={:?}, max_frame={}",
        eposim_node::DEFAULT_RESPONSE_DELAY,
        eposim_node::DEFAULT_MASTER_TIMEOUT,
        eposim_frame::DEFAULT_MAX_FRAME
    );

    Ok(SUCCESS)
}
