use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eposim_device::{Preset, RegistryConfig, SharedRegistry};
use eposim_frame::FrameConfig;
use eposim_node::{ChecksumPolicy, SimStats, Simulator, SimulatorConfig};
use eposim_transport::{open_device, Endpoint, SerialStream, UnixDomainSocket};
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{config_error, sim_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

/// How long an idle link or listener blocks before checking for Ctrl-C.
/// Frames in progress are never cut short by it.
const IDLE_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Serialize)]
struct ServeOutput {
    endpoint: String,
    nodes: Vec<u8>,
    links: u64,
    #[serde(flatten)]
    stats: SimStats,
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SimulatorConfig {
        response_delay: parse_duration(&args.delay, true)?,
        checksum_policy: if args.resume_on_bad_checksum {
            ChecksumPolicy::Resume
        } else {
            ChecksumPolicy::FailFast
        },
        frame: FrameConfig {
            idle_timeout: Some(IDLE_POLL),
            ..FrameConfig::default()
        },
    };

    let registry = load_registry(&args)?;
    let nodes: Vec<u8> = registry.nodes().collect();
    if nodes.is_empty() {
        warn!("no devices configured, every request will report an unknown node");
    }
    let registry = SharedRegistry::new(registry);

    let stop = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(stop.clone())?;

    let mut total = SimStats::default();
    let mut links = 0u64;

    match &args.endpoint {
        Endpoint::Device(path) => {
            let stream = open_device(path).map_err(|err| transport_error("open failed", err))?;
            info!(endpoint = %args.endpoint, ?nodes, "simulating");
            links += 1;
            let result = serve_link(stream, registry.clone(), &config, &stop, &mut total);
            print_summary(&args.endpoint, nodes, links, total, format);
            result?;
        }
        Endpoint::Unix(path) => {
            let listener =
                UnixDomainSocket::bind(path).map_err(|err| transport_error("bind failed", err))?;
            info!(endpoint = %args.endpoint, ?nodes, "simulating");

            while !stop.load(Ordering::SeqCst) {
                let Some(stream) = listener
                    .accept_timeout(IDLE_POLL)
                    .map_err(|err| transport_error("accept failed", err))?
                else {
                    continue;
                };
                links += 1;
                info!(link = links, "master connected");
                if let Err(err) = serve_link(stream, registry.clone(), &config, &stop, &mut total)
                {
                    warn!(link = links, error = %err, "link ended");
                }
            }
            print_summary(&args.endpoint, nodes, links, total, format);
        }
    }

    Ok(SUCCESS)
}

fn load_registry(args: &ServeArgs) -> CliResult<eposim_device::DeviceRegistry> {
    let presets: Vec<Preset> = [
        (args.right, Preset::Right),
        (args.left, Preset::Left),
        (args.sail, Preset::Sail),
    ]
    .into_iter()
    .filter_map(|(enabled, preset)| enabled.then_some(preset))
    .collect();

    let mut config = RegistryConfig::from_presets(&presets);
    if let Some(path) = &args.devices {
        let file = RegistryConfig::from_file(path)
            .map_err(|err| config_error("device config failed", err))?;
        config.extend(file);
    }
    config
        .build()
        .map_err(|err| config_error("device config failed", err))
}

/// Serve one link until it ends or `stop` is set.
///
/// A peer hanging up between frames ends the link without error.
fn serve_link(
    stream: SerialStream,
    registry: SharedRegistry,
    config: &SimulatorConfig,
    stop: &AtomicBool,
    total: &mut SimStats,
) -> CliResult<()> {
    let mut sim = Simulator::with_config_serial(stream, registry, config.clone())
        .map_err(|err| sim_error("link setup failed", err))?;
    let result = sim.run_until(stop);
    total.merge(&sim.stats());

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_disconnect() => {
            info!(stats = ?sim.stats(), "master disconnected");
            Ok(())
        }
        Err(err) => Err(sim_error("link failed", err)),
    }
}

fn print_summary(
    endpoint: &Endpoint,
    nodes: Vec<u8>,
    links: u64,
    stats: SimStats,
    format: OutputFormat,
) {
    let out = ServeOutput {
        endpoint: endpoint.to_string(),
        nodes,
        links,
        stats,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut t = table(["LINKS", "READS", "WRITES", "NACKS"]);
            t.add_row(vec![
                out.links.to_string(),
                out.stats.reads.to_string(),
                out.stats.writes.to_string(),
                out.stats.nacks.to_string(),
            ]);
            println!("{t}");
        }
        OutputFormat::Pretty => {
            println!("Simulator on {}:", out.endpoint);
            println!("  Links:  {}", out.links);
            println!("  Reads:  {}", out.stats.reads);
            println!("  Writes: {}", out.stats.writes);
            println!("  Nacks:  {}", out.stats.nacks);
        }
    }
}

fn install_ctrlc_handler(stop: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
