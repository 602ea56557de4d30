use std::path::PathBuf;

use cachesim_lib::cache::policy::{PolicyKind, ReplacementPolicy};
use cachesim_lib::error::SimulatorResult;
use cachesim_lib::flags::{CacheSimArgs, ModelArg};
use cachesim_lib::hierarchy::bypassing::BypassingHierarchy;
use cachesim_lib::hierarchy::inclusive::InclusiveHierarchy;
use cachesim_lib::hierarchy::CacheSystem;
use cachesim_lib::trace;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> SimulatorResult<()> {
    let args = CacheSimArgs::from_env_or_exit();

    let kind = args.policy.unwrap_or(PolicyKind::Lru);
    let policy = match args.seed {
        Some(seed) => ReplacementPolicy::with_seed(kind, seed),
        None => ReplacementPolicy::new(kind),
    };
    let config = args.hierarchy_config()?;

    log::info!("creating {} cache system", kind.name());
    let mut system: Box<dyn CacheSystem> = match args.model.unwrap_or(ModelArg::Inclusive) {
        ModelArg::Inclusive => Box::new(InclusiveHierarchy::new(&config, policy)?),
        ModelArg::Bypassing => Box::new(BypassingHierarchy::new(&config, policy)?),
    };

    log::info!("running trace {}", args.trace_file.display());
    let processed = trace::run_trace(system.as_mut(), &args.trace_file)?;
    log::info!("finished trace: {} records", processed);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("metrics.out"));
    system.metrics().save(&output)?;
    log::info!("metrics written to {}", output.display());

    Ok(())
}
