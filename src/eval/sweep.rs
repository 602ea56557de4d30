use cachesim_lib::cache::policy::{PolicyKind, ReplacementPolicy};
use cachesim_lib::hierarchy::bypassing::BypassingHierarchy;
use cachesim_lib::hierarchy::inclusive::InclusiveHierarchy;
use cachesim_lib::hierarchy::{CacheSystem, HierarchyConfig};
use cachesim_lib::system::{AddressSpace, LevelName};
use cachesim_lib::trace::run_trace;

const SEED: u64 = 0x5eed;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let param_tokens: Vec<String> = std::env::args().collect();
    let trace_path = param_tokens
        .get(1)
        .ok_or("You should specify exactly one trace file")?;

    let config = HierarchyConfig {
        address_space: AddressSpace::In64Bit,
        level_sizes: [32768, 2097152, 16777216],
        level_associativities: [32, 1, 1],
        block_size: 32,
        level_latencies: Some([(1, 1), (8, 8), (20, 20), (100, 100)]),
    };

    std::fs::create_dir_all("eval")?;
    let output_path = "eval/policy_sweep.csv";
    let mut writer = csv::Writer::from_path(output_path)?;
    writer.write_record([
        "Policy",
        "Model",
        "IL1 Hit Rate",
        "DL1 Hit Rate",
        "UL2 Hit Rate",
        "UL3 Hit Rate",
        "Average Latency",
    ])?;

    for kind in PolicyKind::ALL {
        for model in ["inclusive", "bypassing"] {
            eprintln!("Running {} / {}", kind.name(), model);
            let policy = ReplacementPolicy::with_seed(kind, SEED);
            let mut system: Box<dyn CacheSystem> = match model {
                "inclusive" => Box::new(InclusiveHierarchy::new(&config, policy)?),
                _ => Box::new(BypassingHierarchy::new(&config, policy)?),
            };
            run_trace(system.as_mut(), trace_path.as_ref())?;

            let metrics = system.metrics();
            writer.write_record([
                kind.name(),
                model,
                &format!("{:.4}", metrics.hit_rate(LevelName::Il1)),
                &format!("{:.4}", metrics.hit_rate(LevelName::Dl1)),
                &format!("{:.4}", metrics.hit_rate(LevelName::Ul2)),
                &format!("{:.4}", metrics.hit_rate(LevelName::Ul3)),
                &format!("{:.2}", metrics.average_latency()),
            ])?;
        }
    }
    writer.flush()?;
    eprintln!("Wrote {}", output_path);

    Ok(())
}
