use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cpufit_core::{cpu, parse_affinity_mask, Algo, AffinityScope, CpuConfig, CpuTopology};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cpufit", version, about = "Size cache-bound worker threads for this CPU")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Show the detected CPU topology
    Info {
        #[arg(long)]
        json: bool,
    },
    /// Compute threads and hash factor for a workload
    Plan(PlanArgs),
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Options file (defaults to $CPUFIT_CONFIG or the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    algo: Option<Algo>,
    /// Worker threads, 0 = auto
    #[arg(short, long)]
    threads: Option<usize>,
    /// Hash blocks per thread, 0 = auto
    #[arg(long)]
    multihash_factor: Option<usize>,
    /// Percent of logical threads to use when picking threads automatically
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=100))]
    max_cpu_usage: Option<u64>,
    /// Re-check explicit values against the cache budget (`--safe=false` turns it off)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    safe: Option<bool>,
    /// Affinity mask, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_affinity_mask)]
    cpu_affinity: Option<u64>,
    /// Pin this process to the affinity mask
    #[arg(long)]
    pin: bool,
    /// Save the merged options back to the options file
    #[arg(long)]
    write_config: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    topology: &'a CpuTopology,
    available_cache: usize,
    algo: Algo,
    block_size: usize,
    requested: cpufit_core::OptimizationRequest,
    threads: usize,
    hash_factor: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu_affinity: Option<String>,
}

fn main() -> Result<()> {
    // RUST_LOG wins; info otherwise. stdout stays clean for --json.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Info { json } => run_info(json),
        Cmd::Plan(args) => run_plan(args),
    }
}

fn run_info(json: bool) -> Result<()> {
    let topology = cpu::init();
    if json {
        println!("{}", serde_json::to_string_pretty(topology)?);
        return Ok(());
    }
    print_topology(topology);
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let path = args.config.clone().unwrap_or_else(cpufit_core::config_path);
    let mut config = CpuConfig::load_or_default(&path)
        .with_context(|| format!("load config {}", path.display()))?;
    merge_overrides(&mut config, &args);
    config.validate().context("invalid options")?;
    if args.write_config {
        config
            .save(&path)
            .with_context(|| format!("write config {}", path.display()))?;
        info!(path = %path.display(), "options saved");
    }

    let topology = cpu::init();
    let mut threads = config.threads;
    let mut hash_factor = config.hash_factor;
    cpu::optimize_parameters(
        &mut threads,
        &mut hash_factor,
        config.algo,
        config.max_cpu_usage,
        config.safe,
    );
    info!(
        algo = %config.algo,
        threads,
        hash_factor,
        safe = config.safe,
        "worker plan ready"
    );

    if args.pin {
        if let Some(mask) = config.cpu_affinity {
            cpu::set_affinity(AffinityScope::Process, mask)
                .with_context(|| format!("pin to cpu mask {mask:#x}"))?;
            info!(mask = %format!("{mask:#x}"), "process pinned");
        } else {
            info!("--pin given without cpu-affinity, nothing to do");
        }
    }

    if args.json {
        let report = PlanReport {
            topology,
            available_cache: topology.available_cache(),
            algo: config.algo,
            block_size: config.algo.block_size(),
            requested: config.request(),
            threads,
            hash_factor,
            cpu_affinity: config.cpu_affinity.map(|m| format!("{m:#x}")),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_topology(topology);
    println!(
        " * THREADS:     {}, {}, hash factor={}{}",
        threads,
        config.algo,
        hash_factor,
        if config.safe { ", safe" } else { "" }
    );
    if let Some(mask) = config.cpu_affinity {
        println!(" * AFFINITY:    {mask:#x}");
    }
    Ok(())
}

fn merge_overrides(config: &mut CpuConfig, args: &PlanArgs) {
    if let Some(algo) = args.algo {
        config.algo = algo;
    }
    if let Some(t) = args.threads {
        config.threads = t;
    }
    if let Some(h) = args.multihash_factor {
        config.hash_factor = h;
    }
    if let Some(p) = args.max_cpu_usage {
        config.max_cpu_usage = p as usize;
    }
    if let Some(safe) = args.safe {
        config.safe = safe;
    }
    if args.cpu_affinity.is_some() {
        config.cpu_affinity = args.cpu_affinity;
    }
}

fn print_topology(t: &CpuTopology) {
    println!(
        " * CPU:         {} ({}) {} {}AES {}BMI2",
        t.brand(),
        t.sockets(),
        if t.is_x64() { "x64" } else { "-x64" },
        if t.has_aes() { "" } else { "-" },
        if t.has_bmi2() { "" } else { "-" },
    );
    println!(" * CORES:       {} cores, {} threads", t.cores(), t.threads());
    println!(
        " * CPU L2/L3:   {}/{}{}",
        mib(t.l2()),
        mib(t.l3()),
        if t.l2_exclusive() { " (L2 exclusive)" } else { "" }
    );
    println!(" * CACHE:       {} usable", mib(t.available_cache()));
    if t.is_unknown() {
        println!(" * NOTE:        CPU not identified, using safe defaults");
    }
}

fn mib(bytes: usize) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}
