use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use dps::engine::{SimulatedConfig, SimulatedEngine};
use dps::parallel::{ExchangeConfig, adjust_worker_count, run_portfolio};
use dps::worker::limits::ResourceLimits;
use dps::{PortfolioResult, SolveResult};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "dps")]
#[command(about = "dps - deterministic parallel clause exchange")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Scripted verdict of the simulated engines
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliVerdict {
    Sat,
    Unsat,
    /// Never conclude; only limits stop the run
    Unknown,
}

impl From<CliVerdict> for SolveResult {
    fn from(cli: CliVerdict) -> Self {
        match cli {
            CliVerdict::Sat => SolveResult::Satisfiable,
            CliVerdict::Unsat => SolveResult::Unsatisfiable,
            CliVerdict::Unknown => SolveResult::Unknown,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a portfolio of simulated engines through the exchange
    Run(RunArgs),
    /// Print the worker count that fits a memory limit
    Workers {
        /// Requested number of workers (0 = one per CPU)
        #[arg(long, short = 'j', default_value = "0")]
        cores: usize,
        /// Memory limit in megabytes
        #[arg(long)]
        mem_limit: f64,
        /// Memory used after loading the input, in megabytes
        #[arg(long)]
        loaded: f64,
        /// Estimated solving memory as a multiple of the loaded size
        #[arg(long, default_value = "3")]
        factor: u32,
    },
}

#[derive(ClapArgs)]
struct RunArgs {
    // --- Exchange options ---
    /// Number of worker threads (0 = one per CPU)
    #[arg(long, short = 'j', default_value = "0")]
    cores: usize,
    /// Import lag in periods, also the termination grace window
    #[arg(long, default_value = "20")]
    margin: u64,
    /// Work units per period
    #[arg(long, default_value = "1000000")]
    period_length: u64,
    /// Skip clause sets that are not complete yet (not reproducible)
    #[arg(long)]
    non_deterministic: bool,
    /// Pending clauses per worker that force an application (0 = off)
    #[arg(long, default_value = "10000")]
    fapp_clauses: usize,
    /// Minimum periods between forced applications
    #[arg(long, default_value = "50")]
    fapp_periods: u64,
    /// Conflicts per period for adaptive period length (0 = fixed length)
    #[arg(long, default_value = "0")]
    adaptive_conflicts: u64,
    /// Lower bound on the adaptive period length (0 = none)
    #[arg(long, default_value = "0")]
    adaptive_lb: u64,
    /// Upper bound on the adaptive period length (0 = none)
    #[arg(long, default_value = "0")]
    adaptive_ub: u64,
    /// Smoothing factor of the adaptive period length
    #[arg(long, default_value = "0.1")]
    adaptive_smoothing: f64,
    /// Literals exported per period (0 = unlimited)
    #[arg(long, default_value = "150")]
    export_literals: usize,
    /// Export backlog target as a multiple of the literal budget
    #[arg(long, default_value = "3.0")]
    export_margin: f64,

    // --- Limits and reporting ---
    /// Time limit in seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Memory limit in megabytes
    #[arg(long)]
    mem_limit: Option<f64>,
    /// Milliseconds between progress lines
    #[arg(long, default_value = "1000")]
    log_interval: u64,
    /// Print per-worker statistics
    #[arg(long)]
    stats: bool,
    /// Print the model of a satisfiable run
    #[arg(long)]
    model: bool,

    // --- Simulated engine options ---
    /// Random seed for the simulated engines
    #[arg(long, default_value = "0")]
    seed: u64,
    /// Verdict the simulated engines conclude with
    #[arg(long, value_enum, default_value = "unsat")]
    sim_verdict: CliVerdict,
    /// Conflicts before a simulated engine concludes
    #[arg(long, default_value = "20000")]
    sim_conflicts: u64,
    /// Extra conflicts drawn per worker
    #[arg(long, default_value = "5000")]
    sim_jitter: u64,
    /// Variables in the simulated formula
    #[arg(long, default_value = "200")]
    sim_vars: u32,
    /// Minimum work units per simulated conflict
    #[arg(long, default_value = "50")]
    sim_min_work: u64,
    /// Maximum work units per simulated conflict
    #[arg(long, default_value = "500")]
    sim_max_work: u64,
}

impl RunArgs {
    fn exchange_config(&self) -> Result<ExchangeConfig, Box<dyn std::error::Error>> {
        let mut limits = ResourceLimits::default();
        if let Some(secs) = self.time_limit {
            let limit = Duration::try_from_secs_f64(secs)
                .map_err(|e| format!("invalid --time-limit {}: {}", secs, e))?;
            limits = limits.with_time_limit(limit);
        }
        if let Some(mb) = self.mem_limit {
            limits = limits.with_memory_limit(mb);
        }

        let mut config = ExchangeConfig::default();
        if self.cores > 0 {
            config = config.with_workers(self.cores);
        }
        Ok(config
            .with_margin(self.margin)
            .with_period_length(self.period_length)
            .with_non_deterministic(self.non_deterministic)
            .with_forced_application(self.fapp_clauses, self.fapp_periods)
            .with_adaptive_period(self.adaptive_conflicts, self.adaptive_smoothing)
            .with_adaptive_bounds(self.adaptive_lb, self.adaptive_ub)
            .with_export_budget(self.export_literals, self.export_margin)
            .with_limits(limits))
    }

    fn simulated_config(&self) -> SimulatedConfig {
        // An engine that never concludes is modelled by an unreachable budget.
        let conflicts = match self.sim_verdict {
            CliVerdict::Unknown => u64::MAX / 2,
            _ => self.sim_conflicts,
        };
        SimulatedConfig::default()
            .with_seed(self.seed)
            .with_verdict(self.sim_verdict.into(), conflicts, self.sim_jitter)
            .with_num_vars(self.sim_vars)
            .with_step_work(self.sim_min_work, self.sim_max_work)
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_result(result: &PortfolioResult, args: &RunArgs) {
    if args.stats {
        for line in result.format_summary().lines() {
            println!("c {}", line);
        }
    }
    println!("s {}", result.result);
    if args.model
        && let Some(model) = &result.model
    {
        let literals: Vec<String> = model.iter().map(|l| l.to_string()).collect();
        println!("v {} 0", literals.join(" "));
    }
}

fn run(args: &RunArgs) -> Result<SolveResult, Box<dyn std::error::Error>> {
    let config = args.exchange_config()?;
    let simulated = args.simulated_config();
    let engines = (0..config.num_workers)
        .map(|id| SimulatedEngine::new(id, simulated.clone()))
        .collect();

    let result = run_portfolio(engines, &config, Duration::from_millis(args.log_interval.max(1)))?;
    print_result(&result, args);
    Ok(result.result)
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Run(run_args) => match run(&run_args) {
            Ok(result) => std::process::exit(result.exit_code()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Workers {
            cores,
            mem_limit,
            loaded,
            factor,
        } => {
            let requested = if cores == 0 { num_cpus::get() } else { cores };
            println!("{}", adjust_worker_count(requested, mem_limit, loaded, factor));
        }
    }
}
