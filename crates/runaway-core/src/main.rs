//! Runaway - runaway process detector
//!
//! The entry point handles:
//! - Single-host checks (machine triage, process scan, one pid)
//! - Fleet fan-out over SSH to a host group
//! - Rule cover validation against its truth table
//! - Configuration inspection

use clap::{Args, Parser, Subcommand};
use runaway_common::{Error, OutputFormat, ProcessId, StructuredError};
use runaway_core::check::{run_check, CheckMode};
use runaway_core::collect::detect_adapter;
use runaway_core::config::{load_config, ResolvedConfig};
use runaway_core::context::CheckContext;
use runaway_core::exit_codes::ExitCode;
use runaway_core::fleet::{
    check_fleet, default_resolvers, plan_hosts, ForwardedFlags, HostStatus, SshCheckConfig,
    SshExecutor,
};
use runaway_core::inference::{validate_cover, TruthTable, RUNAWAY_RULES};
use runaway_core::log_event;
use runaway_core::logging::{
    event_names, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use runaway_core::output::{diagnostics, rules_summary, write_check};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Runaway - find machines and processes that are eating the host
#[derive(Parser)]
#[command(name = "runaway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Configuration file
    #[arg(long, global = true, env = "RUNAWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Explain verdicts on stderr with debug logs (-v, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print nothing on stdout; only the exit code answers
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check this host, or one process on it
    Check(CheckArgs),

    /// Check every host of a group over SSH
    Fleet(FleetArgs),

    /// Validate the rule cover against its truth table
    Rules(RulesArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Score every process when the machine looks runaway
    #[arg(short = 'p', long)]
    scan: bool,

    /// Score every process even when the machine looks fine
    #[arg(short, long)]
    force: bool,

    /// Check only this process
    pid: Option<ProcessId>,
}

#[derive(Args, Debug)]
struct FleetArgs {
    /// Host group (inventory group or netgroup)
    group: String,

    /// Skip hosts matching the configured exclusion pattern
    #[arg(short = 'x', long)]
    exclude: bool,

    /// Skip hosts matching this regex instead
    #[arg(long, value_name = "REGEX")]
    exclude_pattern: Option<String>,

    /// Forward --scan to every host
    #[arg(short = 'p', long)]
    scan: bool,

    /// Forward --force to every host
    #[arg(short, long)]
    force: bool,

    /// Maximum hosts checked at once (0 = all)
    #[arg(long)]
    parallel: Option<usize>,

    /// Host inventory file (TOML, YAML or JSON)
    #[arg(long)]
    inventory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RulesArgs {
    /// Truth table to validate against instead of the built-in one
    #[arg(long)]
    table: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

fn main() {
    let cli = Cli::parse();

    let log_format = match cli.global.format {
        OutputFormat::Json => Some(LogFormat::Jsonl),
        OutputFormat::Text => None,
    };
    let log_config = LogConfig::from_env(
        LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet),
        log_format,
    );
    init_logging(&log_config);

    let exit_code = match cli.command {
        Commands::Check(args) => run_check_command(&cli.global, &args),
        Commands::Fleet(args) => run_fleet(&cli.global, &args),
        Commands::Rules(args) => run_rules(&cli.global, &args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(&cli.global),
        },
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::OK
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Report an error on stderr and map it to its exit code.
fn output_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    match global.format {
        OutputFormat::Json => eprintln!("{}", StructuredError::from(err).to_json()),
        OutputFormat::Text => eprintln!("{}", err.to_human()),
    }
    ExitCode::from(err)
}

fn resolve_config(global: &GlobalOpts) -> Result<ResolvedConfig, Error> {
    load_config(global.config.as_deref()).map_err(Error::from)
}

fn explain(global: &GlobalOpts) -> bool {
    global.verbose > 0 && !global.quiet
}

fn run_check_command(global: &GlobalOpts, args: &CheckArgs) -> ExitCode {
    let resolved = match resolve_config(global) {
        Ok(r) => r,
        Err(e) => return output_error(global, &e),
    };
    let sampling = &resolved.config.sampling;

    let log = LogContext::for_this_run();
    let mode = match args.pid {
        Some(pid) => CheckMode::Process(pid.0),
        None => CheckMode::Machine {
            scan: args.scan,
            force: args.force,
        },
    };
    log_event!(
        log,
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "starting check",
        mode = mode.name()
    );

    let adapter = detect_adapter(sampling.command_timeout());
    let ctx = CheckContext::new(adapter.as_ref(), sampling.iowait_window(), log);
    let report = run_check(&ctx, mode);

    if explain(global) {
        eprint!("{}", diagnostics(&report));
    }
    if !global.quiet {
        let stdout = std::io::stdout();
        if let Err(e) = write_check(&mut stdout.lock(), &report, global.format) {
            return output_error(global, &Error::Io(e));
        }
    }
    report.exit_code()
}

fn run_fleet(global: &GlobalOpts, args: &FleetArgs) -> ExitCode {
    let resolved = match resolve_config(global) {
        Ok(r) => r,
        Err(e) => return output_error(global, &e),
    };
    let mut fleet = resolved.config.fleet;
    if let Some(path) = &args.inventory {
        fleet.inventory = Some(path.clone());
    }
    if let Some(parallel) = args.parallel {
        fleet.parallel = parallel;
    }
    let exclude = match &args.exclude_pattern {
        Some(pattern) => Some(pattern.as_str()),
        None if args.exclude => Some(fleet.exclude_pattern.as_str()),
        None => None,
    };

    let log = LogContext::for_this_run();
    let plan = match plan_hosts(&args.group, &default_resolvers(&fleet), exclude) {
        Ok(plan) => plan,
        Err(e) => return output_error(global, &Error::from(e)),
    };
    log_event!(
        log,
        INFO,
        event_names::FLEET_RESOLVED,
        Stage::Fleet,
        "host group resolved",
        group = plan.group.as_str(),
        source = plan.source.as_deref().unwrap_or("none"),
        hosts = plan.hosts.len(),
        excluded = plan.excluded.len()
    );

    let flags = ForwardedFlags {
        scan: args.scan,
        force: args.force,
    };
    let config = SshCheckConfig::from_fleet_config(&fleet, flags);
    let parallel = config.parallel;
    let executor = Arc::new(SshExecutor::new(config));

    let stream = global.format == OutputFormat::Text && !global.quiet;
    let stdout = std::io::stdout();
    let report = check_fleet(
        &plan.group,
        plan.hosts,
        plan.excluded,
        parallel,
        executor,
        &log,
        |result| {
            if result.status == HostStatus::Failed && !global.quiet {
                eprintln!(
                    "{}: {}",
                    result.host,
                    result.error.as_deref().unwrap_or("check failed")
                );
            }
            if stream {
                let mut out = stdout.lock();
                for line in &result.lines {
                    let _ = writeln!(out, "{line}");
                }
                let _ = out.flush();
            }
        },
    );

    if explain(global) {
        eprintln!(
            "{}: {} hosts, {} runaway, {} clean, {} failed, {} excluded ({} ms)",
            report.group,
            report.total_hosts,
            report.runaway_hosts,
            report.clean_hosts,
            report.failed_hosts,
            report.excluded.len(),
            report.duration_ms
        );
    }
    if global.format == OutputFormat::Json && !global.quiet {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => return output_error(global, &Error::Json(e)),
        }
    }
    report.exit_code()
}

fn run_rules(global: &GlobalOpts, args: &RulesArgs) -> ExitCode {
    let log = LogContext::for_this_run();
    let table = match &args.table {
        Some(path) => std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| TruthTable::parse(&text).map_err(Error::from)),
        None => TruthTable::embedded().map_err(Error::from),
    };
    let table = match table {
        Ok(t) => t,
        Err(e) => return output_error(global, &e),
    };

    let report = match validate_cover(&table, &RUNAWAY_RULES) {
        Ok(report) => report,
        Err(e) => return output_error(global, &Error::from(e)),
    };
    log_event!(
        log,
        INFO,
        event_names::RULES_VALIDATED,
        Stage::Rules,
        "rule cover matches truth table",
        on_set = report.on_set,
        off_set = report.off_set,
        dont_care = report.dont_care
    );

    if !global.quiet {
        match global.format {
            OutputFormat::Text => print!("{}", rules_summary(&RUNAWAY_RULES, &report)),
            OutputFormat::Json => match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => return output_error(global, &Error::Json(e)),
            },
        }
    }
    ExitCode::OK
}

fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let resolved = match resolve_config(global) {
        Ok(r) => r,
        Err(e) => return output_error(global, &e),
    };

    match global.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&resolved) {
            Ok(json) => println!("{json}"),
            Err(e) => return output_error(global, &Error::Json(e)),
        },
        OutputFormat::Text => {
            match &resolved.path {
                Some(path) => println!("# source: {} ({})", path.display(), resolved.source),
                None => println!("# source: {}", resolved.source),
            }
            if let Some(sha) = &resolved.sha256 {
                println!("# sha256: {sha}");
            }
            match toml::to_string_pretty(&resolved.config) {
                Ok(text) => print!("{text}"),
                Err(e) => return output_error(global, &Error::Config(e.to_string())),
            }
        }
    }
    ExitCode::OK
}

fn print_version(global: &GlobalOpts) {
    let version = env!("CARGO_PKG_VERSION");
    match global.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "name": "runaway",
                "version": version,
                "rules": RUNAWAY_RULES.clauses.len(),
            })
        ),
        OutputFormat::Text => println!("runaway {version}"),
    }
}
