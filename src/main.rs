//! `turnstile` command-line interface.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use turnstile::{
    Driver, Sampler, ScenarioRegistry, ScenarioRun, SchedulerConfig, TieBreak, TurnstileError,
    ZeroDelay,
};

#[derive(Parser, Debug)]
#[command(
    name = "turnstile",
    version,
    about = "Deterministic simulator for single-threaded cooperative scheduling"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Channel shared by yield_immediate and sleep(0)
    #[arg(long, value_enum, default_value_t = ZeroDelayArg::Timer, global = true)]
    zero_delay: ZeroDelayArg,

    /// Order among entries due at the same time
    #[arg(long, value_enum, default_value_t = TieBreakArg::Fifo, global = true)]
    tie_break: TieBreakArg,

    /// Seed for --tie-break seeded and for sampling
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Minimum timer delay in ticks
    #[arg(long, default_value_t = 1, global = true)]
    granularity: u64,

    /// Maximum entries dispatched per pump (0 disables the limit)
    #[arg(long, global = true)]
    max_steps: Option<u64>,

    /// JSON file with extra scenarios
    #[arg(long, global = true)]
    scenarios: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbosity: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run scenarios against the ticker (all when none are named)
    Run(RunArgs),

    /// List registered scenarios
    List,

    /// Sample a scenario under seeded tie-breaking
    Sample(SampleArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario names, in run order
    names: Vec<String>,

    /// Also print the full trace with times and task ids
    #[arg(long, action = ArgAction::SetTrue)]
    trace: bool,
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Scenario name
    name: String,

    /// Number of seeded runs
    #[arg(long, default_value_t = 100)]
    runs: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ZeroDelayArg {
    Timer,
    Immediate,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum TieBreakArg {
    Fifo,
    Lifo,
    Seeded,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Turnstile(#[from] TurnstileError),

    #[cfg(feature = "serialize")]
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot write output: {0}")]
    Write(#[from] io::Error),

    #[cfg(not(feature = "serialize"))]
    #[error("{0} requires the `serialize` feature")]
    FeatureDisabled(&'static str),
}

impl CommonArgs {
    fn config(&self) -> SchedulerConfig {
        let zero_delay = match self.zero_delay {
            ZeroDelayArg::Timer => ZeroDelay::Timer,
            ZeroDelayArg::Immediate => ZeroDelay::Immediate,
        };
        let tie_break = match self.tie_break {
            TieBreakArg::Fifo => TieBreak::Fifo,
            TieBreakArg::Lifo => TieBreak::Lifo,
            TieBreakArg::Seeded => TieBreak::Seeded(self.seed),
        };
        let config = SchedulerConfig::new()
            .zero_delay(zero_delay)
            .tie_break(tie_break)
            .timer_granularity(self.granularity);
        match self.max_steps {
            Some(0) => config.no_step_limit(),
            Some(limit) => config.max_steps(limit),
            None => config,
        }
    }

    fn registry(&self) -> Result<ScenarioRegistry, CliError> {
        let mut registry = ScenarioRegistry::builtin();
        if let Some(path) = &self.scenarios {
            load_scenarios(&mut registry, path)?;
        }
        Ok(registry)
    }

    fn level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(feature = "serialize")]
fn load_scenarios(registry: &mut ScenarioRegistry, path: &Path) -> Result<(), CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    registry.extend_from_json(&json)?;
    tracing::info!(path = %path.display(), total = registry.len(), "scenarios loaded");
    Ok(())
}

#[cfg(not(feature = "serialize"))]
fn load_scenarios(_registry: &mut ScenarioRegistry, _path: &Path) -> Result<(), CliError> {
    Err(CliError::FeatureDisabled("--scenarios"))
}

#[cfg(feature = "serialize")]
fn print_json<T: serde::Serialize>(out: &mut impl Write, value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TurnstileError::Serialization(e.to_string()))?;
    writeln!(out, "{}", json)?;
    Ok(())
}

fn init_logging(common: &CommonArgs) {
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("turnstile={}", common.level())));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli, args: &RunArgs, out: &mut impl Write) -> Result<(), CliError> {
    let mut driver = Driver::new(cli.common.config(), cli.common.registry()?);
    driver.start()?;
    let runs: Vec<ScenarioRun> = driver.run_all(&args.names)?;
    driver.finish()?;

    if cli.common.json {
        #[cfg(feature = "serialize")]
        {
            print_json(out, &runs)?;
            if args.trace {
                print_json(out, driver.engine().trace())?;
            }
            return Ok(());
        }
        #[cfg(not(feature = "serialize"))]
        return Err(CliError::FeatureDisabled("--json"));
    }

    for run in &runs {
        writeln!(out, "{}", run)?;
    }
    if args.trace {
        driver.engine().trace().export(out)?;
    }
    Ok(())
}

fn list(cli: &Cli, out: &mut impl Write) -> Result<(), CliError> {
    let registry = cli.common.registry()?;

    if cli.common.json {
        #[cfg(feature = "serialize")]
        return print_json(out, &registry.iter().collect::<Vec<_>>());
        #[cfg(not(feature = "serialize"))]
        return Err(CliError::FeatureDisabled("--json"));
    }

    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for scenario in registry.iter() {
        writeln!(out, "{:<width$}  {}", scenario.name, scenario.description)?;
    }
    Ok(())
}

fn sample(cli: &Cli, args: &SampleArgs, out: &mut impl Write) -> Result<(), CliError> {
    let sampler = Sampler::new(cli.common.config(), cli.common.registry()?);
    let dist = sampler.sample(&args.name, args.runs, cli.common.seed)?;
    let scenario = sampler.registry().get(&args.name)?;
    let unexpected = dist.unexpected(scenario);
    if !scenario.documented.is_empty() && !unexpected.is_empty() {
        tracing::warn!(scenario = %args.name, ?unexpected, "undocumented outcomes");
    }

    if cli.common.json {
        #[cfg(feature = "serialize")]
        return print_json(out, &dist);
        #[cfg(not(feature = "serialize"))]
        return Err(CliError::FeatureDisabled("--json"));
    }

    write!(out, "{}", dist)?;
    Ok(())
}

fn execute(cli: &Cli, out: &mut impl Write) -> Result<(), CliError> {
    match &cli.command {
        Command::Run(args) => run(cli, args, out),
        Command::List => list(cli, out),
        Command::Sample(args) => sample(cli, args, out),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.common);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(&cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("turnstile").chain(args.iter().copied()))
            .expect("parse args")
    }

    fn output(args: &[&str]) -> Result<String, CliError> {
        let cli = parse(args);
        let mut out = Vec::new();
        execute(&cli, &mut out)?;
        Ok(String::from_utf8(out).expect("utf-8 output"))
    }

    #[test]
    fn default_flags_map_to_default_config() {
        assert_eq!(parse(&["list"]).common.config(), SchedulerConfig::default());
    }

    #[test]
    fn max_steps_zero_disables_limit() {
        assert_eq!(parse(&["--max-steps", "0", "list"]).common.config().max_steps, None);
        assert_eq!(
            parse(&["list", "--max-steps", "50"]).common.config().max_steps,
            Some(50)
        );
    }

    #[test]
    fn policy_flags_map_to_config() {
        let config = parse(&[
            "run",
            "--tie-break",
            "seeded",
            "--seed",
            "9",
            "--zero-delay",
            "immediate",
            "--granularity",
            "0",
        ])
        .common
        .config();
        assert_eq!(config.tie_break, TieBreak::Seeded(9));
        assert_eq!(config.zero_delay, ZeroDelay::Immediate);
        assert_eq!(config.timer_granularity, 0);

        let lifo = parse(&["run", "--tie-break", "lifo"]).common.config();
        assert_eq!(lifo.tie_break, TieBreak::Lifo);
    }

    #[test]
    fn run_prints_labelled_lines() {
        let out = output(&["run", "demo1", "task-yield"]).unwrap();
        assert_eq!(out, "demo1: a b in! c d\ntask-yield: b a c\n");
    }

    #[test]
    fn run_on_immediate_channel() {
        let out = output(&["--zero-delay", "immediate", "run", "demo3", "demo4"]).unwrap();
        assert_eq!(out, "demo3: a b in! c d in!\ndemo4: a b in! c in! d in!\n");
    }

    #[test]
    fn run_with_trace_appends_export() {
        let out = output(&["run", "demo3", "--trace"]).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("demo3: a b in! c d"));
        assert_eq!(lines.next(), Some("# TURNSTILE TRACE v1"));
    }

    #[test]
    fn run_unknown_scenario_fails() {
        let err = output(&["run", "demo1", "nope"]).unwrap_err();
        assert!(matches!(
            err,
            CliError::Turnstile(TurnstileError::UnknownScenario(ref name)) if name == "nope"
        ));
        assert_eq!(err.to_string(), "unknown scenario `nope`");
    }

    #[test]
    fn list_prints_every_scenario() {
        let out = output(&["list"]).unwrap();
        let names: Vec<_> = out
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(names, ScenarioRegistry::builtin().names());
    }

    #[test]
    fn sample_prints_distribution() {
        let out = output(&["sample", "demo1", "--runs", "20", "--seed", "4"]).unwrap();
        assert_eq!(out, "demo1 (20 runs)\n     20  a b in! c d\n");
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn json_run_output() {
        let out = output(&["--json", "run", "demo3"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["label"], "demo3");
        assert_eq!(value[0]["line"], "a b in! c d");
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn json_list_output() {
        let out = output(&["list", "--json"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(7));
        assert_eq!(value[0]["name"], "demo1");
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn scenarios_file_extends_registry() {
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"[{{"name": "hello", "program": {{"name": "hello",
                "steps": [{{"announce": "a"}}, "yield_immediate", {{"announce": "b"}}]}}}}]"#
        )
        .expect("write scenarios");
        let path = file.path().to_str().expect("utf-8 path");

        let out = output(&["--scenarios", path, "run", "hello", "demo1"]).unwrap();
        assert_eq!(out, "hello: a in! b\ndemo1: a b in! c d\n");
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn missing_scenarios_file_fails() {
        let err = output(&["--scenarios", "/nonexistent/turnstile.json", "list"]).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
