use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "querymix",
    version,
    about = "Timed mixed read/update load against a query service"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file; defaults to ./querymix.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// Concurrent workers (overrides `workload.workers`).
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Run length in seconds (overrides `workload.duration_secs`).
    #[arg(long = "duration", short = 'd', value_name = "SECS")]
    pub duration_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// No banner or progress bar.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the load for the configured duration and print the report.
    Run(RunArgs),
    /// Print the rendered batch mix without contacting the engine.
    Plan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let args = Args::parse_from([
            "querymix", "run", "-w", "32", "--duration", "60", "--format", "json", "--quiet",
        ]);
        let Some(Commands::Run(run)) = args.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(run.workers, Some(32));
        assert_eq!(run.duration_secs, Some(60));
        assert_eq!(run.format, ReportFormat::Json);
        assert!(run.quiet);
    }

    #[test]
    fn config_is_global() {
        let args = Args::parse_from(["querymix", "plan", "--config", "load.toml"]);
        assert!(matches!(args.command, Some(Commands::Plan)));
        assert_eq!(args.config, Some(PathBuf::from("load.toml")));
    }

    #[test]
    fn bare_invocation_has_no_command() {
        let args = Args::parse_from(["querymix"]);
        assert!(args.command.is_none());
        assert!(args.config.is_none());
    }
}
