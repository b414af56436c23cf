use clap::Parser;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "James Sturgis",
    version,
    about = "NVT Monte Carlo simulation of very coarse grained rigid objects in a two-dimensional cell.",
    help_template = HELP_TEMPLATE,
)]
pub struct Cli {
    // --- Positional Arguments ---
    /// Number of production Monte Carlo moves.
    #[arg(value_name = "N_STEPS")]
    pub n_steps: u64,

    /// Moves between progress reports.
    #[arg(value_name = "PRINT_FREQUENCY")]
    pub print_frequency: u64,

    /// Inverse temperature.
    #[arg(value_name = "BETA", allow_negative_numbers = true)]
    pub beta: f64,

    /// Pressure, recorded in the reports only.
    #[arg(value_name = "PRESSURE", allow_negative_numbers = true)]
    pub pressure: f64,

    /// Starting configuration file.
    #[arg(value_name = "INITIAL_CONFIG")]
    pub initial_config: PathBuf,

    /// Where to write the final configuration.
    #[arg(value_name = "FINAL_CONFIG")]
    pub final_config: PathBuf,

    // --- Model Overrides ---
    /// Force field parameter file (TOML). Defaults to the built-in force field.
    #[arg(long, value_name = "PATH")]
    pub forcefield: Option<PathBuf>,

    /// Object topology file (TOML). Defaults to the built-in topology.
    #[arg(long, value_name = "PATH")]
    pub topology: Option<PathBuf>,

    /// Run settings file (TOML).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed of the random stream. Drawn from the OS and logged when absent.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Treat the cell as bounded by hard walls instead of periodic.
    #[arg(long)]
    pub non_periodic: bool,

    /// Also write an Encapsulated Postscript drawing of the final state.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    // --- Logging ---
    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for energy evaluation.
    /// Defaults to the number of available logical cores.
    #[cfg(feature = "parallel")]
    #[arg(short = 'j', long, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_positional_arguments() {
        let cli = Cli::try_parse_from([
            "nvt", "1000", "100", "2.5", "-0.5", "in.cfg", "out.cfg",
        ])
        .unwrap();
        assert_eq!(cli.n_steps, 1000);
        assert_eq!(cli.print_frequency, 100);
        assert_eq!(cli.beta, 2.5);
        assert_eq!(cli.pressure, -0.5);
        assert_eq!(cli.initial_config, PathBuf::from("in.cfg"));
        assert_eq!(cli.final_config, PathBuf::from("out.cfg"));
        assert!(!cli.non_periodic);
        assert_eq!(cli.seed, None);
    }

    #[test]
    fn parses_options() {
        let cli = Cli::try_parse_from([
            "nvt",
            "10",
            "5",
            "1",
            "0",
            "a.cfg",
            "b.cfg",
            "--seed",
            "42",
            "--non-periodic",
            "--snapshot",
            "final.eps",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(42));
        assert!(cli.non_periodic);
        assert_eq!(cli.snapshot, Some(PathBuf::from("final.eps")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn missing_positionals_are_an_error() {
        assert!(Cli::try_parse_from(["nvt", "10", "5", "1", "0", "a.cfg"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(
            Cli::try_parse_from(["nvt", "1", "1", "1", "0", "a", "b", "-q", "-v"]).is_err()
        );
    }
}
