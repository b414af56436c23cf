mod defaults;

use crate::cli::Cli;
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use vcgd::engine::config::{
    IntegratorConfig, NvtConfig, NvtConfigBuilder, RotationControl, StepControl,
};

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSystemConfig {
    periodic: Option<bool>,
    seed: Option<u64>,
    forcefield: Option<PathBuf>,
    topology: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSamplingConfig {
    #[serde(rename = "target-acceptance")]
    target_acceptance: Option<f64>,
    tolerance: Option<f64>,
    #[serde(rename = "adjust-factor")]
    adjust_factor: Option<f64>,
    #[serde(rename = "adjust-interval")]
    adjust_interval: Option<u64>,
    #[serde(rename = "min-amplitude")]
    min_amplitude: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum RotationMode {
    Fixed,
    Adaptive,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialRotationConfig {
    mode: Option<RotationMode>,
    #[serde(rename = "max-angle")]
    max_angle: Option<f64>,
}

/// Run settings as read from a TOML file, every value optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    system: Option<PartialSystemConfig>,
    sampling: Option<PartialSamplingConfig>,
    rotation: Option<PartialRotationConfig>,
}

/// Everything the `nvt` command needs, after merging all sources.
#[derive(Debug)]
pub struct AppConfig {
    pub initial_config: PathBuf,
    pub final_config: PathBuf,
    pub forcefield_path: Option<PathBuf>,
    pub topology_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    pub periodic: bool,
    pub core_config: NvtConfig,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading run settings from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| CliError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Combines the file values with the command line. Command line values win;
    /// [`DefaultsConfig`] fills whatever neither source gives.
    pub fn merge_with_cli(self, args: &Cli) -> Result<AppConfig> {
        let defaults = DefaultsConfig::default();
        let system = self.system.unwrap_or_default();
        let sampling = self.sampling.unwrap_or_default();
        let rotation = self.rotation.unwrap_or_default();

        let step_control = StepControl {
            interval: sampling.adjust_interval.unwrap_or(defaults.adjust_interval),
            target: sampling
                .target_acceptance
                .unwrap_or(defaults.target_acceptance),
            tolerance: sampling.tolerance.unwrap_or(defaults.tolerance),
            factor: sampling.adjust_factor.unwrap_or(defaults.adjust_factor),
            min_amplitude: sampling.min_amplitude.unwrap_or(defaults.min_amplitude),
        };
        step_control
            .validate()
            .map_err(|reason| CliError::Config(format!("[sampling] {}", reason)))?;

        let max_angle = rotation.max_angle.unwrap_or(defaults.max_angle);
        if !(max_angle.is_finite() && max_angle > 0.0) {
            return Err(CliError::Config(format!(
                "[rotation] max-angle must be positive (got {})",
                max_angle
            )));
        }
        let rotation = match rotation.mode.unwrap_or(RotationMode::Fixed) {
            RotationMode::Fixed => RotationControl::Fixed(max_angle),
            RotationMode::Adaptive => RotationControl::Adaptive(max_angle),
        };

        let periodic = if args.non_periodic {
            false
        } else {
            system.periodic.unwrap_or(defaults.periodic)
        };

        let core_config = NvtConfigBuilder::new()
            .steps(args.n_steps)
            .report_interval(args.print_frequency)
            .beta(args.beta)
            .pressure(args.pressure)
            .seed(args.seed.or(system.seed))
            .integrator(IntegratorConfig {
                step_control,
                rotation,
            })
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(AppConfig {
            initial_config: args.initial_config.clone(),
            final_config: args.final_config.clone(),
            forcefield_path: args.forcefield.clone().or(system.forcefield),
            topology_path: args.topology.clone().or(system.topology),
            snapshot_path: args.snapshot.clone(),
            periodic,
            core_config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::f64::consts::TAU;
    use tempfile::tempdir;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["nvt", "500", "50", "2.0", "0.1", "in.cfg", "out.cfg"];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let app = PartialRunConfig::default().merge_with_cli(&cli(&[])).unwrap();
        assert!(app.periodic);
        assert_eq!(app.core_config.steps, 500);
        assert_eq!(app.core_config.report_interval, 50);
        assert_eq!(app.core_config.beta, 2.0);
        assert_eq!(app.core_config.pressure, 0.1);
        assert_eq!(app.core_config.seed, None);
        assert_eq!(app.core_config.integrator.step_control, StepControl::default());
        assert_eq!(
            app.core_config.integrator.rotation,
            RotationControl::Fixed(TAU)
        );
        assert_eq!(app.forcefield_path, None);
    }

    #[test]
    fn file_values_are_used() {
        let partial = PartialRunConfig::from_toml_str(
            r#"
            [system]
            periodic = false
            seed = 9
            forcefield = "ff.toml"

            [sampling]
            target-acceptance = 0.3
            adjust-interval = 50

            [rotation]
            mode = "adaptive"
            max-angle = 1.0
            "#,
        )
        .unwrap();
        let app = partial.merge_with_cli(&cli(&[])).unwrap();
        assert!(!app.periodic);
        assert_eq!(app.core_config.seed, Some(9));
        assert_eq!(app.forcefield_path, Some(PathBuf::from("ff.toml")));
        let control = app.core_config.integrator.step_control;
        assert_eq!(control.target, 0.3);
        assert_eq!(control.interval, 50);
        assert_eq!(control.factor, 1.1);
        assert_eq!(
            app.core_config.integrator.rotation,
            RotationControl::Adaptive(1.0)
        );
    }

    #[test]
    fn command_line_wins_over_file() {
        let partial = PartialRunConfig::from_toml_str(
            "[system]\nperiodic = true\nseed = 9\ntopology = \"a.toml\"",
        )
        .unwrap();
        let app = partial
            .merge_with_cli(&cli(&["--non-periodic", "--seed", "3", "--topology", "b.toml"]))
            .unwrap();
        assert!(!app.periodic);
        assert_eq!(app.core_config.seed, Some(3));
        assert_eq!(app.topology_path, Some(PathBuf::from("b.toml")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PartialRunConfig::from_toml_str("[sampling]\ntarget = 0.5").is_err());
    }

    #[test]
    fn invalid_sampling_values_are_rejected() {
        let partial =
            PartialRunConfig::from_toml_str("[sampling]\nadjust-factor = 0.9").unwrap();
        assert!(matches!(
            partial.merge_with_cli(&cli(&[])),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn from_file_reports_parse_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "[system\nperiodic = true").unwrap();
        match PartialRunConfig::from_file(&path) {
            Err(CliError::FileParsing { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
